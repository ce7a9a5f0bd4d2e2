// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The connection-number-indexed Terminal Control Block table.

use std::collections::VecDeque;

use crate::block::INPUT_HEADER_LEN;
use crate::buffer::NpuBuffer;
use crate::tip::params::TipParams;

/// Terminal connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcbState {
    Idle,
    Connected,
    HostRequestDisconnect,
    NpuRequestDisconnect,
}

/// TIP types a TCB may be configured as. Only `Async` is emulated here;
/// synchronous modes and HASP are out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipType {
    Async,
    Unsupported(u8),
}

/// Device kind derived from the top 3 bits of the incoming device-type
/// byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Console,
    CardReader,
    LinePrinter,
    CardPunch,
    Plotter,
    Unknown(u8),
}

impl DeviceType {
    pub fn from_byte(device_type: u8) -> Self {
        match device_type >> 5 {
            0 => DeviceType::Console,
            1 => DeviceType::CardReader,
            2 => DeviceType::LinePrinter,
            3 => DeviceType::CardPunch,
            4 => DeviceType::Plotter,
            other => DeviceType::Unknown(other),
        }
    }
}

/// One terminal connection's state, input assembly buffer and output
/// queue.
pub struct Tcb {
    pub cn: u8,
    pub state: TcbState,
    pub cla_port: u8,
    pub cluster_address: u8,
    pub terminal_address: u8,
    pub device_type: DeviceType,
    pub term_name: [u8; 7],
    pub tip_type: TipType,
    pub owning_console: Option<u8>,
    pub params: TipParams,
    pub in_buf: NpuBuffer,
    pub in_buf_start: usize,
    pub in_buf_ptr: usize,
    pub upline_bsn: u8,
    pub xoff: bool,
    pub break_pending: bool,
    pub dbc_no_cursor_pos: bool,
    pub last_op_was_input: bool,
    pub output_queue: VecDeque<NpuBuffer>,
}

impl Tcb {
    pub fn new(cn: u8) -> Self {
        Tcb {
            cn,
            state: TcbState::Idle,
            cla_port: 0,
            cluster_address: 0,
            terminal_address: 0,
            device_type: DeviceType::Unknown(0),
            term_name: [0; 7],
            tip_type: TipType::Unsupported(0),
            owning_console: None,
            params: TipParams::default(),
            in_buf: NpuBuffer::new(),
            in_buf_start: INPUT_HEADER_LEN,
            in_buf_ptr: INPUT_HEADER_LEN,
            upline_bsn: 0,
            xoff: false,
            break_pending: false,
            dbc_no_cursor_pos: false,
            last_op_was_input: false,
            output_queue: VecDeque::new(),
        }
    }

    /// Clears everything except the CN index, matching `DelTerm`'s
    /// "preserve the slot" behavior.
    pub fn clear(&mut self) {
        let cn = self.cn;
        *self = Tcb::new(cn);
    }

    pub fn advance_bsn(&mut self) -> u8 {
        let bsn = self.upline_bsn;
        self.upline_bsn = (self.upline_bsn + 1) % 8;
        bsn
    }
}

/// The connection-number-indexed TCB table.
pub struct TcbTable {
    tcbs: Vec<Tcb>,
}

impl TcbTable {
    pub fn new(max_tcbs: u16) -> Self {
        TcbTable {
            tcbs: (0..max_tcbs).map(|cn| Tcb::new(cn as u8)).collect(),
        }
    }

    pub fn get(&self, cn: u8) -> Option<&Tcb> {
        self.tcbs.get(cn as usize)
    }

    pub fn get_mut(&mut self, cn: u8) -> Option<&mut Tcb> {
        self.tcbs.get_mut(cn as usize)
    }

    pub fn find_by_cla_port_console(&self, cla_port: u8) -> Option<u8> {
        self.tcbs
            .iter()
            .find(|tcb| {
                tcb.cla_port == cla_port
                    && tcb.state != TcbState::Idle
                    && matches!(tcb.device_type, DeviceType::Console)
            })
            .map(|tcb| tcb.cn)
    }

    pub fn reset_all(&mut self) {
        for tcb in &mut self.tcbs {
            tcb.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bsn_advances_modulo_eight() {
        let mut tcb = Tcb::new(0);
        tcb.upline_bsn = 7;
        assert_eq!(tcb.advance_bsn(), 7);
        assert_eq!(tcb.upline_bsn, 0);
    }

    #[test]
    fn clear_preserves_cn() {
        let mut tcb = Tcb::new(5);
        tcb.state = TcbState::Connected;
        tcb.clear();
        assert_eq!(tcb.cn, 5);
        assert_eq!(tcb.state, TcbState::Idle);
    }

    #[test]
    fn device_type_from_byte_uses_top_three_bits() {
        assert_eq!(DeviceType::from_byte(0x00), DeviceType::Console);
        assert_eq!(DeviceType::from_byte(0x20), DeviceType::CardReader);
        assert_eq!(DeviceType::from_byte(0x88), DeviceType::Plotter);
    }
}
