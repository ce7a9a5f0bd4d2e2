// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The Service Message Subsystem: the configuration protocol that
//! configures lines and terminals, tracks per-line state, and emits
//! unsolicited status as the terminal network connects and disconnects.

pub mod lcb;

use log::debug;
use log::error;
use log::warn;

use crate::block::BLK_OFF_CA;
use crate::block::BLK_OFF_CN;
use crate::block::BLK_OFF_DT;
use crate::block::BLK_OFF_FN;
use crate::block::BLK_OFF_LT;
use crate::block::BLK_OFF_P;
use crate::block::BLK_OFF_PFC;
use crate::block::BLK_OFF_SFC;
use crate::block::BLK_OFF_TA;
use crate::block::BLK_OFF_TERM_CN;
use crate::block::BLK_OFF_TT;
use crate::block::BlockType;
use crate::block::SFC_ERROR;
use crate::block::SFC_SUCCESS;
use crate::buffer::NpuBuffer;
use crate::collab::BipSink;
use crate::collab::BufferPool;
use crate::config::NpuConfig;
use crate::error::SvmError;
use crate::error::SvmResult;
use crate::svm::lcb::LcbTable;
use crate::svm::lcb::LineConfState;
use crate::svm::lcb::LineState;
use crate::svm::lcb::LINE_TYPE_SWITCHED_ASYNC;
use crate::tip::params::TipParams;
use crate::tip::pcb::PcbTable;
use crate::tip::tcb::DeviceType;
use crate::tip::tcb::TcbState;
use crate::tip::tcb::TcbTable;
use crate::tip::tcb::TipType;

/// PFC/SFC function codes, packed as `(pfc << 8) | sfc`.
pub mod function_code {
    pub const CONF_LINE: u16 = 0x0300;
    pub const DEL_LINE: u16 = 0x0301;
    pub const CONF_TERM: u16 = 0x0302;
    pub const RCONF_TERM: u16 = 0x0303;
    pub const DEL_TERM: u16 = 0x0304;
    pub const ENA_LINE: u16 = 0x0800;
    pub const DISA_LINE: u16 = 0x0801;
    pub const DISC_LINE: u16 = 0x0802;
}

/// Return codes in the closed set `ERROR HANDLING DESIGN` names. Several
/// names share a numeric value because the original protocol reuses one
/// RC byte's meaning across different function codes.
pub mod rc {
    pub const OK: u8 = 0;
    pub const INVALID_LINE_NUMBER: u8 = 1;
    pub const INVALID_SUBLINE_NUMBER: u8 = 2;
    pub const ALREADY_CONFIGURED: u8 = 3;
    pub const NOT_CONFIGURED: u8 = 3;
    pub const INVALID_LINE_TYPE: u8 = 4;
    pub const NO_BUFFER: u8 = 4;
    pub const INVALID_TERMINAL_TYPE: u8 = 5;
}

const FN_LINE_SPEED_INDEX: u8 = 21;
const FN_LINE_OWNER: u8 = 5;

/// Everything `SvmEngine::process_buffer` needs to read or update. Kept
/// as one bundle of `&mut` borrows rather than a method on `Npu` so SVM
/// stays ignorant of HIP.
pub struct SvmTables<'a> {
    pub lcbs: &'a mut LcbTable,
    pub tcbs: &'a mut TcbTable,
    pub pcbs: &'a mut PcbTable,
}

pub struct SvmEngine {
    config: NpuConfig,
}

impl SvmEngine {
    pub fn new(config: NpuConfig) -> Self {
        SvmEngine { config }
    }

    pub fn reset(&mut self, tables: &mut SvmTables<'_>) {
        tables.lcbs.reset_all();
        tables.tcbs.reset_all();
    }

    /// Builds and sends the 9-byte NPU-init message on a macro-image
    /// start.
    pub fn send_npu_init_response(&self, bip: &mut dyn BipSink) {
        let msg = [
            self.config.coupler_node,
            self.config.npu_node,
            0,
            BlockType::Command.to_byte(0),
            1, // PFC
            2, // SFC
            3, // CCP version
            1, // cycle
            1, // level
        ];
        bip.request_upline_canned(&msg);
    }

    fn unsolicited_line_status(&self, port: u8, lcb: &lcb::LineControlBlock, bip: &mut dyn BipSink) {
        let msg = [
            self.config.coupler_node,
            self.config.npu_node,
            0,
            BlockType::Command.to_byte(0),
            6, // PFC
            2, // SFC
            port,
            0,
            lcb.line_state as u8,
            lcb.line_type,
            lcb.config_state as u8,
            lcb.num_terminals,
        ];
        bip.request_upline_canned(&msg);
    }

    /// Called when the terminal network reports a new connection on a
    /// line that was waiting for one.
    pub fn notify_terminal_connected(&self, port: u8, tables: &mut SvmTables<'_>, bip: &mut dyn BipSink) {
        let Some(lcb) = tables.lcbs.get_mut(port) else {
            return;
        };
        if lcb.config_state != LineConfState::InoperativeWaiting {
            return;
        }
        lcb.config_state = LineConfState::OperationalNoTcbs;
        lcb.line_state = LineState::Operational;
        self.unsolicited_line_status(port, lcb, bip);
    }

    /// `SendDiscRequest`: the core, not the host, decides to drop a
    /// terminal (e.g. the network session died).
    pub fn send_disc_request(&self, cn: u8, tables: &mut SvmTables<'_>, bip: &mut dyn BipSink, pool: &mut dyn BufferPool) {
        let Some(tcb) = tables.tcbs.get_mut(cn) else {
            return;
        };
        if tcb.state != TcbState::Connected {
            warn!("SendDiscRequest for CN {cn} in state {:?}, ignored", tcb.state);
            return;
        }
        let port = tcb.cla_port;
        let Some(lcb) = tables.lcbs.get_mut(port) else {
            return;
        };
        if lcb.config_state != LineConfState::OperationalTcbsConfigured {
            warn!("SendDiscRequest for CN {cn} on port {port} in state {:?}, ignored", lcb.config_state);
            return;
        }
        lcb.config_state = LineConfState::InoperativeTcbsConfigured;
        lcb.line_state = LineState::Inoperative;
        self.unsolicited_line_status(port, lcb, bip);

        let tcb = tables.tcbs.get_mut(cn).expect("checked above");
        while let Some(buffer) = tcb.output_queue.pop_front() {
            pool.release(buffer);
        }
        tcb.xoff = false;
        tcb.state = TcbState::NpuRequestDisconnect;
    }

    /// Parses and answers one downline Command buffer. The caller is
    /// responsible for releasing `buffer` once this returns.
    pub fn process_buffer(
        &mut self,
        buffer: &NpuBuffer,
        tables: &mut SvmTables<'_>,
        bip: &mut dyn BipSink,
        pool: &mut dyn BufferPool,
    ) -> SvmResult<()> {
        let bytes = buffer.as_slice();
        if bytes.len() <= BLK_OFF_TT {
            return Err(SvmError::MessageTooShort);
        }
        if bytes[BLK_OFF_CN] != 0 {
            // A genuine service message always carries CN=0; non-zero CN
            // here means the demultiplexer mis-routed a TIP ack to SVM.
            return Err(SvmError::MessageTooShort);
        }

        let pfc = bytes[BLK_OFF_PFC];
        let sfc = bytes[BLK_OFF_SFC] & 0x3f;
        let code = (u16::from(pfc) << 8) | u16::from(sfc);
        let port = bytes[BLK_OFF_P];

        if port >= self.config.max_line_defs {
            return Err(SvmError::PortOutOfRange(port));
        }
        let pcb_configured = tables.pcbs.get(port).map(|pcb| pcb.configured).unwrap_or(false);
        if !pcb_configured {
            return Err(SvmError::PortOutOfRange(port));
        }

        let outcome = match code {
            function_code::CONF_LINE => self.conf_line(bytes, port, tables),
            function_code::DEL_LINE => Err(SvmError::DelLineUnimplemented),
            function_code::CONF_TERM => self.conf_term(bytes, port, false, tables),
            function_code::RCONF_TERM => self.conf_term(bytes, port, true, tables),
            function_code::DEL_TERM => self.del_term(bytes, tables),
            function_code::ENA_LINE => self.ena_line(port, tables),
            function_code::DISA_LINE => self.disa_line(port, tables),
            function_code::DISC_LINE => self.disc_line(port, tables),
            _ => Err(SvmError::UnrecognizedFunctionCode { pfc, sfc }),
        };

        let tail = match outcome {
            Ok(tail) => tail,
            Err(SvmError::DelLineUnimplemented) => {
                warn!("DelLine on port {port} has no defined behavior; dropping");
                return Err(SvmError::DelLineUnimplemented);
            }
            Err(e) => {
                debug!("SVM request on port {port} rejected: {e}");
                ResponseTail::error(rc::NOT_CONFIGURED)
            }
        };

        self.send_response(pfc, sfc, port, &tail, bip, pool);
        Ok(())
    }

    fn send_response(
        &self,
        pfc: u8,
        sfc: u8,
        port: u8,
        tail: &ResponseTail,
        bip: &mut dyn BipSink,
        pool: &mut dyn BufferPool,
    ) {
        let Some(mut response) = pool.acquire() else {
            error!("no buffer available to answer SVM request for port {port}");
            return;
        };
        let sfc_bits = if tail.success { SFC_SUCCESS } else { SFC_ERROR };
        let header = [
            self.config.coupler_node,
            self.config.npu_node,
            0,
            BlockType::Command.to_byte(0),
            pfc,
            sfc | sfc_bits,
        ];
        response.extend_from_slice(&header);
        response.extend_from_slice(&[port, 0]);
        response.extend_from_slice(&tail.fields);
        bip.request_upline_transfer(response);
    }

    fn conf_line(&mut self, bytes: &[u8], port: u8, tables: &mut SvmTables<'_>) -> SvmResult<ResponseTail> {
        let line_type = bytes[BLK_OFF_LT];
        let terminal_type = bytes[BLK_OFF_TT];
        let lcb = tables.lcbs.get_mut(port).ok_or(SvmError::PortOutOfRange(port))?;
        if lcb.config_state != LineConfState::NotConfigured {
            return Ok(ResponseTail {
                success: false,
                fields: vec![line_type, terminal_type, rc::ALREADY_CONFIGURED],
            });
        }
        if line_type != LINE_TYPE_SWITCHED_ASYNC {
            return Ok(ResponseTail {
                success: false,
                fields: vec![line_type, terminal_type, rc::INVALID_LINE_TYPE],
            });
        }

        lcb.config_state = LineConfState::Configured;
        lcb.line_type = line_type;
        lcb.terminal_type = terminal_type;
        lcb.line_state = LineState::Inoperative;

        let mut offset = BLK_OFF_FN;
        while offset + 1 < bytes.len() {
            let fn_code = bytes[offset];
            let fv = bytes[offset + 1];
            match fn_code {
                FN_LINE_SPEED_INDEX => lcb.speed_index = fv,
                FN_LINE_OWNER => debug!("line {port} owner field {fv} parsed, not stored"),
                other => debug!("line {port} FN code {other} parsed, not stored"),
            }
            offset += 2;
        }

        if let Some(pcb) = tables.pcbs.get_mut(port) {
            pcb.disabled = true;
            pcb.wait_for_tcb = true;
        }

        Ok(ResponseTail {
            success: true,
            fields: vec![line_type, terminal_type, rc::OK],
        })
    }

    fn ena_line(&mut self, port: u8, tables: &mut SvmTables<'_>) -> SvmResult<ResponseTail> {
        let lcb = tables.lcbs.get_mut(port).ok_or(SvmError::PortOutOfRange(port))?;
        if lcb.config_state != LineConfState::Configured {
            return Ok(ResponseTail::error(rc::NOT_CONFIGURED));
        }
        lcb.config_state = LineConfState::InoperativeWaiting;
        lcb.line_state = LineState::NoRing;
        let line_state = lcb.line_state as u8;
        let line_type = lcb.line_type;
        let config_state = lcb.config_state as u8;
        if let Some(pcb) = tables.pcbs.get_mut(port) {
            pcb.disabled = false;
        }
        Ok(ResponseTail {
            success: true,
            fields: vec![line_state, line_type, config_state, 0],
        })
    }

    fn disa_line(&mut self, port: u8, tables: &mut SvmTables<'_>) -> SvmResult<ResponseTail> {
        let lcb = tables.lcbs.get_mut(port).ok_or(SvmError::PortOutOfRange(port))?;
        if lcb.config_state != LineConfState::InoperativeWaiting {
            return Ok(ResponseTail::error(rc::NOT_CONFIGURED));
        }
        lcb.config_state = LineConfState::Configured;
        lcb.line_state = LineState::Inoperative;
        let line_type = lcb.line_type;
        let config_state = lcb.config_state as u8;
        let num_terminals = lcb.num_terminals;
        if let Some(pcb) = tables.pcbs.get_mut(port) {
            pcb.disabled = true;
        }
        Ok(ResponseTail {
            success: true,
            fields: vec![0, line_type, config_state, num_terminals],
        })
    }

    fn disc_line(&mut self, port: u8, tables: &mut SvmTables<'_>) -> SvmResult<ResponseTail> {
        let lcb = tables.lcbs.get_mut(port).ok_or(SvmError::PortOutOfRange(port))?;
        if lcb.config_state == LineConfState::NotConfigured {
            return Ok(ResponseTail::error(rc::NOT_CONFIGURED));
        }
        if lcb.num_terminals != 0 {
            // The host-disconnect-with-terminals path is not implemented;
            // see the Open Questions in DESIGN.md. The response is still
            // success-framed, with rc = Inoperative and the full tail, and
            // no state change.
            let line_type = lcb.line_type;
            let config_state = lcb.config_state as u8;
            let num_terminals = lcb.num_terminals;
            return Ok(ResponseTail {
                success: true,
                fields: vec![LineState::Inoperative as u8, line_type, config_state, num_terminals],
            });
        }
        lcb.config_state = LineConfState::InoperativeWaiting;
        lcb.line_state = LineState::NoRing;
        let line_state = lcb.line_state as u8;
        let line_type = lcb.line_type;
        let config_state = lcb.config_state as u8;
        let num_terminals = lcb.num_terminals;
        Ok(ResponseTail {
            success: true,
            fields: vec![line_state, line_type, config_state, num_terminals],
        })
    }

    fn conf_term(
        &mut self,
        bytes: &[u8],
        port: u8,
        reconfigure: bool,
        tables: &mut SvmTables<'_>,
    ) -> SvmResult<ResponseTail> {
        if bytes.len() <= BLK_OFF_TERM_CN {
            return Err(SvmError::MessageTooShort);
        }
        let cluster_address = bytes[BLK_OFF_CA];
        let terminal_address = bytes[BLK_OFF_TA];
        let device_type_byte = bytes[BLK_OFF_DT];
        let cn = bytes[BLK_OFF_TERM_CN];

        let line_terminal_type = {
            let lcb = tables.lcbs.get(port).ok_or(SvmError::PortOutOfRange(port))?;
            if !reconfigure && lcb.config_state != LineConfState::OperationalNoTcbs {
                return Ok(ResponseTail {
                    success: false,
                    fields: vec![cluster_address, terminal_address, device_type_byte, cn, rc::NOT_CONFIGURED],
                });
            }
            lcb.terminal_type
        };

        // The TIP type nibble comes from the line's stored terminal type
        // (set at ConfLine time), not from this message's TA byte at the
        // same offset.
        let tip_type_nibble = (line_terminal_type >> 3) & 0xf;
        let tip_type = match tip_type_nibble {
            1 => TipType::Async,
            other => TipType::Unsupported(other),
        };
        if matches!(tip_type, TipType::Unsupported(_)) {
            return Ok(ResponseTail {
                success: false,
                fields: vec![cluster_address, terminal_address, device_type_byte, cn, rc::INVALID_TERMINAL_TYPE],
            });
        }

        let device_type = DeviceType::from_byte(device_type_byte);
        let term_name = format_term_name(self.config.coupler_node, cluster_address, terminal_address);
        let owning_console = match (tip_type, device_type) {
            (TipType::Async, _) | (_, DeviceType::Console) => Some(cn),
            _ => tables.tcbs.find_by_cla_port_console(port),
        };

        let host_node = self.config.coupler_node;
        let tcb = tables.tcbs.get_mut(cn).ok_or(SvmError::MessageTooShort)?;
        tcb.cla_port = port;
        tcb.cluster_address = cluster_address;
        tcb.terminal_address = terminal_address;
        tcb.device_type = device_type;
        tcb.term_name = term_name;
        tcb.tip_type = tip_type;
        tcb.owning_console = owning_console;
        tcb.params = TipParams::default_tc0(host_node);
        tcb.in_buf.clear();
        tcb.in_buf_start = crate::block::INPUT_HEADER_LEN;
        tcb.in_buf_ptr = crate::block::INPUT_HEADER_LEN;
        let was_connected = tcb.state == TcbState::Connected;
        tcb.state = TcbState::Connected;

        if !reconfigure || !was_connected {
            let lcb = tables.lcbs.get_mut(port).ok_or(SvmError::PortOutOfRange(port))?;
            lcb.config_state = LineConfState::OperationalTcbsConfigured;
            lcb.num_terminals += 1;
            if let Some(pcb) = tables.pcbs.get_mut(port) {
                pcb.wait_for_tcb = false;
            }
        }

        Ok(ResponseTail {
            success: true,
            fields: vec![cluster_address, terminal_address, device_type_byte, cn, rc::OK],
        })
    }

    fn del_term(&mut self, bytes: &[u8], tables: &mut SvmTables<'_>) -> SvmResult<ResponseTail> {
        if bytes.len() <= BLK_OFF_TERM_CN {
            return Err(SvmError::MessageTooShort);
        }
        let cn = bytes[BLK_OFF_TERM_CN];
        let cluster_address = bytes[BLK_OFF_CA];
        let terminal_address = bytes[BLK_OFF_TA];
        let device_type_byte = bytes[BLK_OFF_DT];

        let tcb = tables.tcbs.get_mut(cn).ok_or(SvmError::MessageTooShort)?;
        let port = tcb.cla_port;
        let was_connected = tcb.state == TcbState::Connected;
        let was_npu_disconnect = tcb.state == TcbState::NpuRequestDisconnect;
        if was_connected {
            debug!("terminal {cn} (port {port}) disconnected by host DelTerm");
        }
        tcb.clear();

        let lcb = tables.lcbs.get_mut(port).ok_or(SvmError::PortOutOfRange(port))?;
        if lcb.num_terminals > 0 {
            lcb.num_terminals -= 1;
        }
        if lcb.num_terminals == 0 {
            lcb.config_state = LineConfState::InoperativeWaiting;
            lcb.line_state = LineState::NoRing;
            if let Some(pcb) = tables.pcbs.get_mut(port) {
                pcb.wait_for_tcb = true;
            }
        }
        let _ = was_npu_disconnect;

        Ok(ResponseTail {
            success: true,
            fields: vec![cluster_address, terminal_address, device_type_byte, cn, rc::OK],
        })
    }
}

fn format_term_name(coupler_node: u8, cluster_address: u8, terminal_address: u8) -> [u8; 7] {
    let text = format!("C{coupler_node:02X}{cluster_address:02X}{terminal_address:02X}");
    let mut name = [0u8; 7];
    name.copy_from_slice(&text.as_bytes()[..7]);
    name
}

struct ResponseTail {
    success: bool,
    fields: Vec<u8>,
}

impl ResponseTail {
    fn error(rc: u8) -> Self {
        ResponseTail {
            success: false,
            fields: vec![rc],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_support::NullBipSink;
    use crate::tests_support::UnlimitedBufferPool;

    fn tables(max_line_defs: u8, max_tcbs: u16) -> (LcbTable, TcbTable, PcbTable) {
        let mut pcbs = PcbTable::new(max_line_defs);
        for port in 0..max_line_defs {
            pcbs.get_mut(port).unwrap().configured = true;
        }
        (LcbTable::new(max_line_defs), TcbTable::new(max_tcbs), pcbs)
    }

    fn conf_line_buffer(port: u8, line_type: u8, terminal_type: u8) -> NpuBuffer {
        let mut buffer = NpuBuffer::new();
        buffer.extend_from_slice(&[
            0,
            0,
            0,
            BlockType::Command.to_byte(0),
            0x03,
            0x00,
            port,
            0,
            line_type,
            terminal_type,
        ]);
        buffer
    }

    #[test]
    fn conf_line_then_ena_line_transitions_to_inoperative_waiting() {
        let (mut lcbs, mut tcbs, mut pcbs) = tables(8, 8);
        let mut svm = SvmEngine::new(NpuConfig::default());
        let mut bip = NullBipSink::default();
        let mut pool = UnlimitedBufferPool;
        {
            let mut t = SvmTables { lcbs: &mut lcbs, tcbs: &mut tcbs, pcbs: &mut pcbs };
            svm.process_buffer(&conf_line_buffer(3, 6, 0x88), &mut t, &mut bip, &mut pool).unwrap();
        }
        assert_eq!(lcbs.get(3).unwrap().config_state, LineConfState::Configured);
        assert_eq!(bip.upline_transfers.len(), 1);
        let response = &bip.upline_transfers[0];
        assert_eq!(response[BLK_OFF_SFC] & SFC_SUCCESS, SFC_SUCCESS);

        let mut ena_buf = NpuBuffer::new();
        ena_buf.extend_from_slice(&[0, 0, 0, BlockType::Command.to_byte(0), 0x08, 0x00, 3, 0, 0, 0]);
        {
            let mut t = SvmTables { lcbs: &mut lcbs, tcbs: &mut tcbs, pcbs: &mut pcbs };
            svm.process_buffer(&ena_buf, &mut t, &mut bip, &mut pool).unwrap();
        }
        assert_eq!(lcbs.get(3).unwrap().config_state, LineConfState::InoperativeWaiting);
        assert!(!pcbs.get(3).unwrap().disabled);
    }

    #[test]
    fn conf_line_rejects_invalid_line_type() {
        let (mut lcbs, mut tcbs, mut pcbs) = tables(8, 8);
        let mut svm = SvmEngine::new(NpuConfig::default());
        let mut bip = NullBipSink::default();
        let mut pool = UnlimitedBufferPool;
        let mut t = SvmTables { lcbs: &mut lcbs, tcbs: &mut tcbs, pcbs: &mut pcbs };
        svm.process_buffer(&conf_line_buffer(3, 1, 0), &mut t, &mut bip, &mut pool).unwrap();
        assert_eq!(t.lcbs.get(3).unwrap().config_state, LineConfState::NotConfigured);
        let response = &bip.upline_transfers[0];
        assert_eq!(response[BLK_OFF_SFC] & SFC_ERROR, SFC_ERROR);
    }

    #[test]
    fn conf_term_on_async_line_sets_owning_console_to_self() {
        let (mut lcbs, mut tcbs, mut pcbs) = tables(8, 8);
        let mut svm = SvmEngine::new(NpuConfig::default());
        let mut bip = NullBipSink::default();
        let mut pool = UnlimitedBufferPool;
        {
            // Terminal type 0x88's upper nibble (1) is what ConfTerm reads
            // back off the line to decide the TIP type.
            let mut t = SvmTables { lcbs: &mut lcbs, tcbs: &mut tcbs, pcbs: &mut pcbs };
            svm.process_buffer(&conf_line_buffer(3, 6, 0x88), &mut t, &mut bip, &mut pool).unwrap();
        }
        lcbs.get_mut(3).unwrap().config_state = LineConfState::OperationalNoTcbs;

        let mut conf_term = NpuBuffer::new();
        conf_term.extend_from_slice(&[0, 0, 0, BlockType::Command.to_byte(0), 0x03, 0x02, 3, 0, 1, 2, 0x00, 5]);
        let mut t = SvmTables { lcbs: &mut lcbs, tcbs: &mut tcbs, pcbs: &mut pcbs };
        svm.process_buffer(&conf_term, &mut t, &mut bip, &mut pool).unwrap();

        assert_eq!(tcbs.get(5).unwrap().owning_console, Some(5));
        assert_eq!(lcbs.get(3).unwrap().config_state, LineConfState::OperationalTcbsConfigured);
    }

    #[test]
    fn del_line_is_explicitly_unimplemented() {
        let (mut lcbs, mut tcbs, mut pcbs) = tables(8, 8);
        let mut svm = SvmEngine::new(NpuConfig::default());
        let mut bip = NullBipSink::default();
        let mut pool = UnlimitedBufferPool;
        let mut buffer = NpuBuffer::new();
        buffer.extend_from_slice(&[0, 0, 0, BlockType::Command.to_byte(0), 0x03, 0x01, 3, 0, 0, 0]);
        let mut t = SvmTables { lcbs: &mut lcbs, tcbs: &mut tcbs, pcbs: &mut pcbs };
        let result = svm.process_buffer(&buffer, &mut t, &mut bip, &mut pool);
        assert_eq!(result, Err(SvmError::DelLineUnimplemented));
    }
}
