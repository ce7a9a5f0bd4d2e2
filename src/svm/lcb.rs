// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The per-port Line Control Block table.

/// Line configuration state, one per port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineConfState {
    NotConfigured = 0,
    Configured = 1,
    EnableRequested = 2,
    OperationalNoTcbs = 3,
    OperationalTcbsConfigured = 4,
    DisableRequested = 5,
    InoperativeNoTcbs = 6,
    InoperativeTcbsConfigured = 7,
    DisconnectRequested = 8,
    InoperativeWaiting = 9,
}

/// Line operational state as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Operational = 0,
    Inoperative = 4,
    NoRing = 5,
    Stop = 6,
}

/// Only switched-async lines are supported; every other line type is
/// rejected by `ConfLine`.
pub const LINE_TYPE_SWITCHED_ASYNC: u8 = 6;

/// One port's configuration and operational state.
#[derive(Debug, Clone, Copy)]
pub struct LineControlBlock {
    pub port: u8,
    pub config_state: LineConfState,
    pub line_state: LineState,
    pub line_type: u8,
    pub terminal_type: u8,
    pub speed_index: u8,
    pub num_terminals: u8,
}

impl LineControlBlock {
    pub fn new(port: u8) -> Self {
        LineControlBlock {
            port,
            config_state: LineConfState::NotConfigured,
            line_state: LineState::Inoperative,
            line_type: 0,
            terminal_type: 0,
            speed_index: 0,
            num_terminals: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = LineControlBlock::new(self.port);
    }
}

/// The port-indexed LCB table; pre-allocated at init, sized by
/// [`crate::config::NpuConfig::max_line_defs`].
pub struct LcbTable {
    lines: Vec<LineControlBlock>,
}

impl LcbTable {
    pub fn new(max_line_defs: u8) -> Self {
        LcbTable {
            lines: (0..max_line_defs).map(LineControlBlock::new).collect(),
        }
    }

    pub fn get(&self, port: u8) -> Option<&LineControlBlock> {
        self.lines.get(port as usize)
    }

    pub fn get_mut(&mut self, port: u8) -> Option<&mut LineControlBlock> {
        self.lines.get_mut(port as usize)
    }

    pub fn reset_all(&mut self) {
        for line in &mut self.lines {
            line.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_not_configured() {
        let table = LcbTable::new(4);
        assert_eq!(table.get(0).unwrap().config_state, LineConfState::NotConfigured);
        assert!(table.get(4).is_none());
    }
}
