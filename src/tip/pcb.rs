// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The CLA-port-keyed Port Control Block table.
//!
//! The terminal network layer is the real owner of connection sockets;
//! this struct holds only the fields SVM/TIP read and write directly.

/// One CLA port's connection bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct Pcb {
    pub cla_port: u8,
    /// `true` once a network configuration is bound to this port.
    pub configured: bool,
    /// Line is waiting for a terminal network connection before it can
    /// go operational.
    pub wait_for_tcb: bool,
    /// Line is administratively disabled.
    pub disabled: bool,
}

impl Pcb {
    pub fn new(cla_port: u8) -> Self {
        Pcb {
            cla_port,
            ..Default::default()
        }
    }
}

/// The CLA-port-indexed PCB table.
pub struct PcbTable {
    ports: Vec<Pcb>,
}

impl PcbTable {
    pub fn new(max_line_defs: u8) -> Self {
        PcbTable {
            ports: (0..max_line_defs).map(Pcb::new).collect(),
        }
    }

    pub fn get(&self, cla_port: u8) -> Option<&Pcb> {
        self.ports.get(cla_port as usize)
    }

    pub fn get_mut(&mut self, cla_port: u8) -> Option<&mut Pcb> {
        self.ports.get_mut(cla_port as usize)
    }
}
