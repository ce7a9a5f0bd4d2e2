// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! `Npu`: the single owned context that wires HIP, SVM and TIP together.
//!
//! Everything the channel simulator and the terminal network touch goes
//! through this type rather than through ambient global state, per the
//! "Global tables" design note: the LCB/TCB/PCB arrays and the HIP
//! register file all live here as plain fields.

use log::debug;
use log::warn;

use crate::block::BlockType;
use crate::block::BLK_OFF_BT;
use crate::block::BLK_OFF_CN;
use crate::block::BLK_OFF_PFC;
use crate::buffer::NpuBuffer;
use crate::collab::BipSink;
use crate::collab::BufferPool;
use crate::collab::NetworkEvent;
use crate::collab::TerminalNetwork;
use crate::config::NpuConfig;
use crate::hip::function_code;
use crate::hip::BootImage;
use crate::hip::HcpState;
use crate::hip::HipContext;
use crate::hip::HipState;
use crate::svm::lcb::LcbTable;
use crate::svm::SvmEngine;
use crate::svm::SvmTables;
use crate::tip::async_tip;
use crate::tip::pcb::PcbTable;
use crate::tip::tcb::TcbState;
use crate::tip::tcb::TcbTable;
use crate::tip::tcb::TipType;
use crate::tip::TipEngine;

/// Forwards every `BipSink` notification except the downline ones, which
/// it captures locally so `Npu` can demultiplex the finished buffer to
/// SVM or TIP itself rather than bouncing back through the caller.
struct DownlineCapture<'a> {
    inner: &'a mut dyn BipSink,
    received: Option<NpuBuffer>,
}

impl<'a> BipSink for DownlineCapture<'a> {
    fn request_upline_transfer(&mut self, buffer: NpuBuffer) {
        self.inner.request_upline_transfer(buffer);
    }

    fn request_upline_canned(&mut self, bytes: &[u8]) {
        self.inner.request_upline_canned(bytes);
    }

    fn notify_service_message(&mut self) {
        self.inner.notify_service_message();
    }

    fn notify_data(&mut self, high_priority: bool) {
        self.inner.notify_data(high_priority);
    }

    fn retry_input(&mut self) {
        self.inner.retry_input();
    }

    fn notify_downline_received(&mut self, buffer: NpuBuffer) {
        self.received = Some(buffer);
    }

    fn abort_downline_received(&mut self) {
        self.inner.abort_downline_received();
    }

    fn notify_upline_sent(&mut self) {
        self.inner.notify_upline_sent();
    }
}

/// The emulation core: HIP's register/memory engine plus the SVM and TIP
/// protocol engines and the state tables they share.
pub struct Npu {
    config: NpuConfig,
    hip: HipContext,
    svm: SvmEngine,
    tip: TipEngine,
    lcbs: LcbTable,
    tcbs: TcbTable,
    pcbs: PcbTable,
}

impl Npu {
    pub fn new(config: NpuConfig) -> Self {
        Npu {
            lcbs: LcbTable::new(config.max_line_defs),
            tcbs: TcbTable::new(config.max_tcbs),
            pcbs: PcbTable::new(config.max_line_defs),
            svm: SvmEngine::new(config),
            tip: TipEngine::new(config),
            hip: HipContext::new(),
            config,
        }
    }

    pub fn hip(&self) -> &HipContext {
        &self.hip
    }

    pub fn lcbs(&self) -> &LcbTable {
        &self.lcbs
    }

    pub fn tcbs(&self) -> &TcbTable {
        &self.tcbs
    }

    pub fn pcbs(&self) -> &PcbTable {
        &self.pcbs
    }

    /// Binds (or unbinds) a CLA port to a network configuration. Real
    /// network configuration is out of scope; this is the minimal hook
    /// SVM's "PCB has a configured network binding" precondition needs.
    pub fn set_port_configured(&mut self, cla_port: u8, configured: bool) {
        if let Some(pcb) = self.pcbs.get_mut(cla_port) {
            pcb.configured = configured;
        }
    }

    pub fn advance_cycles(&mut self, cycles: u64) {
        self.hip.advance_cycles(cycles);
    }

    /// Hands a framed buffer to HIP for upline streaming (`InData`).
    pub fn upline_block(&mut self, buffer: NpuBuffer, pru_hint: Option<(usize, bool)>) {
        self.hip.upline_block(buffer, pru_hint);
    }

    /// Prepares HIP to receive a downline buffer (`OutData`), or declines
    /// if the pool is exhausted.
    pub fn downline_block(&mut self, buffer: Option<NpuBuffer>) -> bool {
        self.hip.downline_block(buffer)
    }

    /// The channel simulator's single entry point for every HIP function
    /// code, including `StartNpu`/`ClearNpu`/`ClearCoupler`, which need
    /// access to SVM/TIP that `HipContext` alone does not have.
    pub fn dispatch_function(
        &mut self,
        function_code: u16,
        input: u16,
        bip: &mut dyn BipSink,
        network: &mut dyn TerminalNetwork,
        pool: &mut dyn BufferPool,
    ) -> u16 {
        let mut capture = DownlineCapture { inner: bip, received: None };

        let result = match function_code {
            function_code::START_NPU => {
                self.start_npu(&mut capture);
                0
            }
            function_code::CLEAR_NPU => {
                self.clear_npu();
                0
            }
            function_code::CLEAR_COUPLER => {
                self.hip.clear_coupler();
                0
            }
            function_code::IN_COUPLER_STATUS => {
                if self.hip.hip_state() == HipState::Idle {
                    self.poll_network(network, &mut capture, pool);
                }
                self.hip.dispatch(function_code, input, &mut capture)
            }
            _ => self.hip.dispatch(function_code, input, &mut capture),
        };

        if let Some(buffer) = capture.received {
            self.process_downline(buffer, &mut capture, network, pool);
        }
        result
    }

    fn start_npu(&mut self, bip: &mut dyn BipSink) -> BootImage {
        let was_running = self.hip.hcp_state() == HcpState::Running;
        let image = self.hip.start_npu();
        if !was_running && image == BootImage::Macro {
            self.svm.send_npu_init_response(bip);
        }
        image
    }

    /// `ClearNpu`: if the host control program was running, resets TIP
    /// and SVM state (network/BIP resets are the embedder's concern);
    /// unconditionally zeroes HIP's registers and returns it to `Idle`.
    fn clear_npu(&mut self) {
        if self.hip.hcp_state() == HcpState::Running {
            let mut tables = SvmTables { lcbs: &mut self.lcbs, tcbs: &mut self.tcbs, pcbs: &mut self.pcbs };
            self.svm.reset(&mut tables);
        }
        self.hip.reset_registers();
    }

    fn poll_network(&mut self, network: &mut dyn TerminalNetwork, bip: &mut dyn BipSink, pool: &mut dyn BufferPool) {
        while let Some(event) = network.poll() {
            match event {
                NetworkEvent::Connected { cla_port } => {
                    let mut tables = SvmTables { lcbs: &mut self.lcbs, tcbs: &mut self.tcbs, pcbs: &mut self.pcbs };
                    self.svm.notify_terminal_connected(cla_port, &mut tables, bip);
                }
                NetworkEvent::Disconnected { cla_port } => {
                    if let Some(cn) = self.tcbs_iter_find_connected(cla_port) {
                        self.send_disc_request(cn, bip, pool);
                    }
                }
            }
        }
    }

    fn tcbs_iter_find_connected(&self, cla_port: u8) -> Option<u8> {
        (0..self.config.max_tcbs).map(|cn| cn as u8).find(|&cn| {
            self.tcbs.get(cn).map(|tcb| tcb.cla_port == cla_port && tcb.state == TcbState::Connected).unwrap_or(false)
        })
    }

    /// `SendDiscRequest`: the NPU, not the host, decides a terminal
    /// session should be torn down (e.g. the network socket closed).
    pub fn send_disc_request(&mut self, cn: u8, bip: &mut dyn BipSink, pool: &mut dyn BufferPool) {
        let mut tables = SvmTables { lcbs: &mut self.lcbs, tcbs: &mut self.tcbs, pcbs: &mut self.pcbs };
        self.svm.send_disc_request(cn, &mut tables, bip, pool);
    }

    /// Delivers raw bytes read from a terminal's network connection into
    /// the async-TIP upline assembler for the TCB connected on `cla_port`.
    pub fn terminal_input(&mut self, cla_port: u8, bytes: &[u8], network: &mut dyn TerminalNetwork, bip: &mut dyn BipSink) {
        let Some(cn) = self.tcbs_iter_find_connected(cla_port) else {
            warn!("terminal input on CLA port {cla_port} with no connected TCB");
            return;
        };
        let Some(tcb) = self.tcbs.get_mut(cn) else { return };
        match tcb.tip_type {
            TipType::Async => async_tip::process_upline_normal(tcb, bytes, network, &self.tip, bip),
            TipType::Unsupported(t) => warn!("terminal input for unsupported TIP type {t} on connection {cn}"),
        }
    }

    /// Demultiplexes a completed downline buffer to SVM or TIP by block
    /// type, then releases it. `Command` blocks addressed to CN 0 are
    /// genuine service messages; a short `Command`-shaped buffer with a
    /// non-zero CN is actually a misrouted input acknowledgement and is
    /// handed to TIP instead, matching the original demultiplexer's
    /// special case.
    fn process_downline(&mut self, buffer: NpuBuffer, bip: &mut dyn BipSink, network: &mut dyn TerminalNetwork, pool: &mut dyn BufferPool) {
        let bytes = buffer.as_slice();
        if bytes.len() <= BLK_OFF_BT {
            warn!("downline buffer shorter than the block header, dropped");
            pool.release(buffer);
            return;
        }
        let block_type = BlockType::from_byte(bytes[BLK_OFF_BT]);
        let cn = bytes[BLK_OFF_CN];
        let route_to_tip = match block_type {
            Some(BlockType::Command) => cn != 0 && bytes.len() <= BLK_OFF_PFC,
            Some(BlockType::Block) | Some(BlockType::Message) | Some(BlockType::Back) => true,
            None => false,
        };

        if route_to_tip {
            if let Err(e) = self.tip.process_buffer(&buffer, &mut self.tcbs, network, bip) {
                debug!("TIP dropped downline buffer: {e}");
            }
        } else if block_type == Some(BlockType::Command) && cn == 0 {
            let mut tables = SvmTables { lcbs: &mut self.lcbs, tcbs: &mut self.tcbs, pcbs: &mut self.pcbs };
            if let Err(e) = self.svm.process_buffer(&buffer, &mut tables, bip, pool) {
                debug!("SVM dropped downline buffer: {e}");
            }
        } else {
            warn!("downline buffer could not be routed (bt={block_type:?}, cn={cn}), dropped");
        }
        pool.release(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLK_OFF_SFC;
    use crate::hip::npu_status;
    use crate::hip::status;
    use crate::hip::CYCLES_ONE_SECOND;
    use crate::svm::lcb::LineConfState;
    use crate::svm::lcb::LineState;
    use crate::tests_support::init_test_logging;
    use crate::tests_support::FakeNetwork;
    use crate::tests_support::NullBipSink;
    use crate::tests_support::UnlimitedBufferPool;
    use crate::tip::tcb::DeviceType;

    fn load_fingerprint(npu: &mut Npu, value: u16) {
        npu.hip.memory_mut()[0] = value;
    }

    #[test]
    fn macro_boot_emits_npu_init_and_starts_running() {
        let mut npu = Npu::new(NpuConfig::default());
        load_fingerprint(&mut npu, 0x8610);
        let mut bip = NullBipSink::default();
        let mut network = FakeNetwork::default();
        let mut pool = UnlimitedBufferPool;

        npu.dispatch_function(function_code::START_NPU, 0, &mut bip, &mut network, &mut pool);

        assert_eq!(npu.hip().hcp_state(), HcpState::Running);
        assert_eq!(bip.upline_canned.len(), 1);
        let msg = &bip.upline_canned[0];
        assert_eq!(msg.len(), 9);
        assert_eq!(&msg[4..], &[1, 2, 3, 1, 1]);
    }

    #[test]
    fn idle_heartbeat_fires_after_silence() {
        let mut npu = Npu::new(NpuConfig::default());
        load_fingerprint(&mut npu, 0x8610);
        let mut bip = NullBipSink::default();
        let mut network = FakeNetwork::default();
        let mut pool = UnlimitedBufferPool;
        npu.dispatch_function(function_code::START_NPU, 0, &mut bip, &mut network, &mut pool);

        npu.advance_cycles(CYCLES_ONE_SECOND + 1);
        let status_word = npu.dispatch_function(function_code::IN_COUPLER_STATUS, 0, &mut bip, &mut network, &mut pool);
        assert_ne!(status_word & (status::STATUS_LOADED as u16), 0);
        let npu_status_word = npu.dispatch_function(function_code::IN_NPU_STATUS, 0, &mut bip, &mut network, &mut pool);
        assert_eq!(npu_status_word, npu_status::IDLE);
    }

    fn conf_line_buffer(port: u8, line_type: u8, terminal_type: u8) -> Vec<u8> {
        vec![0, 0, 0, BlockType::Command.to_byte(0), 0x03, 0x00, port, 0, line_type, terminal_type]
    }

    fn deliver_downline(npu: &mut Npu, bytes: &[u8], bip: &mut dyn BipSink, network: &mut dyn TerminalNetwork, pool: &mut dyn BufferPool) {
        assert!(npu.downline_block(Some(NpuBuffer::new())));
        for (i, &byte) in bytes.iter().enumerate() {
            let word = if i + 1 == bytes.len() { byte as u16 | crate::hip::END_OF_MESSAGE } else { byte as u16 };
            npu.dispatch_function(function_code::OUT_DATA, word, bip, network, pool);
        }
    }

    #[test]
    fn configure_and_enable_async_line_then_connect_and_configure_terminal() {
        init_test_logging();
        let mut npu = Npu::new(NpuConfig::default());
        npu.set_port_configured(3, true);
        let mut bip = NullBipSink::default();
        let mut network = FakeNetwork::default();
        let mut pool = UnlimitedBufferPool;

        let conf = conf_line_buffer(3, 6, 0x88);
        deliver_downline(&mut npu, &conf, &mut bip, &mut network, &mut pool);

        assert_eq!(npu.lcbs().get(3).unwrap().config_state, LineConfState::Configured);
        assert_eq!(bip.upline_transfers.len(), 1);
        assert_eq!(bip.upline_transfers[0][BLK_OFF_SFC] & crate::block::SFC_SUCCESS, crate::block::SFC_SUCCESS);

        let ena = vec![0, 0, 0, BlockType::Command.to_byte(0), 0x08, 0x00, 3, 0, 0, 0];
        deliver_downline(&mut npu, &ena, &mut bip, &mut network, &mut pool);
        assert_eq!(npu.lcbs().get(3).unwrap().config_state, LineConfState::InoperativeWaiting);
        assert!(!npu.pcbs().get(3).unwrap().disabled);

        network.events.push_back(NetworkEvent::Connected { cla_port: 3 });
        npu.dispatch_function(function_code::IN_COUPLER_STATUS, 0, &mut bip, &mut network, &mut pool);
        assert_eq!(npu.lcbs().get(3).unwrap().config_state, LineConfState::OperationalNoTcbs);
        assert_eq!(npu.lcbs().get(3).unwrap().line_state, LineState::Operational);

        let conf_term = vec![0, 0, 0, BlockType::Command.to_byte(0), 0x03, 0x02, 3, 0, 1, 2, 0x00, 5];
        deliver_downline(&mut npu, &conf_term, &mut bip, &mut network, &mut pool);
        assert_eq!(npu.tcbs().get(5).unwrap().state, TcbState::Connected);
        assert_eq!(npu.tcbs().get(5).unwrap().device_type, DeviceType::Console);
        assert_eq!(npu.lcbs().get(3).unwrap().config_state, LineConfState::OperationalTcbsConfigured);
        assert_eq!(npu.lcbs().get(3).unwrap().num_terminals, 1);
    }

    #[test]
    fn npu_disconnect_drains_output_queue_and_sets_npu_request_disconnect() {
        let mut npu = Npu::new(NpuConfig::default());
        npu.set_port_configured(3, true);
        {
            let lcb = npu.lcbs.get_mut(3).unwrap();
            lcb.config_state = LineConfState::OperationalTcbsConfigured;
        }
        {
            let tcb = npu.tcbs.get_mut(5).unwrap();
            tcb.cla_port = 3;
            tcb.state = TcbState::Connected;
            tcb.xoff = true;
            tcb.output_queue.push_back(NpuBuffer::new());
        }
        let mut bip = NullBipSink::default();
        let mut pool = UnlimitedBufferPool;

        npu.send_disc_request(5, &mut bip, &mut pool);

        assert_eq!(npu.lcbs().get(3).unwrap().config_state, LineConfState::InoperativeTcbsConfigured);
        assert_eq!(npu.tcbs().get(5).unwrap().state, TcbState::NpuRequestDisconnect);
        assert!(npu.tcbs().get(5).unwrap().output_queue.is_empty());
        assert!(!npu.tcbs().get(5).unwrap().xoff);
        assert_eq!(bip.upline_canned.len(), 1);
    }

    #[test]
    fn clear_coupler_preserves_status_loaded_bit() {
        let mut npu = Npu::new(NpuConfig::default());
        load_fingerprint(&mut npu, 0x8610);
        let mut bip = NullBipSink::default();
        let mut network = FakeNetwork::default();
        let mut pool = UnlimitedBufferPool;
        npu.dispatch_function(function_code::START_NPU, 0, &mut bip, &mut network, &mut pool);
        npu.dispatch_function(function_code::IN_COUPLER_STATUS, 0, &mut bip, &mut network, &mut pool);
        npu.dispatch_function(function_code::CLEAR_COUPLER, 0, &mut bip, &mut network, &mut pool);
        let status_word = npu.dispatch_function(function_code::IN_COUPLER_STATUS, 0, &mut bip, &mut network, &mut pool);
        assert_eq!(status_word & !(status::NPU_STATUS_READ as u16), status::STATUS_LOADED as u16);
    }
}
