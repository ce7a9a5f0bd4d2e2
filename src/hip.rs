// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The Host Interface Protocol: a function-code-driven register/memory
//! engine that emulates a CDC-style coupler.
//!
//! `HipContext` owns every register and the 64K-word program memory the
//! channel simulator loads boot images into. It knows nothing about SVM
//! or TIP; cross-subsystem effects (emitting the NPU-init message on a
//! macro boot, resetting SVM/TIP on `ClearNpu`) are the orchestrator's
//! job — see [`crate::npu::Npu`].

use log::error;
use log::warn;

use crate::collab::BipSink;

/// Number of 16-bit words in program memory.
pub const MEMORY_WORDS: usize = 65536;

/// Emulated cycles of coupler-status silence before the idle heartbeat
/// fires.
pub const CYCLES_ONE_SECOND: u64 = 100_000;

/// Threshold, in bytes, between `InputAvailLe256` and `InputAvailGt256`.
pub const UPLINE_SIZE_THRESHOLD: usize = 256;

/// Coupler-status bitfield.
pub mod status {
    pub const STATUS_LOADED: u16 = 1 << 2;
    pub const ADDR_LOADED: u16 = 1 << 3;
    pub const TRANSFER_COMPLETED: u16 = 1 << 5;
    pub const HOST_TRANSFER_TERM: u16 = 1 << 7;
    pub const ORDER_LOADED: u16 = 1 << 8;
    pub const NPU_STATUS_READ: u16 = 1 << 9;
    pub const TIMEOUT: u16 = 1 << 10;
}

/// NPU-status register values.
pub mod npu_status {
    pub const IGNORE: u16 = 0;
    pub const IDLE: u16 = 1;
    pub const READY_OUTPUT: u16 = 4;
    pub const NOT_READY_OUTPUT: u16 = 7;
    pub const READY_FOR_DUMP: u16 = 0o10;
    pub const INPUT_AVAIL_PRU: u16 = 0o14;
    pub const INPUT_AVAIL_LE_256: u16 = 0o15;
    pub const INPUT_AVAIL_GT_256: u16 = 0o16;
    pub const DUMP_OK: u16 = 0o10;
}

/// 12-bit HIP function codes, equipment mask already stripped.
pub mod function_code {
    pub const IN_MEM_ADDR0: u16 = 0o00;
    pub const IN_MEM_ADDR1: u16 = 0o01;
    pub const IN_DATA: u16 = 0o03;
    pub const IN_NPU_STATUS: u16 = 0o04;
    pub const IN_COUPLER_STATUS: u16 = 0o05;
    pub const IN_NPU_ORDER: u16 = 0o06;
    pub const IN_PROGRAM: u16 = 0o07;
    pub const OUT_MEM_ADDR0: u16 = 0o10;
    pub const OUT_MEM_ADDR1: u16 = 0o11;
    pub const OUT_DATA: u16 = 0o14;
    pub const OUT_PROGRAM: u16 = 0o15;
    pub const OUT_NPU_ORDER: u16 = 0o16;
    pub const START_NPU: u16 = 0o40;
    pub const CLEAR_NPU: u16 = 0o200;
    pub const CLEAR_COUPLER: u16 = 0o400;
}

/// End-of-record marker OR'd into the channel word on the last byte of an
/// upline data transfer.
pub const END_OF_RECORD: u16 = 0o4000;
/// End-of-message marker OR'd into the channel word on the last byte of a
/// downline data transfer.
pub const END_OF_MESSAGE: u16 = 0o4000;

/// Order codes decoded from the top 7 bits of an `OutNpuOrder` word.
mod order_code {
    pub const OUT_SERVICE_MSG: u16 = 1;
    pub const OUT_PRIOR_HIGH: u16 = 2;
    pub const OUT_PRIOR_LOW: u16 = 3;
    pub const NOT_READY_FOR_INPUT: u16 = 5;
}

/// HIP's own state machine: what kind of transfer, if any, is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HipState {
    Idle,
    Upline,
    Downline,
}

/// The host control program's run state, gated by a recognized boot image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HcpState {
    NotInitialized,
    Running,
    Reset,
}

/// Which boot image `StartNpu` recognized, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootImage {
    Micro,
    Dump,
    Macro,
    Unrecognized(u16),
}

use crate::buffer::NpuBuffer;

/// The HIP register/memory engine.
pub struct HipContext {
    coupler_status: u16,
    npu_status: u16,
    npu_order: u16,
    mem_addr: u16,
    mem_addr_high_latch: Option<u8>,
    memory: Box<[u16; MEMORY_WORDS]>,
    in_program_pending_low: Option<u8>,
    out_program_high_byte: Option<u8>,
    upline_buffer: Option<NpuBuffer>,
    upline_cursor: usize,
    downline_buffer: Option<NpuBuffer>,
    cycle: u64,
    last_status_write_cycle: u64,
    last_function: Option<u16>,
    hip_state: HipState,
    hcp_state: HcpState,
}

impl HipContext {
    pub fn new() -> Self {
        HipContext {
            coupler_status: 0,
            npu_status: npu_status::IGNORE,
            npu_order: 0,
            mem_addr: 0,
            mem_addr_high_latch: None,
            memory: Box::new([0u16; MEMORY_WORDS]),
            in_program_pending_low: None,
            out_program_high_byte: None,
            upline_buffer: None,
            upline_cursor: 0,
            downline_buffer: None,
            cycle: 0,
            last_status_write_cycle: 0,
            last_function: None,
            hip_state: HipState::Idle,
            hcp_state: HcpState::NotInitialized,
        }
    }

    pub fn hip_state(&self) -> HipState {
        self.hip_state
    }

    pub fn hcp_state(&self) -> HcpState {
        self.hcp_state
    }

    pub fn memory(&self) -> &[u16; MEMORY_WORDS] {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut [u16; MEMORY_WORDS] {
        &mut self.memory
    }

    /// Advances the emulated instruction clock; drives the idle heartbeat.
    pub fn advance_cycles(&mut self, cycles: u64) {
        self.cycle = self.cycle.wrapping_add(cycles);
    }

    fn write_npu_status(&mut self, value: u16) {
        self.npu_status = value;
        self.coupler_status |= status::STATUS_LOADED;
        self.last_status_write_cycle = self.cycle;
    }

    /// Forces HIP back to `Idle` on the function-select edge for the
    /// functions that do so (`OutMemAddr0`, `OutMemAddr1`, `OutProgram`),
    /// i.e. only when the channel switches *into* one of them, not on
    /// every byte while it stays selected.
    fn note_function_select(&mut self, function_code: u16) {
        if self.last_function != Some(function_code) {
            self.last_function = Some(function_code);
            if matches!(
                function_code,
                function_code::OUT_MEM_ADDR0 | function_code::OUT_MEM_ADDR1 | function_code::OUT_PROGRAM
            ) {
                self.hip_state = HipState::Idle;
            }
        }
    }

    /// Dispatches one HIP function code. `OutNpuOrder` additionally needs
    /// the BIP sink to deliver its notification; `StartNpu`, `ClearNpu`
    /// and `ClearCoupler` are handled separately by the orchestrator since
    /// they reach into SVM/TIP.
    pub fn dispatch(&mut self, function_code: u16, input: u16, bip: &mut dyn BipSink) -> u16 {
        self.note_function_select(function_code);
        match function_code {
            function_code::IN_MEM_ADDR0 => self.in_mem_addr0() as u16,
            function_code::IN_MEM_ADDR1 => self.in_mem_addr1() as u16,
            function_code::IN_DATA => self.in_data(bip),
            function_code::IN_NPU_STATUS => self.in_npu_status(),
            function_code::IN_COUPLER_STATUS => self.in_coupler_status(),
            function_code::IN_NPU_ORDER => self.in_npu_order(),
            function_code::IN_PROGRAM => self.in_program() as u16,
            function_code::OUT_MEM_ADDR0 => {
                self.out_mem_addr0(input as u8);
                0
            }
            function_code::OUT_MEM_ADDR1 => {
                self.out_mem_addr1(input as u8);
                0
            }
            function_code::OUT_DATA => {
                self.out_data(input, bip);
                0
            }
            function_code::OUT_PROGRAM => {
                self.out_program(input as u8);
                0
            }
            function_code::OUT_NPU_ORDER => {
                self.out_npu_order(input, bip);
                0
            }
            other => {
                warn!("declined unrecognized HIP function code {other:#o}");
                0
            }
        }
    }

    fn in_mem_addr0(&self) -> u8 {
        (self.mem_addr >> 8) as u8
    }

    fn in_mem_addr1(&mut self) -> u8 {
        self.coupler_status |= status::ADDR_LOADED;
        (self.mem_addr & 0xff) as u8
    }

    fn out_mem_addr0(&mut self, byte: u8) {
        self.mem_addr_high_latch = Some(byte);
    }

    fn out_mem_addr1(&mut self, byte: u8) {
        let high = self.mem_addr_high_latch.take().unwrap_or(0);
        self.mem_addr = u16::from_be_bytes([high, byte]);
        self.coupler_status |= status::ADDR_LOADED;
    }

    fn in_program(&mut self) -> u8 {
        match self.in_program_pending_low.take() {
            None => {
                let word = self.memory[self.mem_addr as usize];
                let low = (word & 0xff) as u8;
                self.in_program_pending_low = Some(low);
                (word >> 8) as u8
            }
            Some(low) => {
                self.mem_addr = self.mem_addr.wrapping_add(1);
                self.coupler_status |= status::TRANSFER_COMPLETED;
                low
            }
        }
    }

    fn out_program(&mut self, byte: u8) {
        match self.out_program_high_byte.take() {
            None => {
                self.out_program_high_byte = Some(byte);
            }
            Some(high) => {
                self.memory[self.mem_addr as usize] = u16::from_be_bytes([high, byte]);
                self.mem_addr = self.mem_addr.wrapping_add(1);
                self.coupler_status |= status::TRANSFER_COMPLETED;
            }
        }
    }

    fn in_npu_status(&mut self) -> u16 {
        let value = self.npu_status;
        self.coupler_status &= !status::STATUS_LOADED;
        self.npu_status = npu_status::IGNORE;
        value
    }

    fn in_npu_order(&self) -> u16 {
        self.npu_order
    }

    fn in_coupler_status(&mut self) -> u16 {
        let value = self.coupler_status;
        self.coupler_status |= status::NPU_STATUS_READ;
        if self.hip_state == HipState::Idle
            && self.hcp_state == HcpState::Running
            && self.cycle.wrapping_sub(self.last_status_write_cycle) > CYCLES_ONE_SECOND
        {
            self.write_npu_status(npu_status::IDLE);
        }
        value
    }

    fn out_npu_order(&mut self, order_word: u16, bip: &mut dyn BipSink) {
        self.npu_order = order_word;
        self.coupler_status |= status::ORDER_LOADED;
        self.hip_state = HipState::Idle;
        self.write_npu_status(npu_status::IDLE);

        let code = (order_word >> 5) & 0x7f;
        match code {
            order_code::OUT_SERVICE_MSG => bip.notify_service_message(),
            order_code::OUT_PRIOR_HIGH => bip.notify_data(true),
            order_code::OUT_PRIOR_LOW => bip.notify_data(false),
            order_code::NOT_READY_FOR_INPUT => bip.retry_input(),
            other => warn!("unrecognized NPU order code {other:#o}"),
        }
    }

    /// On the last byte, OR's in the end-of-record marker, transitions
    /// HIP back to `Idle`, and notifies that the upline buffer has been
    /// sent. Returns `0` if called with no buffer in flight (a channel
    /// bug, not a protocol condition this core needs to signal).
    fn in_data(&mut self, bip: &mut dyn BipSink) -> u16 {
        let Some(buffer) = self.upline_buffer.as_ref() else {
            warn!("InData with no upline buffer in flight");
            return 0;
        };
        let len = buffer.len();
        if self.upline_cursor >= len {
            return END_OF_RECORD;
        }
        let byte = buffer.as_slice()[self.upline_cursor];
        self.upline_cursor += 1;
        let last = self.upline_cursor == len;
        if last {
            self.hip_state = HipState::Idle;
            self.upline_buffer = None;
            self.upline_cursor = 0;
            bip.notify_upline_sent();
            (byte as u16) | END_OF_RECORD
        } else {
            byte as u16
        }
    }

    /// Absorbs one byte into the current downline buffer. `word`'s low 8
    /// bits are the byte; `END_OF_MESSAGE` marks the last byte.
    fn out_data(&mut self, word: u16, bip: &mut dyn BipSink) {
        let Some(buffer) = self.downline_buffer.as_mut() else {
            warn!("OutData with no downline buffer in flight");
            return;
        };
        let byte = (word & 0xff) as u8;
        if !buffer.push(byte) {
            self.hip_state = HipState::Idle;
            self.downline_buffer = None;
            bip.abort_downline_received();
            return;
        }
        if word & END_OF_MESSAGE != 0 {
            let buffer = self.downline_buffer.take().unwrap();
            self.hip_state = HipState::Idle;
            bip.notify_downline_received(buffer);
        }
    }

    /// Called by the orchestrator when SVM/TIP hands HIP a buffer to
    /// stream upline. Computes the NPU-status word describing it.
    pub fn upline_block(&mut self, buffer: NpuBuffer, pru_hint: Option<(usize, bool)>) {
        let len = buffer.len();
        self.upline_buffer = Some(buffer);
        self.upline_cursor = 0;
        self.hip_state = HipState::Upline;
        let status_value = match pru_hint {
            Some((bit_len, eight_bit)) => {
                let bits_per_char = if eight_bit { 8 } else { 6 };
                let total_bits = bit_len as u64 * bits_per_char;
                let pru_count = ((total_bits + 59) / 60) as u16;
                npu_status::INPUT_AVAIL_PRU | (pru_count << 4)
            }
            None if len <= UPLINE_SIZE_THRESHOLD => npu_status::INPUT_AVAIL_LE_256,
            None => npu_status::INPUT_AVAIL_GT_256,
        };
        self.write_npu_status(status_value);
    }

    /// Called by the orchestrator when the lower layer wants to prepare a
    /// downline buffer. Returns `false` (and writes `NotReadyOutput`) if
    /// the pool is exhausted.
    pub fn downline_block(&mut self, buffer: Option<NpuBuffer>) -> bool {
        match buffer {
            Some(buffer) => {
                self.downline_buffer = Some(buffer);
                self.hip_state = HipState::Downline;
                self.write_npu_status(npu_status::READY_OUTPUT);
                true
            }
            None => {
                self.write_npu_status(npu_status::NOT_READY_OUTPUT);
                false
            }
        }
    }

    /// The 16-bit wrapping sum of memory words 0..15.
    pub fn fingerprint(&self) -> u16 {
        self.memory[0..16].iter().fold(0u16, |acc, word| acc.wrapping_add(*word))
    }

    /// `StartNpu`: recognizes the fingerprint and selects a boot image.
    /// Starting the macro image while already running is fatal and
    /// leaves state unchanged.
    pub fn start_npu(&mut self) -> BootImage {
        if self.hcp_state == HcpState::Running {
            error!("StartNpu invoked while the macro image is already running");
            return BootImage::Macro;
        }
        match self.fingerprint() {
            0xAC79 => {
                self.write_npu_status(npu_status::IDLE);
                BootImage::Micro
            }
            0x4A2B => {
                self.memory[0x1ff] = 1024;
                self.write_npu_status(npu_status::DUMP_OK);
                BootImage::Dump
            }
            0x8610 | 0xEC98 => {
                self.hcp_state = HcpState::Running;
                BootImage::Macro
            }
            other => {
                error!("StartNpu saw unrecognized image fingerprint {other:#06x}");
                BootImage::Unrecognized(other)
            }
        }
    }

    /// `ClearCoupler`: clears every coupler-status bit except
    /// `StatusLoaded`.
    pub fn clear_coupler(&mut self) {
        self.coupler_status &= status::STATUS_LOADED;
    }

    /// The unconditional tail of `ClearNpu`: zero coupler status, clear
    /// the half-word transfer flags, HIP back to `Idle`. Order-sensitive
    /// SVM/TIP/network resets are the orchestrator's job.
    pub fn reset_registers(&mut self) {
        self.coupler_status = 0;
        self.npu_status = npu_status::IGNORE;
        self.in_program_pending_low = None;
        self.out_program_high_byte = None;
        self.mem_addr_high_latch = None;
        self.upline_buffer = None;
        self.upline_cursor = 0;
        self.downline_buffer = None;
        self.hip_state = HipState::Idle;
        self.hcp_state = HcpState::Reset;
        self.last_function = None;
    }
}

impl Default for HipContext {
    fn default() -> Self {
        Self::new()
    }
}
