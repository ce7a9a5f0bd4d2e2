// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Trait interfaces for the external collaborators this core consumes but
//! does not own: the shared buffer pool, the BIP upline demultiplexer, and
//! the terminal network layer. The channel simulator that drives HIP's
//! function-code surface is represented directly by `Npu`'s public methods
//! rather than a trait, since it is the caller, not a callee.

use crate::buffer::NpuBuffer;

/// Lends and reclaims the fixed-capacity buffers every framed message is
/// carried in. Exactly one component holds a given buffer at a time.
pub trait BufferPool {
    /// Borrows a fresh buffer, or `None` if the pool is exhausted.
    fn acquire(&mut self) -> Option<NpuBuffer>;

    /// Returns a buffer to the pool.
    fn release(&mut self, buffer: NpuBuffer);
}

/// The BIP demultiplexer: the layer that moves framed buffers between HIP
/// and the SVM/TIP protocol engines, and notifies HIP of upline-ready
/// conditions it cannot itself observe.
pub trait BipSink {
    /// A buffer is ready to stream upline to the host.
    fn request_upline_transfer(&mut self, buffer: NpuBuffer);
    /// A small canned message (no pool buffer backing it) is ready upline.
    fn request_upline_canned(&mut self, bytes: &[u8]);
    /// `OutNpuOrder` selected `OutServiceMsg`.
    fn notify_service_message(&mut self);
    /// `OutNpuOrder` selected `OutPriorHigh`/`OutPriorLow`.
    fn notify_data(&mut self, high_priority: bool);
    /// `OutNpuOrder` selected `NotReadyForInput`.
    fn retry_input(&mut self);
    /// A downline buffer has been fully received via `OutData`.
    fn notify_downline_received(&mut self, buffer: NpuBuffer);
    /// A downline buffer overflowed before end-of-message.
    fn abort_downline_received(&mut self);
    /// The in-flight upline buffer has been fully streamed to the host.
    fn notify_upline_sent(&mut self);
}

/// An event the terminal network layer reports back to the core on a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A terminal session connected on the named CLA port.
    Connected { cla_port: u8 },
    /// A terminal session disconnected on the named CLA port.
    Disconnected { cla_port: u8 },
}

/// The terminal network layer: owns sockets and raw character I/O for
/// every connected terminal session.
pub trait TerminalNetwork {
    /// Sends raw bytes to the terminal on the named connection.
    fn send(&mut self, cn: u8, bytes: &[u8]);
    /// Polls for the next pending connect/disconnect event, if any.
    fn poll(&mut self) -> Option<NetworkEvent>;
}
