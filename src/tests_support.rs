// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! In-memory fakes for the collaborator traits, shared by unit tests
//! across modules and by the end-to-end scenario tests in `npu.rs`.

#![cfg(test)]

use std::collections::VecDeque;

use crate::buffer::NpuBuffer;
use crate::collab::BipSink;
use crate::collab::BufferPool;
use crate::collab::NetworkEvent;
use crate::collab::TerminalNetwork;

/// Installs the env_logger subscriber so `cargo test -- --nocapture` shows
/// `log` output from the engines under test. Safe to call from every test;
/// only the first call takes effect.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every notification it receives instead of acting on them.
#[derive(Default)]
pub struct NullBipSink {
    pub upline_transfers: Vec<Vec<u8>>,
    pub upline_canned: Vec<Vec<u8>>,
    pub service_message_count: u32,
    pub data_notifications: Vec<bool>,
    pub retry_input_count: u32,
    pub downline_received: Option<Vec<u8>>,
    pub abort_count: u32,
    pub upline_sent: u32,
}

impl BipSink for NullBipSink {
    fn request_upline_transfer(&mut self, buffer: NpuBuffer) {
        self.upline_transfers.push(buffer.as_slice().to_vec());
    }

    fn request_upline_canned(&mut self, bytes: &[u8]) {
        self.upline_canned.push(bytes.to_vec());
    }

    fn notify_service_message(&mut self) {
        self.service_message_count += 1;
    }

    fn notify_data(&mut self, high_priority: bool) {
        self.data_notifications.push(high_priority);
    }

    fn retry_input(&mut self) {
        self.retry_input_count += 1;
    }

    fn notify_downline_received(&mut self, buffer: NpuBuffer) {
        self.downline_received = Some(buffer.as_slice().to_vec());
    }

    fn abort_downline_received(&mut self) {
        self.abort_count += 1;
    }

    fn notify_upline_sent(&mut self) {
        self.upline_sent += 1;
    }
}

/// A buffer pool with unlimited capacity, backed by freshly allocated
/// buffers rather than a real free list.
#[derive(Default)]
pub struct UnlimitedBufferPool;

impl BufferPool for UnlimitedBufferPool {
    fn acquire(&mut self) -> Option<NpuBuffer> {
        Some(NpuBuffer::new())
    }

    fn release(&mut self, _buffer: NpuBuffer) {}
}

/// A terminal network fake: queues events to report, records sent bytes
/// per connection.
#[derive(Default)]
pub struct FakeNetwork {
    pub events: VecDeque<NetworkEvent>,
    pub sent: Vec<(u8, Vec<u8>)>,
}

impl TerminalNetwork for FakeNetwork {
    fn send(&mut self, cn: u8, bytes: &[u8]) {
        self.sent.push((cn, bytes.to_vec()));
    }

    fn poll(&mut self) -> Option<NetworkEvent> {
        self.events.pop_front()
    }
}
