// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Emulation core for a CCI-based Network Processing Unit front-end
//! processor: the Host Interface Protocol (HIP) coupler channel, the
//! Service Message Subsystem (SVM) that configures lines and terminals,
//! and the Terminal Interface Protocol (TIP) that frames data to and
//! from connected async terminals.
//!
//! This crate owns no I/O. The channel simulator drives [`Npu`] through
//! [`hip::function_code`] dispatches and polls a [`collab::TerminalNetwork`]
//! for connection events; everything else — buffer pooling, sending bytes
//! upline, reading and writing terminal sockets — is injected through the
//! [`collab`] traits.

pub mod block;
pub mod buffer;
pub mod collab;
pub mod config;
pub mod error;
pub mod hip;
mod npu;
pub mod svm;
pub mod tip;

#[cfg(test)]
mod tests_support;

pub use config::NpuConfig;
pub use npu::Npu;
