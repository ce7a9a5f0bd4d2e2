// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Static sizing and node-address configuration.
//!
//! Parsing this from a CLI or config file is out of scope; `NpuConfig` is
//! a plain value the embedder constructs however it likes.

/// Historical node address of the mainframe-side coupler.
pub const DEFAULT_COUPLER_NODE: u8 = 0;
/// Historical node address of the NPU itself.
pub const DEFAULT_NPU_NODE: u8 = 2;
/// Upper bound on configured lines, matching `MaxLineDefs`/`MaxClaPort`.
pub const DEFAULT_MAX_LINE_DEFS: u8 = 128;
/// Default size of the connection-number-indexed TCB table.
pub const DEFAULT_MAX_TCBS: u16 = 256;

/// Table sizes and node addresses the core is instantiated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpuConfig {
    /// Node address the coupler identifies itself with in framed buffers.
    pub coupler_node: u8,
    /// Node address this NPU identifies itself with in framed buffers.
    pub npu_node: u8,
    /// Size of the port-indexed LCB table. Must be `<= 128`.
    pub max_line_defs: u8,
    /// Size of the connection-number-indexed TCB table.
    pub max_tcbs: u16,
}

impl Default for NpuConfig {
    fn default() -> Self {
        NpuConfig {
            coupler_node: DEFAULT_COUPLER_NODE,
            npu_node: DEFAULT_NPU_NODE,
            max_line_defs: DEFAULT_MAX_LINE_DEFS,
            max_tcbs: DEFAULT_MAX_TCBS,
        }
    }
}
