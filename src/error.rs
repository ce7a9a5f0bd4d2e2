// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Error types for the SVM and TIP protocol engines.
//!
//! HIP has no fallible public entry points: every condition the original
//! coupler emulation treats as an error is either a logged no-op (macro
//! image already running) or a register write that is simply accepted.
//! SVM and TIP, on the other hand, reject malformed buffers by dropping
//! them and logging, which we model with `?`-friendly internal errors
//! converted to a log line at the `Npu` boundary rather than surfaced to
//! callers.

use remain::sorted;
use thiserror::Error;

#[sorted]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvmError {
    /// `DelLine` has no defined behavior; see the Open Questions in
    /// DESIGN.md.
    #[error("DelLine is not implemented")]
    DelLineUnimplemented,
    /// The buffer is shorter than the minimum service message header.
    #[error("service message buffer too short")]
    MessageTooShort,
    /// The port named in the buffer has no line control block.
    #[error("port {0} has no line control block")]
    PortOutOfRange(u8),
    /// A PFC/SFC pair this engine does not recognize.
    #[error("unrecognized function code {pfc:#04x}/{sfc:#04x}")]
    UnrecognizedFunctionCode { pfc: u8, sfc: u8 },
}

#[sorted]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipError {
    /// The connection number named in the buffer has no terminal control
    /// block.
    #[error("connection {0} has no terminal control block")]
    ConnectionOutOfRange(u8),
    /// The buffer is shorter than the fixed TIP input header.
    #[error("TIP input buffer shorter than the input header")]
    HeaderTooShort,
    /// A block type this engine does not recognize.
    #[error("unrecognized block type {0:#04x}")]
    UnrecognizedBlockType(u8),
}

pub type SvmResult<T> = ::std::result::Result<T, SvmError>;
pub type TipResult<T> = ::std::result::Result<T, TipError>;
