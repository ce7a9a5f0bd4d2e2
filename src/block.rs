// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Byte-layout constants for framed HIP/SVM/TIP buffers.
//!
//! A buffer's first four bytes are always DN/SN/CN/BT-BSN. Everything past
//! that is reinterpreted depending on the block type and, for command
//! blocks, the function code — the same offset means different things for
//! a data block, a line-configuration message and a terminal-configuration
//! message. These constants name the offsets rather than the field they
//! happen to hold in one particular message shape; see the doc comment on
//! each for which shapes use it.

/// Destination node.
pub const BLK_OFF_DN: usize = 0;
/// Source node.
pub const BLK_OFF_SN: usize = 1;
/// Connection number (0 on genuine service messages).
pub const BLK_OFF_CN: usize = 2;
/// Block type in the low 3 bits, BSN in the upper bits (`BLK_SHIFT_BSN`).
pub const BLK_OFF_BT: usize = 3;

/// Data-block clarifier (data blocks) or PFC (command blocks).
pub const BLK_OFF_DBC: usize = 4;
pub const BLK_OFF_PFC: usize = 4;
/// First transmission-control-sequence byte (data blocks) or SFC (command
/// blocks).
pub const BLK_OFF_TCS1: usize = 5;
pub const BLK_OFF_SFC: usize = 5;
/// Second transmission-control-sequence byte (data blocks), port number
/// (line-config commands), or CLA port (terminal-config commands).
pub const BLK_OFF_TCS2: usize = 6;
pub const BLK_OFF_P: usize = 6;
/// Level byte (data blocks) or subport (line-config commands).
pub const BLK_OFF_LV: usize = 7;
pub const BLK_OFF_SP: usize = 7;
/// Line type (`ConfLine`) or cluster address (terminal-config commands).
pub const BLK_OFF_LT: usize = 8;
pub const BLK_OFF_CA: usize = 8;
/// Terminal type (`ConfLine`) or terminal address (terminal-config
/// commands).
pub const BLK_OFF_TT: usize = 9;
pub const BLK_OFF_TA: usize = 9;
/// Device type (terminal-config commands only).
pub const BLK_OFF_DT: usize = 10;
/// Start of the FN/FV tail pairs on line-config commands.
pub const BLK_OFF_FN: usize = 10;
/// Connection number field on terminal-config commands (distinct from the
/// header CN at `BLK_OFF_CN`, which is 0 for service messages).
pub const BLK_OFF_TERM_CN: usize = 11;

/// Fixed size of the DN/SN/CN/BT/DBC/TCS/TCS/LV upline input header.
pub const INPUT_HEADER_LEN: usize = 8;

/// BSN occupies the upper bits of the BT/BSN byte.
pub const BLK_SHIFT_BSN: u8 = 4;
/// Block type occupies the low 3 bits of the BT/BSN byte.
pub const BLK_MASK_BT: u8 = 0x07;

/// SFC high bits marking a successful response.
pub const SFC_SUCCESS: u8 = 0x40;
/// SFC high bits marking an error response.
pub const SFC_ERROR: u8 = 0x80;

/// Strips the parity bit from an async-terminal data byte.
pub const MASK_7_BIT: u8 = 0x7f;

/// Block type carried in the low 3 bits of the BT/BSN byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    /// HTBLK: a non-final fragment of upline/downline user data.
    Block = 1,
    /// HTMSG: the final fragment of a upline/downline user message.
    Message = 2,
    /// HTBACK: acknowledgement of a previously sent block.
    Back = 3,
    /// HTCMD: a command (service message or TIP control) block.
    Command = 4,
}

impl BlockType {
    pub fn from_byte(bt_bsn: u8) -> Option<Self> {
        match bt_bsn & BLK_MASK_BT {
            1 => Some(BlockType::Block),
            2 => Some(BlockType::Message),
            3 => Some(BlockType::Back),
            4 => Some(BlockType::Command),
            _ => None,
        }
    }

    pub fn to_byte(self, bsn: u8) -> u8 {
        (self as u8) | (bsn << BLK_SHIFT_BSN)
    }
}

/// Extracts the BSN carried in a BT/BSN byte.
pub fn bsn_from_byte(bt_bsn: u8) -> u8 {
    bt_bsn >> BLK_SHIFT_BSN
}
