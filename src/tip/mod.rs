// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The Terminal Interface Protocol: dispatches downline command/block/
//! message/ack buffers by block type, manages the upline BSN sequence,
//! and owns the per-TCB input-buffer lifecycle the Async TIP builds on.

pub mod async_tip;
pub mod params;
pub mod pcb;
pub mod tcb;

use log::debug;
use log::warn;

use crate::block::BlockType;
use crate::block::BLK_OFF_BT;
use crate::block::BLK_OFF_CN;
use crate::block::BLK_OFF_PFC;
use crate::block::INPUT_HEADER_LEN;
use crate::buffer::NpuBuffer;
use crate::collab::BipSink;
use crate::collab::TerminalNetwork;
use crate::config::NpuConfig;
use crate::error::TipError;
use crate::error::TipResult;
use crate::tip::tcb::Tcb;
use crate::tip::tcb::TcbState;
use crate::tip::tcb::TcbTable;
use crate::tip::tcb::TipType;

/// PFC carried on a `BtHTCMD` block that asks a TCB to resume output
/// after a user break.
const CMD_PFC_RESUME_OUTPUT: u8 = 7;

pub struct TipEngine {
    config: NpuConfig,
}

impl TipEngine {
    pub fn new(config: NpuConfig) -> Self {
        TipEngine { config }
    }

    /// Dispatches one downline buffer already known to carry a TIP block
    /// (block type `Block`/`Message`/`Back`, or a `Command` addressed to
    /// a non-zero connection). The caller releases `buffer` afterward.
    pub fn process_buffer(
        &self,
        buffer: &NpuBuffer,
        tcbs: &mut TcbTable,
        network: &mut dyn TerminalNetwork,
        bip: &mut dyn BipSink,
    ) -> TipResult<()> {
        let bytes = buffer.as_slice();
        if bytes.len() <= BLK_OFF_BT {
            return Err(TipError::HeaderTooShort);
        }
        let cn = bytes[BLK_OFF_CN];
        let bt_byte = bytes[BLK_OFF_BT];
        let block_type = BlockType::from_byte(bt_byte).ok_or(TipError::UnrecognizedBlockType(bt_byte))?;
        let tcb = tcbs.get_mut(cn).ok_or(TipError::ConnectionOutOfRange(cn))?;

        match block_type {
            BlockType::Command => {
                let pfc = bytes.get(BLK_OFF_PFC).copied().unwrap_or(0);
                if pfc == CMD_PFC_RESUME_OUTPUT {
                    tcb.break_pending = false;
                } else {
                    debug!("unrecognized TIP command pfc {pfc:#04x} on connection {cn}");
                }
                // Acknowledge any command, recognized or not.
                self.send_ack(tcb, bip);
            }
            BlockType::Block | BlockType::Message => {
                if tcb.state == TcbState::Connected {
                    match tcb.tip_type {
                        TipType::Async => async_tip::process_downline_data(tcb, bytes, network),
                        TipType::Unsupported(t) => {
                            warn!("downline data for unsupported TIP type {t} on connection {cn}");
                        }
                    }
                } else {
                    // Race with disconnect: discard the payload but still ack.
                    debug!("downline data for connection {cn} in state {:?}, discarded", tcb.state);
                }
                self.send_ack(tcb, bip);
            }
            BlockType::Back => {}
        }
        Ok(())
    }

    /// Frames `tcb.in_buf` as a non-final block (`HTBLK`) and hands it
    /// upline.
    pub fn send_block(&self, tcb: &mut Tcb, bip: &mut dyn BipSink) {
        self.frame_and_send(tcb, BlockType::Block, bip);
    }

    /// Frames `tcb.in_buf` as the final fragment of a message (`HTMSG`)
    /// and hands it upline.
    pub fn send_msg(&self, tcb: &mut Tcb, bip: &mut dyn BipSink) {
        self.frame_and_send(tcb, BlockType::Message, bip);
    }

    fn frame_and_send(&self, tcb: &mut Tcb, block_type: BlockType, bip: &mut dyn BipSink) {
        let bsn = tcb.advance_bsn();
        tcb.in_buf.set(BLK_OFF_BT, block_type.to_byte(bsn));
        bip.request_upline_canned(tcb.in_buf.as_slice());
    }

    /// Builds and sends a `HTBACK` acknowledgement at the TCB's current
    /// BSN, then advances it.
    pub fn send_ack(&self, tcb: &mut Tcb, bip: &mut dyn BipSink) {
        let bsn = tcb.advance_bsn();
        let ack = [self.config.coupler_node, self.config.npu_node, tcb.cn, BlockType::Back.to_byte(bsn)];
        bip.request_upline_canned(&ack);
    }

    /// Rebuilds the 8-byte upline data header at the start of the TCB's
    /// input buffer and resets the write/start-of-data pointers past it.
    pub fn reset_input(&self, tcb: &mut Tcb) {
        tcb.in_buf.clear();
        tcb.in_buf.extend_from_slice(&[self.config.coupler_node, self.config.npu_node, tcb.cn, 0, 5, 0, 0, 0]);
        tcb.in_buf_start = INPUT_HEADER_LEN;
        tcb.in_buf_ptr = INPUT_HEADER_LEN;
    }

    /// Drains and releases a TCB's pending output queue. Matches the
    /// original's intentional omission of acks for the discarded blocks.
    pub fn discard_output_queue(&self, tcb: &mut Tcb, pool: &mut dyn crate::collab::BufferPool) {
        while let Some(buffer) = tcb.output_queue.pop_front() {
            pool.release(buffer);
        }
    }
}
