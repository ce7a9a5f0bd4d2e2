// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The Async TIP: downline data-block-clarifier expansion and upline
//! character assembly (echo, backspace, EOL framing, long-line flush)
//! for switched-async terminals.

use crate::block::BLK_OFF_DBC;
use crate::block::INPUT_HEADER_LEN;
use crate::block::MASK_7_BIT;
use crate::collab::BipSink;
use crate::collab::TerminalNetwork;
use crate::tip::tcb::Tcb;
use crate::tip::TipEngine;

const CHR_NUL: u8 = 0x00;
const CHR_LF: u8 = 0x0a;
const CHR_DEL: u8 = 0x7f;
const CHR_CR: u8 = 0x0d;
const CHR_BEL: u8 = 0x07;
const CHR_BLANK: u8 = 0x20;

/// Bytes the input assembly accumulates before a long line is flushed
/// upline unsolicited, scaled by `TipParams::block_factor`.
const LONG_LINE_UNIT: usize = 100;

/// Data-Block-Clarifier leading-control table, keyed by `dbc & 0x07`.
fn leading_control(dbc: u8) -> &'static [u8] {
    match dbc & 0x07 {
        0 | 2 | 3 => b"\r\n",
        1 => b"\r\n\n\n",
        4 => b"\r",
        _ => b"",
    }
}

/// Expands one downline data buffer's DBC-selected leading control,
/// strips parity from the body, drops a trailing end-of-record `:`, and
/// sends the result to the terminal.
pub fn process_downline_data(tcb: &Tcb, bytes: &[u8], network: &mut dyn TerminalNetwork) {
    if bytes.len() <= BLK_OFF_DBC {
        return;
    }
    let dbc = bytes[BLK_OFF_DBC];
    let body_start = INPUT_HEADER_LEN.min(bytes.len());
    let mut body: Vec<u8> = bytes[body_start..].iter().map(|b| b & MASK_7_BIT).collect();
    if body.last() == Some(&b':') {
        body.pop();
    }

    let mut out = Vec::with_capacity(leading_control(dbc).len() + body.len());
    out.extend_from_slice(leading_control(dbc));
    out.extend_from_slice(&body);
    network.send(tcb.cn, &out);
}

/// Assembles raw terminal input bytes into `tcb.in_buf`, echoing each
/// character, handling backspace, and framing/flushing a `HTMSG` on EOL
/// or when the line grows past `block_factor * 100` bytes.
pub fn process_upline_normal(tcb: &mut Tcb, raw: &[u8], network: &mut dyn TerminalNetwork, tip: &TipEngine, bip: &mut dyn BipSink) {
    tcb.in_buf.set(BLK_OFF_DBC, 5);

    for &byte in raw {
        let ch = byte & MASK_7_BIT;

        if matches!(ch, CHR_NUL | CHR_LF | CHR_DEL) {
            continue;
        }

        if ch == tcb.params.bs {
            if tcb.in_buf.len() > tcb.in_buf_start {
                tcb.in_buf.set_len(tcb.in_buf.len() - 1);
                tcb.in_buf_ptr = tcb.in_buf.len();
                network.send(tcb.cn, &[tcb.params.bs, CHR_BLANK, tcb.params.bs]);
            } else {
                network.send(tcb.cn, &[CHR_BEL]);
            }
            continue;
        }

        network.send(tcb.cn, &[ch]);

        if ch == tcb.params.eol {
            tip.send_msg(tcb, bip);
            tip.reset_input(tcb);
            tcb.last_op_was_input = true;

            if tcb.dbc_no_cursor_pos {
                tcb.dbc_no_cursor_pos = false;
            } else if tcb.params.cursor_pos {
                match tcb.params.eol_cursor_pos {
                    1 => network.send(tcb.cn, &[CHR_CR]),
                    2 => network.send(tcb.cn, &[CHR_LF]),
                    3 => network.send(tcb.cn, &[CHR_CR, CHR_LF]),
                    _ => {}
                }
            }
            continue;
        }

        tcb.in_buf.push(ch);
        tcb.in_buf_ptr = tcb.in_buf.len();
        if tcb.in_buf.len() - tcb.in_buf_start >= (tcb.params.block_factor as usize) * LONG_LINE_UNIT {
            tip.send_msg(tcb, bip);
            tip.reset_input(tcb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;
    use crate::block::BLK_OFF_BT;
    use crate::buffer::NpuBuffer;
    use crate::config::NpuConfig;
    use crate::tests_support::FakeNetwork;
    use crate::tests_support::NullBipSink;

    fn data_buffer(dbc: u8, body: &[u8]) -> NpuBuffer {
        let mut buffer = NpuBuffer::new();
        buffer.extend_from_slice(&[0, 0, 0, BlockType::Message.to_byte(0), dbc, 0, 0, 0]);
        buffer.extend_from_slice(body);
        buffer
    }

    #[test]
    fn downline_strips_parity_and_trailing_colon_and_prepends_crlf() {
        let tcb = Tcb::new(5);
        let mut network = FakeNetwork::default();
        let body: Vec<u8> = b"HELLO:".iter().map(|b| b | 0x80).collect();
        let buffer = data_buffer(0, &body);
        process_downline_data(&tcb, buffer.as_slice(), &mut network);
        assert_eq!(network.sent.len(), 1);
        assert_eq!(network.sent[0].1, b"\r\nHELLO");
    }

    #[test]
    fn downline_dbc_one_uses_triple_space() {
        let tcb = Tcb::new(5);
        let mut network = FakeNetwork::default();
        let buffer = data_buffer(1, b"X");
        process_downline_data(&tcb, buffer.as_slice(), &mut network);
        assert_eq!(network.sent[0].1, b"\r\n\n\nX");
    }

    #[test]
    fn upline_echoes_and_frames_message_on_eol() {
        let tip = TipEngine::new(NpuConfig::default());
        let mut tcb = Tcb::new(5);
        tip.reset_input(&mut tcb);
        let mut network = FakeNetwork::default();
        let mut bip = NullBipSink::default();

        process_upline_normal(&mut tcb, b"ABC\r", &mut network, &tip, &mut bip);

        let echoed: Vec<u8> = network.sent.iter().map(|(_, b)| b[0]).take(4).collect();
        assert_eq!(echoed, b"ABC\r");
        // Cursor repositioning for eol_cursor_pos == 2 sends a trailing LF.
        assert_eq!(network.sent.last().unwrap().1, vec![CHR_LF]);
        assert_eq!(bip.upline_canned.len(), 1);
        let sent = &bip.upline_canned[0];
        assert_eq!(sent[BLK_OFF_BT] & crate::block::BLK_MASK_BT, BlockType::Message as u8);
        assert_eq!(&sent[INPUT_HEADER_LEN..], b"ABC");
        assert_eq!(tcb.upline_bsn, 1);
    }

    #[test]
    fn backspace_retracts_buffer_and_echoes_bs_space_bs() {
        let tip = TipEngine::new(NpuConfig::default());
        let mut tcb = Tcb::new(5);
        tip.reset_input(&mut tcb);
        let mut network = FakeNetwork::default();
        let mut bip = NullBipSink::default();
        process_upline_normal(&mut tcb, &[b'A', tcb.params.bs], &mut network, &tip, &mut bip);
        assert_eq!(tcb.in_buf.len(), INPUT_HEADER_LEN);
        assert_eq!(network.sent.last().unwrap().1, vec![tcb.params.bs, CHR_BLANK, tcb.params.bs]);
    }

    #[test]
    fn backspace_at_start_of_line_beeps() {
        let tip = TipEngine::new(NpuConfig::default());
        let mut tcb = Tcb::new(5);
        tip.reset_input(&mut tcb);
        let mut network = FakeNetwork::default();
        let mut bip = NullBipSink::default();
        process_upline_normal(&mut tcb, &[tcb.params.bs], &mut network, &tip, &mut bip);
        assert_eq!(network.sent.last().unwrap().1, vec![CHR_BEL]);
    }

    #[test]
    fn long_line_flushes_at_block_factor_times_100() {
        let tip = TipEngine::new(NpuConfig::default());
        let mut tcb = Tcb::new(5);
        tcb.params.block_factor = 1;
        tip.reset_input(&mut tcb);
        let mut network = FakeNetwork::default();
        let mut bip = NullBipSink::default();
        let line = vec![b'A'; 100];
        process_upline_normal(&mut tcb, &line, &mut network, &tip, &mut bip);
        assert_eq!(bip.upline_canned.len(), 1);
        assert_eq!(tcb.in_buf.len(), INPUT_HEADER_LEN);
    }
}
