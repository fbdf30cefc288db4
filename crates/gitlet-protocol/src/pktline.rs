//! Git pkt-line wire format.
//!
//! Every line in the smart HTTP protocol is prefixed with four ASCII hex
//! characters giving the total line length including the prefix itself;
//! `0000` is a flush packet separating logical groups.

use crate::{ProtocolError, Result};
use gitlet_storage::ObjectId;

/// A flush packet.
pub const FLUSH_PKT: &[u8] = b"0000";

/// One pkt-line, borrowing its payload from the scanned buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PktLine<'a> {
    /// Data line with content.
    Data(&'a [u8]),
    /// Flush packet (`0000`).
    Flush,
}

/// Encodes a payload as a length-prefixed data line.
pub fn encode_data(payload: &[u8]) -> Vec<u8> {
    let mut line = format!("{:04x}", payload.len() + 4).into_bytes();
    line.extend_from_slice(payload);
    line
}

/// Walks pkt-lines over a contiguous response buffer.
#[derive(Debug)]
pub struct PktLineScanner<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PktLineScanner<'a> {
    /// Creates a scanner over a response buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the next line, or `None` at the end of the buffer.
    pub fn next_line(&mut self) -> Result<Option<PktLine<'a>>> {
        if self.pos + 4 > self.data.len() {
            return Ok(None);
        }

        let len = parse_hex4(&self.data[self.pos..self.pos + 4]).ok_or_else(|| {
            ProtocolError::InvalidPktLine(format!(
                "invalid length prefix at offset {}",
                self.pos
            ))
        })?;

        if len == 0 {
            self.pos += 4;
            return Ok(Some(PktLine::Flush));
        }
        if len < 4 || self.pos + len > self.data.len() {
            return Err(ProtocolError::InvalidPktLine(format!(
                "bad packet length {} at offset {}",
                len, self.pos
            )));
        }

        let payload = &self.data[self.pos + 4..self.pos + len];
        self.pos += len;
        Ok(Some(PktLine::Data(payload)))
    }
}

fn parse_hex4(prefix: &[u8]) -> Option<usize> {
    let mut value = 0usize;
    for &c in prefix {
        value = value * 16 + (c as char).to_digit(16)? as usize;
    }
    Some(value)
}

/// Extracts HEAD's identifier from a refs discovery response.
///
/// The service announcement block is terminated by the first flush; the
/// first line after it is the HEAD advertisement, whose payload begins
/// with the 40-character identifier.
pub fn parse_head_advert(data: &[u8]) -> Result<ObjectId> {
    let mut scanner = PktLineScanner::new(data);
    let mut seen_flush = false;

    while let Some(line) = scanner.next_line()? {
        match line {
            PktLine::Flush => seen_flush = true,
            PktLine::Data(payload) if seen_flush => {
                if payload.len() < 40 {
                    return Err(ProtocolError::InvalidPktLine(format!(
                        "ref line too short ({} bytes)",
                        payload.len()
                    )));
                }
                let hex = std::str::from_utf8(&payload[..40]).map_err(|_| {
                    ProtocolError::InvalidPktLine("non-ascii ref line".to_string())
                })?;
                return ObjectId::from_hex(hex).map_err(|_| {
                    ProtocolError::InvalidPktLine(
                        "ref line does not start with an object id".to_string(),
                    )
                });
            }
            PktLine::Data(_) => {}
        }
    }

    Err(ProtocolError::MissingHead)
}

/// Builds the upload-pack request body for a single wanted object.
///
/// Produces exactly `0032want <id>\n00000009done\n` — 63 bytes, no
/// capability tokens.
pub fn build_want_request(id: &ObjectId) -> Vec<u8> {
    let mut body = encode_data(format!("want {}\n", id).as_bytes());
    body.extend_from_slice(FLUSH_PKT);
    body.extend_from_slice(&encode_data(b"done\n"));
    body
}

/// Extracts the raw packfile from an upload-pack response.
///
/// Collects channel-1 side-band payloads, discards progress (2) and
/// error (3) channels, and skips `NAK` and interleaved flushes. If the
/// walk yields no pack bytes — some servers answer with the packfile
/// unframed after the `NAK` — falls back to scanning for the `PACK`
/// magic and returns everything from there.
pub fn strip_sideband(data: &[u8]) -> Result<Vec<u8>> {
    let mut pack = Vec::new();
    let mut scanner = PktLineScanner::new(data);

    loop {
        match scanner.next_line() {
            Ok(Some(PktLine::Flush)) => continue,
            Ok(Some(PktLine::Data(payload))) => match payload.first() {
                Some(1) => pack.extend_from_slice(&payload[1..]),
                Some(2) => {
                    tracing::debug!(
                        progress = %String::from_utf8_lossy(&payload[1..]).trim_end(),
                        "remote progress"
                    );
                }
                Some(3) => {
                    tracing::debug!(
                        error = %String::from_utf8_lossy(&payload[1..]).trim_end(),
                        "remote error"
                    );
                }
                // NAK and other service lines carry no pack data.
                _ => {}
            },
            Ok(None) => break,
            // Unframed bytes ahead; leave the rest to the magic scan.
            Err(_) => break,
        }
    }

    if !pack.is_empty() {
        return Ok(pack);
    }

    if let Some(idx) = data.windows(4).position(|w| w == b"PACK") {
        return Ok(data[idx..].to_vec());
    }

    Err(ProtocolError::NoPack)
}
