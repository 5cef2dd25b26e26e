//! Sidecar data blocks.
//!
//! ```text
//! +---------+---------+---------------------------------------+
//! | 0 .. 4  | char[4] | "DAT*"                                |
//! | 4 .. 8  | u32 LE  | offset of next data block, or 0       |
//! | 8 .. 10 | u16 LE  | payload length (at most 502)          |
//! | 10 ..   | bytes   | payload                               |
//! +---------+---------+---------------------------------------+
//! ```
//!
//! A full block occupies 512 bytes. The next-block offset is not used:
//! blocks are consumed sequentially, each one starting right after the
//! previous block's payload. A full block must be followed by another block
//! or by the end of the data; after a short block, anything that is not a
//! block marker is trailing padding.

use crate::error::{BinsecError, BinsecResult};

pub const BLOCK_MARKER: [u8; 4] = *b"DAT*";
pub const BLOCK_SIZE: usize = 512;
pub const BLOCK_HEADER_LEN: usize = 10;
pub const MAX_BLOCK_PAYLOAD: usize = BLOCK_SIZE - BLOCK_HEADER_LEN;

/// One parsed data block, borrowing its payload from the sidecar bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block<'a> {
    /// Offset of the block marker within the sidecar.
    pub offset: usize,
    /// Declared offset of the next block (informational only).
    pub next_offset: u32,
    pub payload: &'a [u8],
}

impl<'a> Block<'a> {
    /// Parse the block starting at `offset`.
    pub fn parse(data: &'a [u8], offset: usize) -> BinsecResult<Self> {
        let header_end = offset + BLOCK_HEADER_LEN;
        if header_end > data.len() {
            return Err(BinsecError::Truncated {
                offset,
                reason: format!("header needs {BLOCK_HEADER_LEN} bytes, {} left", data.len().saturating_sub(offset)),
            });
        }
        let header = &data[offset..header_end];
        if header[0..4] != BLOCK_MARKER {
            return Err(BinsecError::MissingMarker {
                offset,
                found: String::from_utf8_lossy(&header[0..4]).into_owned(),
            });
        }
        let next_offset = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let declared = u16::from_le_bytes([header[8], header[9]]) as usize;
        if declared > MAX_BLOCK_PAYLOAD {
            return Err(BinsecError::BlockTooLong { offset, declared });
        }
        let payload_end = header_end + declared;
        if payload_end > data.len() {
            return Err(BinsecError::Truncated {
                offset,
                reason: format!("declared {declared} payload bytes, {} present", data.len() - header_end),
            });
        }
        Ok(Self {
            offset,
            next_offset,
            payload: &data[header_end..payload_end],
        })
    }

    /// Whether the block carries a full payload (and so may be followed by
    /// another block).
    pub fn is_full(&self) -> bool {
        self.payload.len() == MAX_BLOCK_PAYLOAD
    }
}

/// Parse all data blocks of a sidecar file, starting at the first marker.
pub fn parse_blocks(data: &[u8]) -> BinsecResult<Vec<Block<'_>>> {
    let start = data
        .windows(BLOCK_MARKER.len())
        .position(|w| w == BLOCK_MARKER)
        .ok_or(BinsecError::NoBlocks)?;

    let mut blocks = Vec::new();
    let mut offset = start;
    loop {
        let block = Block::parse(data, offset)?;
        let full = block.is_full();
        offset += BLOCK_HEADER_LEN + block.payload.len();
        blocks.push(block);
        if offset >= data.len() {
            break;
        }
        if !full && !data[offset..].starts_with(&BLOCK_MARKER) {
            break;
        }
    }
    Ok(blocks)
}

/// Lay out a payload as a sequence of 512-byte sidecar blocks.
///
/// This is the inverse of [`parse_blocks`] and is used to produce fixtures.
/// An empty payload yields a single empty block.
pub fn build_sidecar(payload: &[u8]) -> Vec<u8> {
    let chunks: Vec<&[u8]> = if payload.is_empty() {
        vec![&[]]
    } else {
        payload.chunks(MAX_BLOCK_PAYLOAD).collect()
    };
    let mut out = Vec::with_capacity(chunks.len() * BLOCK_SIZE);
    for (i, chunk) in chunks.iter().enumerate() {
        let next = if i + 1 < chunks.len() {
            ((i + 1) * BLOCK_SIZE) as u32
        } else {
            0
        };
        out.extend_from_slice(&BLOCK_MARKER);
        out.extend_from_slice(&next.to_le_bytes());
        out.extend_from_slice(&(chunk.len() as u16).to_le_bytes());
        out.extend_from_slice(chunk);
        out.resize((i + 1) * BLOCK_SIZE, 0);
    }
    out
}
