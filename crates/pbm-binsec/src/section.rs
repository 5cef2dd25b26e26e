use std::fmt::Write as _;
use std::path::Path;

use tracing::debug;

use crate::block::{parse_blocks, Block};
use crate::error::{BinsecError, BinsecResult};

/// Width of one hex line in the rendered section.
pub const CHUNK_WIDTH: usize = 3992;
/// Bytes per reversed group.
pub const GROUP_LEN: usize = 4;

pub const SECTION_START: &str = "Start of PowerBuilder Binary Data Section : Do NOT Edit";
pub const SECTION_END: &str =
    "End of PowerBuilder Binary Data Section : No Source Expected After This Point";

const TAG_BEGIN: &str = "0A";
const TAG_DATA: &str = "2A";
const TAG_FINISH: &str = "1A";
const LINE_SEP: &str = "\r\n";

/// A textual binary section ready to be appended to an object's source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinarySection {
    /// File name of the sidecar the section was built from (`w_main.bin`).
    pub sidecar_name: String,
    /// Lowercase hex payload, zero-padded to a multiple of [`CHUNK_WIDTH`].
    pub hex: String,
}

impl BinarySection {
    /// Build a section from raw sidecar bytes.
    pub fn from_sidecar_bytes(sidecar_name: impl Into<String>, data: &[u8]) -> BinsecResult<Self> {
        let blocks = parse_blocks(data)?;
        let mut hex = payload_hex(&blocks)?;
        pad_to_chunk(&mut hex);
        Ok(Self {
            sidecar_name: sidecar_name.into(),
            hex,
        })
    }

    /// Read and encode a sidecar file.
    pub fn from_file(path: &Path) -> BinsecResult<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let section = Self::from_sidecar_bytes(name, &data)?;
        debug!(
            sidecar = %path.display(),
            bytes = data.len(),
            chunks = section.chunk_count(),
            "encoded binary section"
        );
        Ok(section)
    }

    /// Number of hex lines in the rendered section.
    pub fn chunk_count(&self) -> usize {
        self.hex.len() / CHUNK_WIDTH
    }

    /// Render the section text. Lines are CRLF-separated and the final
    /// line carries no terminator.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.hex.len() + 256);
        out.push_str(SECTION_START);
        out.push_str(LINE_SEP);
        let _ = write!(out, "{TAG_BEGIN}{}{LINE_SEP}", self.sidecar_name);
        for start in (0..self.hex.len()).step_by(CHUNK_WIDTH) {
            let end = (start + CHUNK_WIDTH).min(self.hex.len());
            let _ = write!(out, "{TAG_DATA}{}{LINE_SEP}", &self.hex[start..end]);
        }
        let _ = write!(out, "{TAG_FINISH}{}{LINE_SEP}", self.sidecar_name);
        out.push_str(SECTION_END);
        out
    }

    /// Parse rendered section text back into its parts.
    pub fn parse(text: &str) -> BinsecResult<Self> {
        let lines: Vec<&str> = text.split(LINE_SEP).collect();
        if lines.len() < 4 {
            return Err(BinsecError::MalformedSection(format!(
                "expected at least 4 lines, found {}",
                lines.len()
            )));
        }
        if lines[0] != SECTION_START {
            return Err(BinsecError::MalformedSection("missing start line".into()));
        }
        if lines[lines.len() - 1] != SECTION_END {
            return Err(BinsecError::MalformedSection("missing end line".into()));
        }

        let sidecar_name = strip_tag(lines[1], TAG_BEGIN)?;
        let finish_name = strip_tag(lines[lines.len() - 2], TAG_FINISH)?;
        if sidecar_name != finish_name {
            return Err(BinsecError::MalformedSection(format!(
                "begin name {sidecar_name} does not match finish name {finish_name}"
            )));
        }

        let mut hex = String::new();
        for line in &lines[2..lines.len() - 2] {
            let chunk = strip_tag(line, TAG_DATA)?;
            if chunk.len() != CHUNK_WIDTH {
                return Err(BinsecError::MalformedSection(format!(
                    "data line of {} characters (expected {CHUNK_WIDTH})",
                    chunk.len()
                )));
            }
            hex.push_str(chunk);
        }

        Ok(Self {
            sidecar_name: sidecar_name.to_string(),
            hex,
        })
    }

    /// Decode the hex payload back into the sidecar's payload bytes.
    ///
    /// The result is followed by the zero bytes introduced by padding.
    pub fn payload(&self) -> BinsecResult<Vec<u8>> {
        decode_payload_hex(&self.hex)
    }
}

fn strip_tag<'a>(line: &'a str, tag: &str) -> BinsecResult<&'a str> {
    line.strip_prefix(tag)
        .ok_or_else(|| BinsecError::MalformedSection(format!("line does not start with {tag}")))
}

/// Concatenate block payloads into reversed-group hex.
///
/// A block whose payload leaves two bytes over carries them into the next
/// block; any other remainder is rejected. Two bytes left after the final
/// block are flushed as a zero-filled group.
pub fn payload_hex(blocks: &[Block<'_>]) -> BinsecResult<String> {
    let total: usize = blocks.iter().map(|b| b.payload.len()).sum();
    let mut out = String::with_capacity(total * 2 + GROUP_LEN * 2);
    let mut carry: Option<[u8; 2]> = None;

    for block in blocks {
        let mut payload = block.payload;
        if let Some([a, b]) = carry.take() {
            if payload.len() < 2 {
                return Err(BinsecError::Truncated {
                    offset: block.offset,
                    reason: "cannot complete a group carried from the previous block".into(),
                });
            }
            push_group(&mut out, [a, b, payload[0], payload[1]]);
            payload = &payload[2..];
        }

        let mut groups = payload.chunks_exact(GROUP_LEN);
        for g in &mut groups {
            push_group(&mut out, [g[0], g[1], g[2], g[3]]);
        }
        match groups.remainder() {
            [] => {}
            [a, b] => carry = Some([*a, *b]),
            rest => return Err(BinsecError::BadRemainder(rest.len())),
        }
    }

    if let Some([a, b]) = carry {
        push_group(&mut out, [a, b, 0, 0]);
    }
    Ok(out)
}

fn push_group(out: &mut String, mut group: [u8; GROUP_LEN]) {
    group.reverse();
    out.push_str(&hex::encode(group));
}

/// Right-pad with `'0'` to the next multiple of [`CHUNK_WIDTH`].
pub fn pad_to_chunk(hex: &mut String) {
    let rem = hex.len() % CHUNK_WIDTH;
    if rem != 0 {
        hex.extend(std::iter::repeat('0').take(CHUNK_WIDTH - rem));
    }
}

/// Reverse [`payload_hex`]: decode hex and undo the per-group reversal.
pub fn decode_payload_hex(hex_str: &str) -> BinsecResult<Vec<u8>> {
    let mut bytes = hex::decode(hex_str).map_err(|e| BinsecError::InvalidHex(e.to_string()))?;
    if bytes.len() % GROUP_LEN != 0 {
        return Err(BinsecError::BadRemainder(bytes.len() % GROUP_LEN));
    }
    for group in bytes.chunks_exact_mut(GROUP_LEN) {
        group.reverse();
    }
    Ok(bytes)
}

/// Encode a sidecar file into the bytes of its textual binary section.
pub fn encode(sidecar: &Path) -> BinsecResult<Vec<u8>> {
    Ok(BinarySection::from_file(sidecar)?.render().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{build_sidecar, BLOCK_MARKER, MAX_BLOCK_PAYLOAD};

    fn block(offset: usize, payload: &[u8]) -> Block<'_> {
        Block {
            offset,
            next_offset: 0,
            payload,
        }
    }

    #[test]
    fn groups_are_reversed() {
        let hex = payload_hex(&[block(0, &[0x01, 0x02, 0x03, 0x04, 0xAA, 0xBB, 0xCC, 0xDD])]).unwrap();
        assert_eq!(hex, "04030201ddccbbaa");
    }

    #[test]
    fn two_byte_remainder_carries_into_next_block() {
        let first = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let second = [0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C];
        let hex = payload_hex(&[block(0, &first), block(512, &second)]).unwrap();
        assert_eq!(hex, "04030201080706050c0b0a09");
    }

    #[test]
    fn odd_remainder_is_fatal() {
        let err = payload_hex(&[block(0, &[1, 2, 3, 4, 5])]).unwrap_err();
        assert!(matches!(err, BinsecError::BadRemainder(1)));

        let err = payload_hex(&[block(0, &[1, 2, 3])]).unwrap_err();
        assert!(matches!(err, BinsecError::BadRemainder(3)));
    }

    #[test]
    fn carry_into_too_short_block_is_fatal() {
        let err = payload_hex(&[block(0, &[1, 2]), block(512, &[3])]).unwrap_err();
        assert!(matches!(err, BinsecError::Truncated { offset: 512, .. }));
    }

    #[test]
    fn adjacent_short_blocks_are_all_encoded() {
        let mut data = Vec::new();
        for payload in [[1u8, 2, 3, 4], [5, 6, 7, 8]] {
            data.extend_from_slice(&BLOCK_MARKER);
            data.extend_from_slice(&0u32.to_le_bytes());
            data.extend_from_slice(&4u16.to_le_bytes());
            data.extend_from_slice(&payload);
        }
        let section = BinarySection::from_sidecar_bytes("w_ole.bin", &data).unwrap();
        assert!(section.hex.starts_with("0403020108070605"));
        assert_eq!(section.payload().unwrap()[..8], [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn trailing_carry_is_zero_filled() {
        let hex = payload_hex(&[block(0, &[0x01, 0x02])]).unwrap();
        assert_eq!(hex, "00000201");
    }

    #[test]
    fn padding_reaches_chunk_multiple() {
        let mut hex = "ab".repeat(10);
        pad_to_chunk(&mut hex);
        assert_eq!(hex.len(), CHUNK_WIDTH);
        assert!(hex.ends_with('0'));

        let mut exact = "0".repeat(CHUNK_WIDTH);
        pad_to_chunk(&mut exact);
        assert_eq!(exact.len(), CHUNK_WIDTH);

        let mut empty = String::new();
        pad_to_chunk(&mut empty);
        assert!(empty.is_empty());
    }

    #[test]
    fn render_layout() {
        let data = build_sidecar(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let section = BinarySection::from_sidecar_bytes("w_main.bin", &data).unwrap();
        let text = section.render();

        let lines: Vec<&str> = text.split("\r\n").collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], SECTION_START);
        assert_eq!(lines[1], "0Aw_main.bin");
        assert!(lines[2].starts_with("2Aefbeadde"));
        assert_eq!(lines[2].len(), 2 + CHUNK_WIDTH);
        assert_eq!(lines[3], "1Aw_main.bin");
        assert_eq!(lines[4], SECTION_END);
        assert!(!text.ends_with("\r\n"));
    }

    #[test]
    fn hex_is_lowercase_and_chunk_aligned() {
        let payload: Vec<u8> = (0..3000u32).map(|i| (i * 7 % 256) as u8).collect();
        let data = build_sidecar(&payload);
        let section = BinarySection::from_sidecar_bytes("d_big.bin", &data).unwrap();
        assert_eq!(section.hex.len() % CHUNK_WIDTH, 0);
        assert_eq!(section.chunk_count(), 2);
        assert!(!section.hex.chars().any(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn multi_block_payload_survives_encoding() {
        // 502-byte blocks leave a two-byte carry at every block boundary.
        let payload: Vec<u8> = (0..(MAX_BLOCK_PAYLOAD * 3 + 40)).map(|i| (i % 253) as u8).collect();
        let data = build_sidecar(&payload);
        let section = BinarySection::from_sidecar_bytes("w_x.bin", &data).unwrap();
        let decoded = section.payload().unwrap();
        assert_eq!(&decoded[..payload.len()], payload.as_slice());
        assert!(decoded[payload.len()..].iter().all(|b| *b == 0));
    }

    #[test]
    fn render_then_parse() {
        let data = build_sidecar(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let section = BinarySection::from_sidecar_bytes("u_ole.bin", &data).unwrap();
        let parsed = BinarySection::parse(&section.render()).unwrap();
        assert_eq!(parsed, section);
    }

    #[test]
    fn parse_rejects_mismatched_names() {
        let text = format!("{SECTION_START}\r\n0Aa.bin\r\n1Ab.bin\r\n{SECTION_END}");
        assert!(matches!(
            BinarySection::parse(&text),
            Err(BinsecError::MalformedSection(_))
        ));
    }

    #[test]
    fn parse_rejects_short_data_line() {
        let text = format!("{SECTION_START}\r\n0Aa.bin\r\n2Aabcd\r\n1Aa.bin\r\n{SECTION_END}");
        assert!(BinarySection::parse(&text).is_err());
    }

    #[test]
    fn encode_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w_logo.bin");
        std::fs::write(&path, build_sidecar(&[9, 8, 7, 6])).unwrap();

        let bytes = encode(&path).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("0Aw_logo.bin\r\n2A06070809"));
    }

    #[test]
    fn encode_rejects_oversized_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w_bad.bin");
        let mut data = BLOCK_MARKER.to_vec();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&503u16.to_le_bytes());
        data.extend(std::iter::repeat(0u8).take(503));
        std::fs::write(&path, data).unwrap();

        let err = encode(&path).unwrap_err();
        assert!(matches!(err, BinsecError::BlockTooLong { declared: 503, .. }));
    }

    #[test]
    fn encode_missing_file_is_io() {
        let err = encode(Path::new("/nonexistent/w_none.bin")).unwrap_err();
        assert!(matches!(err, BinsecError::Io(_)));
        assert!(!err.is_structural());
    }
}
