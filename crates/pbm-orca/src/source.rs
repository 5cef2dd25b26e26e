//! Reading exported object sources from disk.

use std::path::Path;

use crate::error::{OrcaError, OrcaResult};

/// First line every imported source must start with.
pub const EXPORT_HEADER: &str = "$PBExportHeader$";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Read a source file as UTF-8 text ready to hand to the compiler.
///
/// A UTF-8 byte order mark is dropped and UTF-16 files (either byte order)
/// are converted. Text without an export header gets
/// `$PBExportHeader$<file name>\r\n` prepended.
pub fn read_source(path: &Path) -> OrcaResult<String> {
    let raw = std::fs::read(path)?;
    let text = decode(path, &raw)?;

    if text.starts_with(EXPORT_HEADER) {
        return Ok(text);
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(format!("{EXPORT_HEADER}{file_name}\r\n{text}"))
}

fn decode(path: &Path, raw: &[u8]) -> OrcaResult<String> {
    let invalid = |reason: String| OrcaError::InvalidEncoding {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(rest) = raw.strip_prefix(UTF16_LE_BOM) {
        return decode_utf16(rest, u16::from_le_bytes).map_err(invalid);
    }
    if let Some(rest) = raw.strip_prefix(UTF16_BE_BOM) {
        return decode_utf16(rest, u16::from_be_bytes).map_err(invalid);
    }
    let body = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    String::from_utf8(body.to_vec()).map_err(|e| invalid(e.to_string()))
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err(format!("odd byte count {} for UTF-16 text", bytes.len()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| e.to_string())
}
