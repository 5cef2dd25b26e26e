//! Binary section codec for pbmanager.
//!
//! Objects with embedded OLE content are exported as two files: the source
//! text and a sidecar holding the raw binary data as a chain of 512-byte
//! blocks. Before such an object can be imported, the sidecar is turned back
//! into the textual binary section the compiler expects after the source.
//!
//! # Layout
//!
//! - **Block** ([`block`]): `DAT*` marker, next-block offset, payload length
//!   and up to 502 payload bytes
//! - **Section** ([`section`]): lowercase hex of the concatenated payloads,
//!   each 4-byte group reversed, zero-padded and split into 3992-character
//!   lines between fixed start/end markers

pub mod block;
pub mod error;
pub mod section;

pub use block::{build_sidecar, parse_blocks, Block};
pub use error::{BinsecError, BinsecResult};
pub use section::{decode_payload_hex, encode, payload_hex, BinarySection, CHUNK_WIDTH};
