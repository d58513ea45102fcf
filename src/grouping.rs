//! Checksums used by the backend to group recurring events.
//!
//! A signature string is derived from the event's error chain or its call
//! site, then hashed through a [`ChecksumHasher`]. Only determinism matters:
//! the same signature always yields the same checksum.

use flate2::Crc;
use sha2::{Digest, Sha256};

use crate::exception_schema::{ExceptionChain, StackFrame};

/// Hashes a grouping signature into the `checksum` field.
pub trait ChecksumHasher: Send + Sync {
    fn checksum(&self, signature: &str) -> String;
}

/// CRC-32 of the signature as 8 uppercase hex digits.
#[derive(Clone, Copy, Debug, Default)]
pub struct Crc32Hasher;

impl ChecksumHasher for Crc32Hasher {
    fn checksum(&self, signature: &str) -> String {
        let mut crc = Crc::new();
        crc.update(signature.as_bytes());
        format!("{:08X}", crc.sum())
    }
}

/// SHA-256 of the signature as 64 lowercase hex digits.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl ChecksumHasher for Sha256Hasher {
    fn checksum(&self, signature: &str) -> String {
        hex::encode(Sha256::digest(signature.as_bytes()))
    }
}

/// Checksum `signature` with the default hasher.
pub fn checksum(signature: &str) -> String {
    Crc32Hasher.checksum(signature)
}

/// Signature of a chained error: one line per frame of every exception,
/// outer exception first.
///
/// Each line is `module + function + filename + lineno`, with `null` for an
/// unknown file and `-1` for an unknown line.
pub fn exception_signature(chain: &ExceptionChain) -> String {
    let mut signature = String::new();
    for exception in chain.iter() {
        for frame in &exception.frames {
            signature.push_str(&frame.module);
            signature.push_str(&frame.function);
            signature.push_str(frame.filename.as_deref().unwrap_or("null"));
            match frame.lineno {
                Some(line) => signature.push_str(&line.to_string()),
                None => signature.push_str("-1"),
            }
            signature.push('\n');
        }
    }
    signature
}

/// Choose the grouping signature for an event.
///
/// A chain with at least one cause wins; otherwise the call site's location
/// identifier is used. Returns `None` when neither applies, leaving grouping
/// to the backend.
pub fn grouping_signature(
    chain: Option<&ExceptionChain>,
    call_site: Option<&StackFrame>,
) -> Option<String> {
    match (chain, call_site) {
        (Some(chain), _) if chain.has_cause() => Some(exception_signature(chain)),
        (_, Some(site)) => Some(format_culprit(site)),
        _ => None,
    }
}

/// Render a frame as a culprit: `module.function(file:line)`,
/// `module.function(file)` or `module.function`.
pub fn format_culprit(frame: &StackFrame) -> String {
    frame.to_string()
}
