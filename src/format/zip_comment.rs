// src/format/zip_comment.rs
// ZIP End Of Central Directory handling. The extracted JAR carries the
// package timestamp as its 8-byte archive comment.

use super::constants::{
    EOCD_COMMENT_LENGTH_OFFSET, EOCD_MAX_SEARCH, EOCD_MIN_SIZE, EOCD_SIGNATURE,
    FINGERPRINT_RECORD_SIZE,
};
use crate::exceptions::{JarpackError, Result};
use log::trace;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Position of the EOCD inside `tail`, where `tail` ends at end of file.
///
/// Scans backward from the last possible record start. A candidate counts
/// only if its comment reaches exactly to the end of `tail`.
pub fn find_eocd(tail: &[u8]) -> Option<usize> {
    if tail.len() < EOCD_MIN_SIZE {
        return None;
    }
    let signature = EOCD_SIGNATURE.to_le_bytes();
    let last_start = tail.len() - EOCD_MIN_SIZE;
    let first_start = tail.len().saturating_sub(EOCD_MAX_SEARCH);

    (first_start..=last_start).rev().find(|&pos| {
        if tail[pos..pos + 4] != signature {
            return false;
        }
        let comment_len = comment_length(&tail[pos..]);
        pos + EOCD_MIN_SIZE + comment_len == tail.len()
    })
}

/// Comment length field of an EOCD record starting at `record[0]`
pub fn comment_length(record: &[u8]) -> usize {
    let at = EOCD_COMMENT_LENGTH_OFFSET;
    usize::from(u16::from_le_bytes([record[at], record[at + 1]]))
}

/// Fixed part of an EOCD with its comment replaced by the fingerprint record
pub fn eocd_with_fingerprint(eocd: &[u8], timestamp: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(EOCD_MIN_SIZE + FINGERPRINT_RECORD_SIZE);
    out.extend_from_slice(&eocd[..EOCD_COMMENT_LENGTH_OFFSET]);
    out.extend_from_slice(&(FINGERPRINT_RECORD_SIZE as u16).to_le_bytes());
    out.extend_from_slice(&timestamp.to_le_bytes());
    out
}

/// Read up to the last [`EOCD_MAX_SEARCH`] bytes of an open file
pub fn read_search_window(file: &mut File, file_size: u64) -> Result<Vec<u8>> {
    let window = file_size.min(EOCD_MAX_SEARCH as u64);
    file.seek(SeekFrom::Start(file_size - window))?;
    let mut tail = vec![0u8; window as usize];
    file.read_exact(&mut tail)?;
    Ok(tail)
}

/// Timestamp embedded as the archive comment of a ZIP file
pub fn read_fingerprint(path: &Path) -> Result<u64> {
    let mut file = File::open(path)
        .map_err(|e| JarpackError::NotFound(format!("{}: {e}", path.display())))?;
    let file_size = file.metadata()?.len();
    let tail = read_search_window(&mut file, file_size)?;

    let eocd = find_eocd(&tail).ok_or_else(|| {
        JarpackError::InvalidContainer(format!("no ZIP end record in {}", path.display()))
    })?;
    let comment_len = comment_length(&tail[eocd..]);
    if comment_len != FINGERPRINT_RECORD_SIZE {
        return Err(JarpackError::InvalidContainer(format!(
            "archive comment is {comment_len} bytes, expected {FINGERPRINT_RECORD_SIZE}"
        )));
    }

    let start = eocd + EOCD_MIN_SIZE;
    let record: [u8; FINGERPRINT_RECORD_SIZE] = tail[start..start + FINGERPRINT_RECORD_SIZE]
        .try_into()
        .map_err(|_| JarpackError::InvalidContainer("short fingerprint record".into()))?;
    let timestamp = u64::from_le_bytes(record);
    trace!("🔍 ZIP fingerprint {timestamp} in {}", path.display());
    Ok(timestamp)
}
