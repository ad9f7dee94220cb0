//! Extraction of embedded payloads to side files
//!
//! The JAR payload is streamed out in fixed-size chunks. When a fingerprint
//! is requested, the archive comment is replaced by the 8-byte timestamp
//! record so a later launch can tell whether the file is still current.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace, warn};

use super::constants::{COPY_CHUNK_SIZE, EOCD_MAX_SEARCH, EOCD_MIN_SIZE};
use super::layout::Segment;
use super::reader::{open_file, read_segment};
use super::zip_comment::{eocd_with_fingerprint, find_eocd};
use crate::exceptions::{JarpackError, Result};
use crate::utils::{clear_protective_attributes, set_hidden};

/// Stream `len` bytes from the current position of `src` into `dst`
fn copy_range<W: Write>(src: &mut File, dst: &mut W, len: u64) -> Result<()> {
    let mut buffer = vec![0u8; COPY_CHUNK_SIZE];
    let mut remaining = len;
    while remaining > 0 {
        let want = remaining.min(COPY_CHUNK_SIZE as u64) as usize;
        let got = src.read(&mut buffer[..want])?;
        if got == 0 {
            return Err(JarpackError::TruncatedRead {
                expected: len,
                actual: len - remaining,
            });
        }
        dst.write_all(&buffer[..got])
            .map_err(|e| JarpackError::WriteFailed(e.to_string()))?;
        remaining -= got as u64;
    }
    Ok(())
}

fn prepare_destination(dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            JarpackError::WriteFailed(format!("create {}: {e}", parent.display()))
        })?;
    }
    clear_protective_attributes(dest)
        .map_err(|e| JarpackError::WriteFailed(format!("{}: {e}", dest.display())))
}

fn write_destination<F>(dest: &Path, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    prepare_destination(dest)?;
    let file = File::create(dest)
        .map_err(|e| JarpackError::WriteFailed(format!("{}: {e}", dest.display())))?;
    let mut out = BufWriter::new(file);

    let result = body(&mut out).and_then(|()| {
        out.flush()
            .map_err(|e| JarpackError::WriteFailed(format!("{}: {e}", dest.display())))
    });
    if result.is_err() {
        drop(out);
        let _ = fs::remove_file(dest);
    }
    result
}

/// Copy a payload segment out verbatim. Returns the bytes written.
pub fn extract_segment(composite: &Path, payload: Segment, dest: &Path) -> Result<u64> {
    trace!("📤 Extracting {payload} from {} to {}", composite.display(), dest.display());
    let (mut src, _) = open_file(composite)?;
    src.seek(SeekFrom::Start(payload.offset))?;
    write_destination(dest, |out| copy_range(&mut src, out, payload.size))?;
    Ok(payload.size)
}

/// Extract an embedded JAR, stamping `timestamp` as its archive comment,
/// and mark the result hidden. Returns the bytes written.
pub fn extract_jar(composite: &Path, payload: Segment, dest: &Path, timestamp: u64) -> Result<u64> {
    debug!("📦 Extracting JAR to {}", dest.display());
    let (mut src, _) = open_file(composite)?;

    let window = payload.size.min(EOCD_MAX_SEARCH as u64);
    let window_start = payload.end() - window;
    let tail = read_segment(&mut src, Segment::new(window_start, window))?;
    let eocd = find_eocd(&tail).ok_or_else(|| {
        JarpackError::InvalidContainer("embedded JAR has no ZIP end record".into())
    })?;

    let body_len = window_start + eocd as u64 - payload.offset;
    let record = eocd_with_fingerprint(&tail[eocd..eocd + EOCD_MIN_SIZE], timestamp);

    src.seek(SeekFrom::Start(payload.offset))?;
    write_destination(dest, |out| {
        copy_range(&mut src, out, body_len)?;
        out.write_all(&record)
            .map_err(|e| JarpackError::WriteFailed(e.to_string()))
    })?;

    if let Err(e) = set_hidden(dest) {
        warn!("⚠️ Could not hide {}: {e}", dest.display());
    }
    Ok(body_len + record.len() as u64)
}
