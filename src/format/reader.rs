// src/format/reader.rs
// Composite reader: every offset is derived backward from the trailing footer.

use log::{debug, trace};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::footer::{
    AttachFooter, CompositeFooter, FooterKind, JarFooter, locate, max_footer_size, peek_magic,
};
use super::layout::{Layout, Segment};
use super::strings::LaunchStrings;
use crate::exceptions::{JarpackError, Result};

/// Everything a launcher needs from its own executable
#[derive(Debug, Clone)]
pub struct JarDescriptor {
    pub path: PathBuf,
    pub file_size: u64,
    pub footer: JarFooter,
    pub layout: Layout,
    pub strings: LaunchStrings,
}

/// A generic attachment found at the end of a binary
#[derive(Debug, Clone)]
pub struct AttachDescriptor {
    pub path: PathBuf,
    pub file_size: u64,
    pub footer: AttachFooter,
    pub layout: Layout,
}

pub(crate) fn open_file(path: &Path) -> Result<(File, u64)> {
    let file = File::open(path).map_err(|e| {
        JarpackError::NotFound(format!("{}: {e}", path.display()))
    })?;
    let file_size = file.metadata()?.len();
    Ok((file, file_size))
}

/// Read exactly the bytes of `segment`, reporting a short read
pub(crate) fn read_segment(file: &mut File, segment: Segment) -> Result<Vec<u8>> {
    if segment.is_empty() {
        return Ok(Vec::new());
    }
    file.seek(SeekFrom::Start(segment.offset))?;
    let mut buf = Vec::with_capacity(segment.size as usize);
    let actual = file.by_ref().take(segment.size).read_to_end(&mut buf)? as u64;
    if actual != segment.size {
        return Err(JarpackError::TruncatedRead {
            expected: segment.size,
            actual,
        });
    }
    Ok(buf)
}

fn read_tail(file: &mut File, file_size: u64, len: usize) -> Result<Vec<u8>> {
    let window = file_size.min(len as u64);
    read_segment(file, Segment::new(file_size - window, window))
}

fn locate_in_file<F: CompositeFooter>(file: &mut File, file_size: u64) -> Result<(F, Layout)> {
    let tail = read_tail(file, file_size, max_footer_size::<F>())?;
    locate::<F>(&tail, file_size)
}

/// Open a JAR package and decode its footer, layout and strings
pub fn open_jar(path: &Path) -> Result<JarDescriptor> {
    let timer = Instant::now();
    trace!("📖 Opening JAR package {}", path.display());

    let (mut file, file_size) = open_file(path)?;
    let (footer, layout) = locate_in_file::<JarFooter>(&mut file, file_size)?;
    debug!(
        "🔍 {} footer: payload {}, image {} bytes",
        footer.kind(),
        layout.payload,
        footer.image_size
    );

    let mut fields = Vec::with_capacity(layout.fields.len());
    for segment in &layout.fields {
        fields.push(read_segment(&mut file, *segment)?);
    }
    let strings = LaunchStrings::decode_fields(&fields)?;

    trace!("📖 Package decoded in {:?}", timer.elapsed());
    Ok(JarDescriptor {
        path: path.to_path_buf(),
        file_size,
        footer,
        layout,
        strings,
    })
}

/// Open a binary carrying a generic attachment
pub fn open_attached(path: &Path) -> Result<AttachDescriptor> {
    trace!("📖 Opening attached binary {}", path.display());
    let (mut file, file_size) = open_file(path)?;
    let (footer, layout) = locate_in_file::<AttachFooter>(&mut file, file_size)?;
    debug!("🔍 attachment at {}", layout.payload);
    Ok(AttachDescriptor {
        path: path.to_path_buf(),
        file_size,
        footer,
        layout,
    })
}

/// Identify the footer revision from the trailing magic alone.
///
/// Probes `candidates` in order and returns the first whose magic sits at
/// the start of its footer-sized tail. The layout is not validated.
pub fn peek_kind(path: &Path, candidates: &[FooterKind]) -> Result<Option<FooterKind>> {
    let (mut file, file_size) = open_file(path)?;
    let window = candidates.iter().map(|k| k.size()).max().unwrap_or(0);
    let tail = read_tail(&mut file, file_size, window)?;

    let found = candidates.iter().copied().find(|kind| {
        tail.len() >= kind.size()
            && peek_magic(&tail[tail.len() - kind.size()..]) == Some(kind.magic())
    });
    trace!("🔍 {} tail magic: {found:?}", path.display());
    Ok(found)
}

/// Check only the trailing magic for `kind`, without validating the layout.
/// Any revision of the same format is accepted.
pub fn verify_only(path: &Path, kind: FooterKind) -> Result<bool> {
    Ok(peek_kind(path, kind.revisions())?.is_some())
}

/// The attached binary as bytes
pub fn read_payload(path: &Path) -> Result<Vec<u8>> {
    let descriptor = open_attached(path)?;
    let (mut file, _) = open_file(&descriptor.path)?;
    read_segment(&mut file, descriptor.layout.payload)
}

/// The splash image bytes, empty when the package has none
pub fn read_image(descriptor: &JarDescriptor) -> Result<Vec<u8>> {
    if descriptor.layout.image.is_empty() {
        return Ok(Vec::new());
    }
    let (mut file, _) = open_file(&descriptor.path)?;
    read_segment(&mut file, descriptor.layout.image)
}
