// src/format/footer.rs
// Fixed-size trailing records for the generic attachment and JAR launcher formats.
// Little-endian, packed, no padding.

use super::constants::{
    ATTACH_FOOTER_SIZE, ATTACH_MAGIC, JAR_EXTENDED_FOOTER_SIZE, JAR_EXTENDED_MAGIC,
    JAR_FOOTER_SIZE, JAR_MAGIC, STRING_FIELD_COUNT,
};
use super::layout::{Layout, Segment};
use crate::exceptions::{JarpackError, Result};
use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Footer revisions, each identified by its own magic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FooterKind {
    /// Generic attachment: one appended binary
    Attach,
    /// JAR launcher
    Jar,
    /// JAR launcher with splash text layout
    JarExtended,
}

impl FooterKind {
    pub const fn size(self) -> usize {
        match self {
            FooterKind::Attach => ATTACH_FOOTER_SIZE,
            FooterKind::Jar => JAR_FOOTER_SIZE,
            FooterKind::JarExtended => JAR_EXTENDED_FOOTER_SIZE,
        }
    }

    pub const fn magic(self) -> u32 {
        match self {
            FooterKind::Attach => ATTACH_MAGIC,
            FooterKind::Jar => JAR_MAGIC,
            FooterKind::JarExtended => JAR_EXTENDED_MAGIC,
        }
    }

    /// Every revision of the same format, most specific first
    pub const fn revisions(self) -> &'static [FooterKind] {
        match self {
            FooterKind::Attach => AttachFooter::KINDS,
            FooterKind::Jar | FooterKind::JarExtended => JarFooter::KINDS,
        }
    }
}

impl fmt::Display for FooterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FooterKind::Attach => write!(f, "attach"),
            FooterKind::Jar => write!(f, "jar"),
            FooterKind::JarExtended => write!(f, "jar+layout"),
        }
    }
}

/// Size in bytes of the footer record for a format revision
pub fn compute_footer_size(kind: FooterKind) -> usize {
    kind.size()
}

/// How the launcher starts the Java payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LaunchMode {
    /// Spawn `java.exe -jar ...`
    #[default]
    JavaExeProcess,
    /// Load the JVM library in-process through JNI
    DirectRuntimeLoad,
}

impl LaunchMode {
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(LaunchMode::JavaExeProcess),
            1 => Ok(LaunchMode::DirectRuntimeLoad),
            other => Err(JarpackError::InvalidFormat(format!(
                "unknown launch mode {other}"
            ))),
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            LaunchMode::JavaExeProcess => 0,
            LaunchMode::DirectRuntimeLoad => 1,
        }
    }

    /// Label used by the info display
    pub fn label(self) -> &'static str {
        match self {
            LaunchMode::JavaExeProcess => "java.exe",
            LaunchMode::DirectRuntimeLoad => "direct_jvm",
        }
    }
}

/// Splash text placement as percentages of the window size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SplashLayout {
    pub title_x: f32,
    pub title_y: f32,
    pub version_x: f32,
    pub version_y: f32,
    pub status_x: f32,
    pub status_y: f32,
    pub title_font: f32,
    pub version_font: f32,
    pub status_font: f32,
}

impl Default for SplashLayout {
    fn default() -> Self {
        SplashLayout {
            title_x: 50.0,
            title_y: 40.0,
            version_x: 50.0,
            version_y: 58.0,
            status_x: 50.0,
            status_y: 85.0,
            title_font: 12.0,
            version_font: 6.0,
            status_font: 5.0,
        }
    }
}

impl SplashLayout {
    fn as_array(&self) -> [f32; 9] {
        [
            self.title_x,
            self.title_y,
            self.version_x,
            self.version_y,
            self.status_x,
            self.status_y,
            self.title_font,
            self.version_font,
            self.status_font,
        ]
    }

    fn from_array(v: [f32; 9]) -> Self {
        SplashLayout {
            title_x: v[0],
            title_y: v[1],
            version_x: v[2],
            version_y: v[3],
            status_x: v[4],
            status_y: v[5],
            title_font: v[6],
            version_font: v[7],
            status_font: v[8],
        }
    }
}

/// Sequential little-endian field reader over a footer slice
struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        FieldReader { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self, field: &str) -> Result<[u8; N]> {
        let bytes = self
            .data
            .get(self.pos..self.pos + N)
            .ok_or_else(|| JarpackError::InvalidFormat(format!("footer truncated at {field}")))?;
        self.pos += N;
        bytes
            .try_into()
            .map_err(|_| JarpackError::InvalidFormat(format!("invalid {field} bytes")))
    }

    fn u8(&mut self, field: &str) -> Result<u8> {
        Ok(self.take::<1>(field)?[0])
    }

    fn u32(&mut self, field: &str) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(field)?))
    }

    fn i32(&mut self, field: &str) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(field)?))
    }

    fn u64(&mut self, field: &str) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take(field)?))
    }

    fn f32(&mut self, field: &str) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take(field)?))
    }
}

/// Read the leading magic of a footer candidate
pub fn peek_magic(bytes: &[u8]) -> Option<u32> {
    bytes
        .get(0..4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
}

fn check_header(bytes: &[u8], kind: FooterKind) -> Result<()> {
    if bytes.len() < kind.size() {
        return Err(JarpackError::InvalidFormat(format!(
            "{kind} footer needs {} bytes, got {}",
            kind.size(),
            bytes.len()
        )));
    }
    match peek_magic(bytes) {
        Some(magic) if magic == kind.magic() => Ok(()),
        Some(magic) => Err(JarpackError::InvalidFormat(format!(
            "magic mismatch: expected {:#010x}, found {magic:#010x}",
            kind.magic()
        ))),
        None => Err(JarpackError::InvalidFormat("missing magic".into())),
    }
}

/// A trailing record that describes a composite file
pub trait CompositeFooter: Sized {
    /// Accepted revisions, most specific first
    const KINDS: &'static [FooterKind];

    fn kind(&self) -> FooterKind;
    fn encode(&self) -> Vec<u8>;
    fn decode(bytes: &[u8]) -> Result<Self>;

    /// Layout implied by this footer for a file of `file_size` bytes
    fn recover_layout(&self, file_size: u64) -> Result<Layout>;

    /// Where the appended payload starts, i.e. the size of the base binary
    fn payload_offset(&self) -> u64;
}

/// Generic attachment footer: `magic | payloadOffset | payloadSize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachFooter {
    pub payload_offset: u64,
    pub payload_size: u64,
}

impl CompositeFooter for AttachFooter {
    const KINDS: &'static [FooterKind] = &[FooterKind::Attach];

    fn kind(&self) -> FooterKind {
        FooterKind::Attach
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ATTACH_FOOTER_SIZE);
        out.extend_from_slice(&ATTACH_MAGIC.to_le_bytes());
        out.extend_from_slice(&self.payload_offset.to_le_bytes());
        out.extend_from_slice(&self.payload_size.to_le_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        check_header(bytes, FooterKind::Attach)?;
        let mut reader = FieldReader::new(&bytes[4..]);
        Ok(AttachFooter {
            payload_offset: reader.u64("payload offset")?,
            payload_size: reader.u64("payload size")?,
        })
    }

    fn recover_layout(&self, file_size: u64) -> Result<Layout> {
        Layout::recover(
            file_size,
            ATTACH_FOOTER_SIZE,
            Segment::new(self.payload_offset, self.payload_size),
            0,
            &[],
        )
    }

    fn payload_offset(&self) -> u64 {
        self.payload_offset
    }
}

/// JAR launcher footer
#[derive(Debug, Clone, PartialEq)]
pub struct JarFooter {
    pub payload_offset: u64,
    pub payload_size: u64,
    pub image_size: u64,
    pub show_progress: bool,
    pub show_progress_text: bool,
    /// Estimated startup time; non-positive means unknown
    pub launch_time_ms: i32,
    /// Producer-assigned freshness fingerprint
    pub timestamp: u64,
    /// JNI version tag, see [`super::java_version`]
    pub java_version: u32,
    /// Byte lengths of the string fields in their fixed order
    pub string_lengths: [u32; STRING_FIELD_COUNT],
    pub launch_mode: LaunchMode,
    /// Present only in the extended revision
    pub splash_layout: Option<SplashLayout>,
}

impl CompositeFooter for JarFooter {
    const KINDS: &'static [FooterKind] = &[FooterKind::JarExtended, FooterKind::Jar];

    fn kind(&self) -> FooterKind {
        if self.splash_layout.is_some() {
            FooterKind::JarExtended
        } else {
            FooterKind::Jar
        }
    }

    fn encode(&self) -> Vec<u8> {
        let kind = self.kind();
        let mut out = Vec::with_capacity(kind.size());
        out.extend_from_slice(&kind.magic().to_le_bytes());
        out.extend_from_slice(&self.payload_offset.to_le_bytes());
        out.extend_from_slice(&self.payload_size.to_le_bytes());
        out.extend_from_slice(&self.image_size.to_le_bytes());
        out.push(u8::from(self.show_progress));
        out.push(u8::from(self.show_progress_text));
        out.extend_from_slice(&self.launch_time_ms.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.java_version.to_le_bytes());
        for len in &self.string_lengths {
            out.extend_from_slice(&len.to_le_bytes());
        }
        out.extend_from_slice(&self.launch_mode.as_u32().to_le_bytes());
        if let Some(layout) = &self.splash_layout {
            for value in layout.as_array() {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        debug_assert_eq!(out.len(), kind.size());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let kind = match peek_magic(bytes) {
            Some(JAR_EXTENDED_MAGIC) => FooterKind::JarExtended,
            _ => FooterKind::Jar,
        };
        check_header(bytes, kind)?;

        let mut reader = FieldReader::new(&bytes[4..]);
        let payload_offset = reader.u64("payload offset")?;
        let payload_size = reader.u64("payload size")?;
        let image_size = reader.u64("image size")?;
        let show_progress = reader.u8("show progress")? != 0;
        let show_progress_text = reader.u8("show progress text")? != 0;
        let launch_time_ms = reader.i32("launch time")?;
        let timestamp = reader.u64("timestamp")?;
        let java_version = reader.u32("java version")?;

        let mut string_lengths = [0u32; STRING_FIELD_COUNT];
        for len in string_lengths.iter_mut() {
            *len = reader.u32("string length")?;
        }

        let launch_mode = LaunchMode::from_u32(reader.u32("launch mode")?)?;

        let splash_layout = if kind == FooterKind::JarExtended {
            let mut values = [0f32; 9];
            for value in values.iter_mut() {
                *value = reader.f32("splash layout")?;
            }
            Some(SplashLayout::from_array(values))
        } else {
            None
        };

        Ok(JarFooter {
            payload_offset,
            payload_size,
            image_size,
            show_progress,
            show_progress_text,
            launch_time_ms,
            timestamp,
            java_version,
            string_lengths,
            launch_mode,
            splash_layout,
        })
    }

    fn recover_layout(&self, file_size: u64) -> Result<Layout> {
        Layout::recover(
            file_size,
            self.kind().size(),
            Segment::new(self.payload_offset, self.payload_size),
            self.image_size,
            &self.string_lengths,
        )
    }

    fn payload_offset(&self) -> u64 {
        self.payload_offset
    }
}

/// Largest footer any revision of `F` can have
pub fn max_footer_size<F: CompositeFooter>() -> usize {
    F::KINDS.iter().map(|k| k.size()).max().unwrap_or(0)
}

/// Find and validate the footer at the end of `tail`, the last bytes of a
/// file of `file_size` bytes.
///
/// Revisions are tried most specific first; a revision is accepted only when
/// its magic matches and its declared layout balances against the file size.
/// No matching magic at all is `NotAComposite`; a matching magic with a bad
/// layout reports that layout error.
pub fn locate<F: CompositeFooter>(tail: &[u8], file_size: u64) -> Result<(F, Layout)> {
    let smallest = F::KINDS.iter().map(|k| k.size()).min().unwrap_or(0);
    if file_size < smallest as u64 {
        return Err(JarpackError::TooSmall {
            size: file_size,
            required: smallest as u64,
        });
    }

    let mut first_error = None;
    for &kind in F::KINDS {
        let size = kind.size();
        if tail.len() < size {
            continue;
        }
        let candidate = &tail[tail.len() - size..];
        if peek_magic(candidate) != Some(kind.magic()) {
            continue;
        }
        trace!("🔍 {kind} magic found, validating layout");

        let result = F::decode(candidate)
            .and_then(|footer| footer.recover_layout(file_size).map(|layout| (footer, layout)));
        match result {
            Ok(found) => return Ok(found),
            Err(e) => {
                trace!("⚠️ {kind} candidate rejected: {e}");
                first_error.get_or_insert(e);
            }
        }
    }

    Err(first_error.unwrap_or_else(|| {
        JarpackError::NotAComposite(format!(
            "no {} footer at end of file",
            F::KINDS.first().map(|k| k.to_string()).unwrap_or_default()
        ))
    }))
}

/// "Is this already one of ours?" over an in-memory buffer
pub fn try_decode_tail<F: CompositeFooter>(bytes: &[u8]) -> Option<F> {
    locate::<F>(bytes, bytes.len() as u64)
        .ok()
        .map(|(footer, _)| footer)
}
