// src/format/writer.rs
// Composite writer. Sequencing is fixed:
// backup -> read base -> strip prior footer -> base -> payload -> image
// -> strings -> footer -> drop backup.

use log::{debug, info, trace, warn};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::constants::{ATTACHED_SUFFIX, BACKUP_SUFFIX};
use super::footer::{
    AttachFooter, CompositeFooter, JarFooter, LaunchMode, SplashLayout, try_decode_tail,
};
use super::layout::Layout;
use super::strings::LaunchStrings;
use crate::exceptions::{JarpackError, Result};

/// Sections appended after the base binary
#[derive(Debug, Default)]
pub struct Sections<'a> {
    pub payload: &'a [u8],
    pub image: &'a [u8],
    pub fields: Vec<Vec<u8>>,
}

type PriorFooterProbe = fn(&[u8]) -> Option<u64>;

fn prior_payload_offset<F: CompositeFooter>(bytes: &[u8]) -> Option<u64> {
    try_decode_tail::<F>(bytes).map(|footer| footer.payload_offset())
}

/// Writes `[base][payload][image][strings][footer]` files
#[derive(Default)]
pub struct CompositeWriter {
    probes: Vec<PriorFooterProbe>,
}

impl std::fmt::Debug for CompositeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeWriter")
            .field("probes", &self.probes.len())
            .finish()
    }
}

impl CompositeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strip a footer of type `F` already present in the base before writing
    #[must_use]
    pub fn stripping<F: CompositeFooter>(mut self) -> Self {
        self.probes.push(prior_payload_offset::<F>);
        self
    }

    /// Truncate `bytes` at the payload offset of any recognised footer,
    /// repeating until none is left. Returns true if anything was removed.
    pub fn strip_prior(&self, bytes: &mut Vec<u8>) -> bool {
        let mut stripped = false;
        loop {
            let offset = self
                .probes
                .iter()
                .find_map(|probe| probe(bytes))
                .filter(|&offset| offset < bytes.len() as u64);
            match offset {
                Some(offset) => {
                    debug!("✂️ Stripping prior footer, truncating base at {offset}");
                    bytes.truncate(offset as usize);
                    stripped = true;
                }
                None => return stripped,
            }
        }
    }

    /// Write a composite file. `build_footer` receives the planned layout
    /// (footer segment still empty) and returns the footer to append.
    pub fn write<F, B>(
        &self,
        base: &Path,
        sections: &Sections<'_>,
        build_footer: B,
        output: &Path,
    ) -> Result<Layout>
    where
        F: CompositeFooter,
        B: FnOnce(&Layout) -> F,
    {
        let timer = Instant::now();

        // Step 1: a same-file write reads from a backup copy
        let backup = if same_file(base, output) {
            let backup = backup_path(base);
            debug!("💾 Output is the base, backing up to {}", backup.display());
            fs::copy(base, &backup).map_err(|e| {
                JarpackError::WriteFailed(format!("backup {}: {e}", backup.display()))
            })?;
            Some(backup)
        } else {
            None
        };
        let source = backup.as_deref().unwrap_or(base);

        let mut created = false;
        match self.write_from(source, sections, build_footer, output, &mut created) {
            Ok(layout) => {
                if let Some(backup) = &backup {
                    if let Err(e) = fs::remove_file(backup) {
                        warn!("⚠️ Could not remove backup {}: {e}", backup.display());
                    }
                }
                info!(
                    "✅ Wrote {} ({} bytes) in {:?}",
                    output.display(),
                    layout.total_size(),
                    timer.elapsed()
                );
                Ok(layout)
            }
            Err(e) => {
                // Only a destination this call created is removed
                if created {
                    if let Err(remove) = fs::remove_file(output) {
                        warn!("⚠️ Could not remove partial {}: {remove}", output.display());
                    }
                }
                if let Some(backup) = &backup {
                    warn!("⚠️ Write failed, original kept at {}", backup.display());
                }
                Err(e)
            }
        }
    }

    fn write_from<F, B>(
        &self,
        source: &Path,
        sections: &Sections<'_>,
        build_footer: B,
        output: &Path,
        created: &mut bool,
    ) -> Result<Layout>
    where
        F: CompositeFooter,
        B: FnOnce(&Layout) -> F,
    {
        // Step 2
        let mut base = fs::read(source)
            .map_err(|e| JarpackError::NotFound(format!("{}: {e}", source.display())))?;
        trace!("📖 Base binary {} is {} bytes", source.display(), base.len());

        // Step 3
        self.strip_prior(&mut base);

        let lengths = field_lengths(&sections.fields)?;
        let planned = Layout::plan(
            base.len() as u64,
            sections.payload.len() as u64,
            sections.image.len() as u64,
            &lengths,
            0,
        );
        let footer = build_footer(&planned).encode();
        let layout = Layout::plan(
            base.len() as u64,
            sections.payload.len() as u64,
            sections.image.len() as u64,
            &lengths,
            footer.len(),
        );

        let write_err =
            |e: std::io::Error| JarpackError::WriteFailed(format!("{}: {e}", output.display()));
        let file = File::create(output).map_err(write_err)?;
        *created = true;
        let mut out = BufWriter::new(file);

        // Steps 4-9
        out.write_all(&base).map_err(write_err)?;
        trace!("📍 Payload offset {}", layout.payload.offset);
        out.write_all(sections.payload).map_err(write_err)?;
        out.write_all(sections.image).map_err(write_err)?;
        for field in &sections.fields {
            out.write_all(field).map_err(write_err)?;
        }
        out.write_all(&footer).map_err(write_err)?;

        let file = out
            .into_inner()
            .map_err(|e| JarpackError::WriteFailed(format!("{}: {e}", output.display())))?;
        file.sync_all().map_err(write_err)?;

        let written = file.metadata().map_err(write_err)?.len();
        if written != layout.total_size() {
            return Err(JarpackError::WriteFailed(format!(
                "wrote {written} bytes, layout expects {}",
                layout.total_size()
            )));
        }
        Ok(layout)
    }
}

fn field_lengths(fields: &[Vec<u8>]) -> Result<Vec<u32>> {
    fields
        .iter()
        .map(|field| {
            u32::try_from(field.len()).map_err(|_| {
                JarpackError::InvalidFormat(format!("field of {} bytes is too long", field.len()))
            })
        })
        .collect()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// `<dir>/<stem>_attached<.ext>` next to `base`
pub fn default_attached_path(base: &Path) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{stem}{ATTACHED_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{ATTACHED_SUFFIX}"),
    };
    base.with_file_name(name)
}

/// Append `attachment` to `base`. Returns the output path used.
pub fn attach_exe(base: &Path, attachment: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let output = output.map_or_else(|| default_attached_path(base), Path::to_path_buf);
    let payload = fs::read(attachment)
        .map_err(|e| JarpackError::NotFound(format!("{}: {e}", attachment.display())))?;
    debug!(
        "📎 Attaching {} ({} bytes) to {}",
        attachment.display(),
        payload.len(),
        base.display()
    );

    let sections = Sections {
        payload: &payload,
        ..Sections::default()
    };
    CompositeWriter::new().stripping::<AttachFooter>().write(
        base,
        &sections,
        |layout| AttachFooter {
            payload_offset: layout.payload.offset,
            payload_size: layout.payload.size,
        },
        &output,
    )?;
    Ok(output)
}

/// Remove a generic attachment, writing the bare base binary to `output`
/// (in place when `output` is `None`). Returns the number of bytes removed.
pub fn strip_attachment(path: &Path, output: Option<&Path>) -> Result<u64> {
    let mut bytes = fs::read(path)
        .map_err(|e| JarpackError::NotFound(format!("{}: {e}", path.display())))?;
    let original = bytes.len() as u64;
    if !CompositeWriter::new()
        .stripping::<AttachFooter>()
        .strip_prior(&mut bytes)
    {
        return Err(JarpackError::NotAComposite(format!(
            "{} carries no attachment",
            path.display()
        )));
    }
    let output = output.unwrap_or(path);
    fs::write(output, &bytes)
        .map_err(|e| JarpackError::WriteFailed(format!("{}: {e}", output.display())))?;
    Ok(original - bytes.len() as u64)
}

/// Launch settings stored in the JAR footer
#[derive(Debug, Clone, Default)]
pub struct JarOptions {
    pub show_progress: bool,
    pub show_progress_text: bool,
    pub launch_time_ms: i32,
    pub timestamp: u64,
    pub java_version: u32,
    pub launch_mode: LaunchMode,
    pub splash_layout: Option<SplashLayout>,
}

/// Build a JAR package from `base` (the launcher stub)
pub fn package_jar(
    base: &Path,
    jar: &[u8],
    image: &[u8],
    strings: &LaunchStrings,
    options: &JarOptions,
    output: &Path,
) -> Result<Layout> {
    let string_lengths = strings.lengths()?;
    let sections = Sections {
        payload: jar,
        image,
        fields: strings.encode_fields().to_vec(),
    };

    CompositeWriter::new()
        .stripping::<JarFooter>()
        .stripping::<AttachFooter>()
        .write(
            base,
            &sections,
            |layout| JarFooter {
                payload_offset: layout.payload.offset,
                payload_size: layout.payload.size,
                image_size: layout.image.size,
                show_progress: options.show_progress,
                show_progress_text: options.show_progress_text,
                launch_time_ms: options.launch_time_ms,
                timestamp: options.timestamp,
                java_version: options.java_version,
                string_lengths,
                launch_mode: options.launch_mode,
                splash_layout: options.splash_layout,
            },
            output,
        )
}
