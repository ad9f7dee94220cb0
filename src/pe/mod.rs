//! Windows PE patching for launcher executables
//!
//! Covers the console/GUI subsystem flag, the UAC execution-level manifest
//! and the application icon.

pub mod headers;
pub mod icon;
pub mod resources;

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

pub use headers::{ExecutionLevel, Subsystem, is_pe_executable};
pub use resources::ResourceUpdate;

/// Changes to apply to an executable
#[derive(Debug, Clone, Default)]
pub struct PeOptions {
    pub subsystem: Option<Subsystem>,
    pub execution_level: Option<ExecutionLevel>,
    pub icon: Option<PathBuf>,
}

impl PeOptions {
    pub fn is_empty(&self) -> bool {
        self.subsystem.is_none() && self.execution_level.is_none() && self.icon.is_none()
    }
}

/// Summary of an executable's headers
#[derive(Debug, Clone)]
pub struct PeInfo {
    pub file_size: u64,
    pub image_size: u64,
    pub subsystem: Subsystem,
    pub pe32_plus: bool,
    pub execution_level: Option<ExecutionLevel>,
}

impl PeInfo {
    /// Bytes appended after the last section
    pub fn overlay_size(&self) -> u64 {
        self.file_size.saturating_sub(self.image_size)
    }
}

/// Applies [`PeOptions`] to executables on disk
#[derive(Debug, Default)]
pub struct PeModifier;

impl PeModifier {
    pub fn new() -> Self {
        PeModifier
    }

    /// Read header information without modifying anything
    pub fn inspect(&self, path: &Path) -> Result<PeInfo> {
        let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(PeInfo {
            file_size: data.len() as u64,
            image_size: headers::image_end(&data)?,
            subsystem: headers::subsystem(&data)?,
            pe32_plus: headers::is_pe32_plus(&data)?,
            execution_level: headers::execution_level(&data),
        })
    }

    /// Apply `options` to the executable at `path`.
    ///
    /// Resources go first because the resource updater rewrites the image;
    /// the subsystem patch then refreshes the checksum over the final bytes.
    pub fn modify(&self, path: &Path, options: &PeOptions) -> Result<()> {
        if options.is_empty() {
            debug!("No PE changes requested for {}", path.display());
            return Ok(());
        }

        let update = ResourceUpdate {
            manifest: options.execution_level.map(headers::manifest_for),
            icons: match &options.icon {
                Some(icon) => {
                    let data = fs::read(icon)
                        .with_context(|| format!("reading icon {}", icon.display()))?;
                    icon::parse_ico(&data)?
                }
                None => Vec::new(),
            },
        };
        resources::apply_resources(path, &update)?;

        if let Some(subsystem) = options.subsystem {
            let mut data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            headers::set_subsystem(&mut data, subsystem)?;
            fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
        }

        info!("🪟 Patched {}", path.display());
        Ok(())
    }
}
