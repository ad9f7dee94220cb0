//! PE resource updates (manifest and icon) through the Windows API
//!
//! `EndUpdateResourceW` rewrites the image and drops anything appended after
//! the last section, so overlay data is saved first and appended again once
//! the update is committed.

use anyhow::Result;
use std::path::Path;

use super::icon::IconImage;

/// Resource type ids
pub const RT_ICON: u16 = 3;
pub const RT_GROUP_ICON: u16 = 14;
pub const RT_MANIFEST: u16 = 24;

/// Resource id used for the manifest and the icon group
pub const PRIMARY_RESOURCE_ID: u16 = 1;

/// A set of resources to write in one update session
#[derive(Debug, Default)]
pub struct ResourceUpdate {
    pub manifest: Option<String>,
    pub icons: Vec<IconImage>,
}

impl ResourceUpdate {
    pub fn is_empty(&self) -> bool {
        self.manifest.is_none() && self.icons.is_empty()
    }

    /// Flatten into `(type, id, data)` entries in write order
    pub fn entries(&self) -> Vec<(u16, u16, Vec<u8>)> {
        let mut entries = Vec::new();
        for (i, icon) in self.icons.iter().enumerate() {
            entries.push((RT_ICON, i as u16 + 1, icon.data.clone()));
        }
        if !self.icons.is_empty() {
            entries.push((
                RT_GROUP_ICON,
                PRIMARY_RESOURCE_ID,
                super::icon::group_icon_directory(&self.icons, 1),
            ));
        }
        if let Some(manifest) = &self.manifest {
            entries.push((RT_MANIFEST, PRIMARY_RESOURCE_ID, manifest.as_bytes().to_vec()));
        }
        entries
    }
}

/// Write `update` into the executable at `path`, keeping overlay data.
/// Existing resources not named in `update` are preserved.
#[cfg(target_os = "windows")]
#[allow(unsafe_code)] // Required for Windows API FFI calls
pub fn apply_resources(path: &Path, update: &ResourceUpdate) -> Result<()> {
    use anyhow::Context;
    use log::{debug, info};
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use std::os::windows::ffi::OsStrExt;
    use windows::Win32::System::LibraryLoader::{
        BeginUpdateResourceW, EndUpdateResourceW, UpdateResourceW,
    };
    use windows::core::PCWSTR;

    const LANG_NEUTRAL: u16 = 0; // MAKELANGID(LANG_NEUTRAL, SUBLANG_NEUTRAL)

    if update.is_empty() {
        return Ok(());
    }

    let original = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let image_end = super::headers::image_end(&original)? as usize;
    let overlay = original[image_end..].to_vec();
    if !overlay.is_empty() {
        debug!("💾 Saved {} bytes of overlay data", overlay.len());
    }

    let wide_path: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    unsafe {
        let handle = BeginUpdateResourceW(PCWSTR(wide_path.as_ptr()), false)
            .map_err(|e| anyhow::anyhow!("BeginUpdateResourceW failed: {}", e))?;

        for (kind, id, data) in update.entries() {
            debug!("📦 Writing resource type {kind} id {id} ({} bytes)", data.len());
            let result = UpdateResourceW(
                handle,
                PCWSTR(kind as usize as *const u16), // MAKEINTRESOURCE
                PCWSTR(id as usize as *const u16),
                LANG_NEUTRAL,
                Some(data.as_ptr() as *const _),
                data.len() as u32,
            );
            if let Err(e) = result {
                let _ = EndUpdateResourceW(handle, true);
                return Err(anyhow::anyhow!("UpdateResourceW failed: {}", e));
            }
        }

        EndUpdateResourceW(handle, false)
            .map_err(|e| anyhow::anyhow!("EndUpdateResourceW failed: {}", e))?;
    }

    if !overlay.is_empty() {
        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .with_context(|| format!("reopening {}", path.display()))?;
        file.write_all(&overlay)?;
        debug!("💾 Restored {} bytes of overlay data", overlay.len());
    }

    let mut patched = fs::read(path)?;
    super::headers::update_checksum(&mut patched)?;
    fs::write(path, patched)?;

    info!("✅ Updated resources of {}", path.display());
    Ok(())
}

/// Stub for non-Windows platforms
#[cfg(not(target_os = "windows"))]
pub fn apply_resources(_path: &Path, update: &ResourceUpdate) -> Result<()> {
    if update.is_empty() {
        return Ok(());
    }
    anyhow::bail!("PE resource updates are only supported on Windows")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_order_and_ids() {
        let icon = IconImage {
            width: 16,
            height: 16,
            color_count: 0,
            reserved: 0,
            planes: 1,
            bit_count: 32,
            data: vec![1, 2, 3],
        };
        let update = ResourceUpdate {
            manifest: Some("<assembly/>".into()),
            icons: vec![icon.clone(), icon],
        };
        let kinds: Vec<(u16, u16)> = update.entries().iter().map(|(k, i, _)| (*k, *i)).collect();
        assert_eq!(
            kinds,
            vec![(RT_ICON, 1), (RT_ICON, 2), (RT_GROUP_ICON, 1), (RT_MANIFEST, 1)]
        );
    }

    #[test]
    fn test_non_windows_stub() {
        #[cfg(not(target_os = "windows"))]
        {
            let update = ResourceUpdate {
                manifest: Some("<assembly/>".into()),
                icons: Vec::new(),
            };
            assert!(apply_resources(Path::new("test.exe"), &update).is_err());
            assert!(apply_resources(Path::new("test.exe"), &ResourceUpdate::default()).is_ok());
        }
    }
}
