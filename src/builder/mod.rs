//! jarpack package builder

pub mod launcher_stub;
pub mod manifest;

pub use launcher_stub::{LauncherStub, StubOrigin};
pub use manifest::PackageConfig;

use log::{debug, info, trace, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::exceptions::{JarpackError, Result};
use crate::format::layout::Layout;
use crate::format::writer::package_jar;
use crate::pe::{PeModifier, headers, is_pe_executable};
use crate::utils::current_timestamp_millis;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Options that do not belong in the config file
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Launcher binary, overriding the environment and the embedded stub
    pub launcher_bin: Option<PathBuf>,
    /// Fixed timestamp fingerprint; the current time when unset
    pub timestamp: Option<u64>,
}

/// What a finished build produced
#[derive(Debug)]
pub struct BuildReport {
    pub output: PathBuf,
    pub layout: Layout,
    pub launcher: StubOrigin,
    pub timestamp: u64,
    pub pe_patched: bool,
}

/// Build a launcher executable from `config`
pub fn build(config: &PackageConfig, options: &BuildOptions) -> Result<BuildReport> {
    let timer = Instant::now();
    info!("🔨 Building JAR launcher package");
    trace!("🔍 Build config: {config:?}");

    // Phase 1: validate
    config.validate()?;
    let jar_path = config
        .jar_path()
        .ok_or_else(|| JarpackError::ConfigError("jarPath is required".into()))?;
    let output = config
        .output_path()
        .ok_or_else(|| JarpackError::ConfigError("outputPath is required".into()))?;

    // Phase 2: resolve the launcher stub
    let host = std::env::current_exe()?;
    let stub = launcher_stub::resolve(options.launcher_bin.as_deref(), &host)?;

    // Phase 3: stage it and patch the PE headers
    let mut staged = tempfile::NamedTempFile::new()?;
    staged.write_all(&stub.data)?;
    staged.flush()?;
    let pe_patched = if is_pe_executable(&stub.data) {
        let pe_options = config.pe_options(headers::execution_level(&stub.data));
        PeModifier::new().modify(staged.path(), &pe_options)?;
        true
    } else {
        warn!("⚠️ Launcher is not a PE executable, skipping subsystem/manifest/icon changes");
        false
    };

    // Phase 4: inputs
    let image = match config.splash_image_path() {
        Some(path) => read_splash_image(&path)?,
        None => Vec::new(),
    };
    let jar = fs::read(&jar_path)
        .map_err(|e| JarpackError::NotFound(format!("{}: {e}", jar_path.display())))?;
    debug!("☕ JAR {} ({} bytes)", jar_path.display(), jar.len());

    // Phase 5: write
    let timestamp = options.timestamp.unwrap_or_else(current_timestamp_millis);
    let layout = package_jar(
        staged.path(),
        &jar,
        &image,
        &config.launch_strings(),
        &config.jar_options(timestamp)?,
        &output,
    )?;

    // Phase 6: report
    info!(
        "✅ Package written to {} ({} bytes) in {:?}",
        output.display(),
        layout.total_size(),
        timer.elapsed()
    );
    Ok(BuildReport {
        output,
        layout,
        launcher: stub.origin,
        timestamp,
        pe_patched,
    })
}

fn read_splash_image(path: &Path) -> Result<Vec<u8>> {
    let data = fs::read(path)
        .map_err(|e| JarpackError::NotFound(format!("splash image {}: {e}", path.display())))?;
    if !data.starts_with(PNG_SIGNATURE) {
        warn!(
            "⚠️ Splash image {} is not a PNG; the launcher may not display it",
            path.display()
        );
    }
    Ok(data)
}

/// Patch an existing executable (`externalExePath`) with the config's
/// subsystem, execution level and icon
pub fn modify_external(config: &PackageConfig) -> Result<PathBuf> {
    let path = config
        .external_exe_path()
        .ok_or_else(|| JarpackError::ConfigError("externalExePath is required".into()))?;
    let data = fs::read(&path)
        .map_err(|e| JarpackError::NotFound(format!("{}: {e}", path.display())))?;
    if !is_pe_executable(&data) {
        return Err(JarpackError::PeError(format!(
            "{} is not a PE executable",
            path.display()
        )));
    }

    let pe_options = config.pe_options(headers::execution_level(&data));
    PeModifier::new().modify(&path, &pe_options)?;
    info!("✅ Modified {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::reader::{open_jar, read_image};
    use crate::format::zip_comment::tests::fake_zip;
    use crate::pe::Subsystem;
    use crate::pe::headers::tests::minimal_pe;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> PackageConfig {
        let jar = dir.join("app.jar");
        fs::write(&jar, fake_zip(400, b"")).unwrap();
        PackageConfig {
            jar_path: jar.to_string_lossy().to_string(),
            output_path: dir.join("app.exe").to_string_lossy().to_string(),
            main_class: "com.example.Main".into(),
            jvm_args: vec!["-Xmx256m".into()],
            launch_time: 1500,
            ..PackageConfig::default()
        }
    }

    #[test]
    fn test_build_with_plain_stub() {
        let temp_dir = TempDir::new().unwrap();
        let stub = temp_dir.path().join("launcher.bin");
        fs::write(&stub, vec![0xC3; 100]).unwrap();
        let config = config_in(temp_dir.path());

        let report = build(
            &config,
            &BuildOptions {
                launcher_bin: Some(stub.clone()),
                timestamp: Some(77),
            },
        )
        .unwrap();
        assert!(!report.pe_patched);
        assert_eq!(report.launcher, StubOrigin::Explicit(stub));
        assert_eq!(report.layout.payload.offset, 100);

        let descriptor = open_jar(&report.output).unwrap();
        assert_eq!(descriptor.footer.timestamp, 77);
        assert_eq!(descriptor.footer.launch_time_ms, 1500);
        assert_eq!(descriptor.strings.main_class, "com.example.Main");
    }

    #[test]
    fn test_build_patches_pe_stub_and_embeds_splash() {
        let temp_dir = TempDir::new().unwrap();
        let stub = temp_dir.path().join("launcher.exe");
        fs::write(&stub, minimal_pe(true)).unwrap();
        let splash = temp_dir.path().join("splash.png");
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&[0u8; 24]);
        fs::write(&splash, &png).unwrap();

        let mut config = config_in(temp_dir.path());
        config.enable_splash = true;
        config.splash_image_path = splash.to_string_lossy().to_string();
        config.splash_program_name = "Demo".into();

        let report = build(
            &config,
            &BuildOptions {
                launcher_bin: Some(stub.clone()),
                timestamp: None,
            },
        )
        .unwrap();
        assert!(report.pe_patched);

        let output = fs::read(&report.output).unwrap();
        let base_len = report.layout.payload.offset as usize;
        assert_eq!(headers::subsystem(&output[..base_len]).unwrap(), Subsystem::Gui);
        // the original stub is untouched
        assert_eq!(fs::read(&stub).unwrap(), minimal_pe(true));

        let descriptor = open_jar(&report.output).unwrap();
        assert_eq!(read_image(&descriptor).unwrap(), png);
        assert_eq!(descriptor.strings.splash_name, "Demo");
    }

    #[test]
    fn test_modify_external_requires_pe() {
        let temp_dir = TempDir::new().unwrap();
        let exe = temp_dir.path().join("tool.exe");
        fs::write(&exe, b"#!/bin/sh").unwrap();
        let config = PackageConfig {
            external_exe_path: exe.to_string_lossy().to_string(),
            ..PackageConfig::default()
        };
        assert!(matches!(
            modify_external(&config),
            Err(JarpackError::PeError(_))
        ));

        fs::write(&exe, minimal_pe(false)).unwrap();
        let config = PackageConfig {
            show_console: true,
            ..config
        };
        modify_external(&config).unwrap();
        assert_eq!(
            headers::subsystem(&fs::read(&exe).unwrap()).unwrap(),
            Subsystem::Console
        );
    }
}
