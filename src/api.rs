//! High-level API for jarpack operations

use log::info;
use std::path::{Path, PathBuf};

use crate::builder::{self, BuildOptions, BuildReport, PackageConfig};
use crate::cli::{format_attach_info, format_jar_info};
use crate::exceptions::{JarpackError, Result};
use crate::format::extraction::extract_segment;
use crate::format::verification::verify;
use crate::format::writer::strip_attachment;
use crate::format::{
    Fingerprint, FooterKind, Verification, attach_exe, detect_format, open_attached, open_jar,
};

/// Build a launcher package from a JSON config file
pub fn build_package(config_path: &Path, options: &BuildOptions) -> Result<BuildReport> {
    let config = PackageConfig::load(config_path)?;
    builder::build(&config, options)
}

/// Patch the executable named by `externalExePath` in a config file
pub fn modify_executable(config_path: &Path) -> Result<PathBuf> {
    let config = PackageConfig::load(config_path)?;
    builder::modify_external(&config)
}

/// Run the package carried by `executable`
pub fn launch_package(executable: &Path, args: &[String]) -> Result<()> {
    crate::launcher::run(executable, args)
}

/// Append `attachment` to `base`, in place unless `output` is given.
/// Returns the output path.
pub fn attach(base: &Path, attachment: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let written = attach_exe(base, attachment, Some(output.unwrap_or(base)))?;
    info!("📎 Attached {} to {}", attachment.display(), written.display());
    Ok(written)
}

/// Copy the attached binary out to `dest`. Returns the bytes written.
pub fn detach(composite: &Path, dest: &Path) -> Result<u64> {
    let descriptor = open_attached(composite)?;
    let written = extract_segment(composite, descriptor.layout.payload, dest)?;
    info!("📤 Detached {written} bytes to {}", dest.display());
    Ok(written)
}

/// Remove an attachment, in place or into `output`. Returns the bytes removed.
pub fn strip(path: &Path, output: Option<&Path>) -> Result<u64> {
    let removed = strip_attachment(path, output)?;
    info!("✂️ Removed {removed} bytes from {}", path.display());
    Ok(removed)
}

/// Info report for whichever composite format `path` carries
pub fn describe(path: &Path) -> Result<String> {
    match detect_format(path)? {
        Some(FooterKind::Jar | FooterKind::JarExtended) => Ok(format_jar_info(&open_jar(path)?)),
        Some(FooterKind::Attach) => Ok(format_attach_info(&open_attached(path)?)),
        None => Err(JarpackError::NotAComposite(path.display().to_string())),
    }
}

/// Check an extracted file against a fingerprint
pub fn verify_file(path: &Path, fingerprint: &Fingerprint) -> Verification {
    verify(path, fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::checksums::sha256_hex;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_attach_detach_strip() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("tool.exe");
        let payload = temp_dir.path().join("launcher.exe");
        fs::write(&base, vec![7u8; 300]).unwrap();
        fs::write(&payload, vec![9u8; 120]).unwrap();

        let attached = attach(&base, &payload, Some(&temp_dir.path().join("out.exe"))).unwrap();
        assert_eq!(attached, temp_dir.path().join("out.exe"));
        assert_eq!(fs::read(&base).unwrap(), vec![7u8; 300]);
        assert!(describe(&attached).unwrap().contains("Payload Size: 120 bytes"));

        let out = temp_dir.path().join("out.bin");
        assert_eq!(detach(&attached, &out).unwrap(), 120);
        assert_eq!(
            verify_file(&out, &Fingerprint::Sha256(sha256_hex(&[9u8; 120]))),
            Verification::Valid
        );

        assert_eq!(strip(&attached, None).unwrap(), 140);
        assert_eq!(fs::read(&attached).unwrap(), vec![7u8; 300]);
    }

    #[test]
    fn test_attach_defaults_to_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("tool.exe");
        let payload = temp_dir.path().join("launcher.exe");
        fs::write(&base, vec![7u8; 300]).unwrap();
        fs::write(&payload, vec![9u8; 120]).unwrap();

        assert_eq!(attach(&base, &payload, None).unwrap(), base);
        assert!(!temp_dir.path().join("tool_attached.exe").exists());
        assert_eq!(fs::metadata(&base).unwrap().len(), 300 + 120 + 20);

        // attaching again replaces the first attachment
        attach(&base, &payload, None).unwrap();
        assert_eq!(fs::metadata(&base).unwrap().len(), 300 + 120 + 20);
        let out = temp_dir.path().join("out.bin");
        assert_eq!(detach(&base, &out).unwrap(), 120);
    }

    #[test]
    fn test_describe_plain_file() {
        let temp_dir = TempDir::new().unwrap();
        let plain = temp_dir.path().join("plain.bin");
        fs::write(&plain, vec![0u8; 200]).unwrap();
        assert!(matches!(
            describe(&plain),
            Err(JarpackError::NotAComposite(_))
        ));
    }

    #[test]
    fn test_build_package_missing_config() {
        let temp_dir = TempDir::new().unwrap();
        let result = build_package(
            &temp_dir.path().join("missing.json"),
            &BuildOptions::default(),
        );
        assert!(matches!(result, Err(JarpackError::NotFound(_))));
        assert!(matches!(
            modify_executable(&temp_dir.path().join("missing.json")),
            Err(JarpackError::NotFound(_))
        ));
    }
}
