//! Composite binary format
//!
//! A composite file is a base executable followed by a payload, an optional
//! image, a run of UTF-8 string fields and a fixed-size footer:
//!
//! ```text
//! [base][payload][image?][field 0..n][footer]
//! ```
//!
//! The footer is always read first and every other offset is derived
//! backward from it through [`layout::Layout`].

pub mod checksums;
pub mod constants;
pub mod extraction;
pub mod footer;
pub mod java_version;
pub mod layout;
pub mod reader;
pub mod strings;
pub mod verification;
pub mod writer;
pub mod zip_comment;

use std::path::Path;

pub use footer::{AttachFooter, CompositeFooter, FooterKind, JarFooter, LaunchMode, SplashLayout};
pub use layout::{Layout, Segment};
pub use reader::{AttachDescriptor, JarDescriptor, open_attached, open_jar};
pub use strings::LaunchStrings;
pub use verification::{Fingerprint, Verification};
pub use writer::{CompositeWriter, JarOptions, attach_exe, package_jar};

use crate::exceptions::Result;

/// Which composite format, if any, a file carries
///
/// Only the trailing magic is checked; opening the file with
/// [`open_jar`] or [`open_attached`] validates the layout.
pub fn detect_format(path: &Path) -> Result<Option<FooterKind>> {
    for family in [FooterKind::Jar, FooterKind::Attach] {
        if reader::verify_only(path, family)? {
            return reader::peek_kind(path, family.revisions());
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_format() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("base.exe");
        let extra = temp_dir.path().join("extra.bin");
        std::fs::write(&base, vec![0u8; 64]).unwrap();
        std::fs::write(&extra, vec![1u8; 16]).unwrap();

        assert_eq!(detect_format(&base).unwrap(), None);
        let attached = attach_exe(&base, &extra, None).unwrap();
        assert_eq!(detect_format(&attached).unwrap(), Some(FooterKind::Attach));

        let packaged = temp_dir.path().join("app.exe");
        package_jar(
            &base,
            &[2u8; 32],
            &[],
            &LaunchStrings::default(),
            &JarOptions::default(),
            &packaged,
        )
        .unwrap();
        assert_eq!(detect_format(&packaged).unwrap(), Some(FooterKind::Jar));

        let extended = temp_dir.path().join("splash.exe");
        package_jar(
            &base,
            &[2u8; 32],
            &[3u8; 8],
            &LaunchStrings::default(),
            &JarOptions {
                splash_layout: Some(SplashLayout::default()),
                ..JarOptions::default()
            },
            &extended,
        )
        .unwrap();
        assert_eq!(
            detect_format(&extended).unwrap(),
            Some(FooterKind::JarExtended)
        );
        assert!(detect_format(&temp_dir.path().join("absent")).is_err());
    }
}
