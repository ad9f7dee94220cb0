//! Platform file attributes for extracted side files
//!
//! On Windows the extracted JAR is marked hidden, and hidden/readonly are
//! cleared before it is overwritten. Elsewhere only readonly is meaningful.

use std::fs;
use std::io;
use std::path::Path;

#[cfg(windows)]
#[allow(unsafe_code)] // Required for Windows API FFI calls
mod platform {
    use std::io;
    use std::path::Path;
    use windows::Win32::Storage::FileSystem::{
        FILE_ATTRIBUTE_HIDDEN, FILE_ATTRIBUTE_NORMAL, FILE_FLAGS_AND_ATTRIBUTES,
        GetFileAttributesW, INVALID_FILE_ATTRIBUTES, SetFileAttributesW,
    };
    use windows::core::PCWSTR;

    fn wide(path: &Path) -> Vec<u16> {
        use std::os::windows::ffi::OsStrExt;
        path.as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    pub(super) fn clear(path: &Path) -> io::Result<()> {
        let wide_path = wide(path);
        unsafe { SetFileAttributesW(PCWSTR(wide_path.as_ptr()), FILE_ATTRIBUTE_NORMAL) }
            .map_err(|e| io::Error::other(format!("SetFileAttributesW failed: {e}")))
    }

    pub(super) fn hide(path: &Path) -> io::Result<()> {
        let wide_path = wide(path);
        let current = unsafe { GetFileAttributesW(PCWSTR(wide_path.as_ptr())) };
        if current == INVALID_FILE_ATTRIBUTES {
            return Err(io::Error::last_os_error());
        }
        let hidden = FILE_FLAGS_AND_ATTRIBUTES(current) | FILE_ATTRIBUTE_HIDDEN;
        unsafe { SetFileAttributesW(PCWSTR(wide_path.as_ptr()), hidden) }
            .map_err(|e| io::Error::other(format!("SetFileAttributesW failed: {e}")))
    }
}

#[cfg(not(windows))]
mod platform {
    use std::io;
    use std::path::Path;

    pub(super) fn clear(_path: &Path) -> io::Result<()> {
        Ok(())
    }

    pub(super) fn hide(_path: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Clear hidden and readonly on an existing file so it can be overwritten.
/// A missing file is not an error.
pub fn clear_protective_attributes(path: &Path) -> io::Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    platform::clear(path)?;

    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

/// Mark a file hidden (no-op where the platform has no such attribute)
pub fn set_hidden(path: &Path) -> io::Result<()> {
    platform::hide(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_clear_missing_file_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        assert!(clear_protective_attributes(&temp_dir.path().join("absent.jar")).is_ok());
    }

    #[test]
    fn test_clear_readonly_allows_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.jar");
        fs::write(&path, b"old").unwrap();

        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions).unwrap();

        clear_protective_attributes(&path).unwrap();
        assert!(!fs::metadata(&path).unwrap().permissions().readonly());
        fs::write(&path, b"new").unwrap();
    }

    #[test]
    fn test_set_hidden_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.jar");
        fs::write(&path, b"jar").unwrap();
        set_hidden(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"jar");
    }
}
