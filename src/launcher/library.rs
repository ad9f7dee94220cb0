//! Dynamically loaded runtime library, released when dropped

use std::ffi::c_void;
use std::path::{Path, PathBuf};

use crate::exceptions::{JarpackError, Result};

/// A loaded shared library. The handle is released on drop, so every exit
/// path of a caller frees it.
#[derive(Debug)]
pub struct DynamicLibrary {
    path: PathBuf,
    handle: platform::Handle,
}

impl DynamicLibrary {
    /// Load the library at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let handle = platform::open(path).map_err(|reason| {
            JarpackError::LibraryLoadFailed(format!("{}: {reason}", path.display()))
        })?;
        log::debug!("📚 Loaded {}", path.display());
        Ok(DynamicLibrary {
            path: path.to_path_buf(),
            handle,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Address of an exported symbol, if present
    pub fn symbol(&self, name: &str) -> Option<*mut c_void> {
        platform::symbol(&self.handle, name)
    }
}

impl Drop for DynamicLibrary {
    fn drop(&mut self) {
        platform::close(&self.handle);
        log::trace!("📚 Released {}", self.path.display());
    }
}

#[cfg(windows)]
#[allow(unsafe_code)] // Required for Windows API FFI calls
mod platform {
    use std::ffi::{CString, c_void};
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use windows::Win32::Foundation::{FreeLibrary, HMODULE};
    use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
    use windows::core::{PCSTR, PCWSTR};

    pub(super) type Handle = HMODULE;

    pub(super) fn open(path: &Path) -> Result<Handle, String> {
        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();
        unsafe { LoadLibraryW(PCWSTR(wide_path.as_ptr())) }.map_err(|e| e.to_string())
    }

    pub(super) fn symbol(handle: &Handle, name: &str) -> Option<*mut c_void> {
        let name = CString::new(name).ok()?;
        let address = unsafe { GetProcAddress(*handle, PCSTR(name.as_ptr() as *const u8)) }?;
        Some(address as *mut c_void)
    }

    pub(super) fn close(handle: &Handle) {
        let _ = unsafe { FreeLibrary(*handle) };
    }
}

#[cfg(unix)]
#[allow(unsafe_code)] // Required for dlopen FFI calls
mod platform {
    use std::ffi::{CStr, CString, c_void};
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    #[derive(Debug)]
    pub(super) struct Handle(*mut c_void);

    fn last_error() -> String {
        let message = unsafe { libc::dlerror() };
        if message.is_null() {
            "unknown dlopen error".to_string()
        } else {
            unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
        }
    }

    pub(super) fn open(path: &Path) -> Result<Handle, String> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| e.to_string())?;
        let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        if handle.is_null() {
            return Err(last_error());
        }
        Ok(Handle(handle))
    }

    pub(super) fn symbol(handle: &Handle, name: &str) -> Option<*mut c_void> {
        let name = CString::new(name).ok()?;
        let address = unsafe { libc::dlsym(handle.0, name.as_ptr()) };
        (!address.is_null()).then_some(address)
    }

    pub(super) fn close(handle: &Handle) {
        unsafe {
            libc::dlclose(handle.0);
        }
    }
}
