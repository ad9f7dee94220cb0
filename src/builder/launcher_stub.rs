//! Locating the launcher executable a package is built on

use log::{debug, info};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::exceptions::{JarpackError, Result};
use crate::format::reader::read_payload;

/// Environment variable naming a launcher binary
pub const LAUNCHER_BIN_ENV: &str = "JARPACK_LAUNCHER_BIN";

/// Where the launcher bytes came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubOrigin {
    /// `--launcher-bin`
    Explicit(PathBuf),
    /// `JARPACK_LAUNCHER_BIN`
    Environment(PathBuf),
    /// Attached to the builder executable itself
    Embedded(PathBuf),
}

impl fmt::Display for StubOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StubOrigin::Explicit(p) => write!(f, "{} (--launcher-bin)", p.display()),
            StubOrigin::Environment(p) => write!(f, "{} ({LAUNCHER_BIN_ENV})", p.display()),
            StubOrigin::Embedded(p) => write!(f, "attached to {}", p.display()),
        }
    }
}

/// Launcher bytes plus their origin
#[derive(Debug)]
pub struct LauncherStub {
    pub origin: StubOrigin,
    pub data: Vec<u8>,
}

fn read_stub(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        JarpackError::NotFound(format!("launcher '{}': {e}", path.display()))
    })
}

/// Resolve the launcher: explicit path, then the environment, then the
/// attachment carried by `host` (normally the running builder).
pub fn resolve(explicit: Option<&Path>, host: &Path) -> Result<LauncherStub> {
    let stub = if let Some(path) = explicit {
        LauncherStub {
            data: read_stub(path)?,
            origin: StubOrigin::Explicit(path.to_path_buf()),
        }
    } else if let Ok(value) = env::var(LAUNCHER_BIN_ENV).map(PathBuf::from) {
        LauncherStub {
            data: read_stub(&value)?,
            origin: StubOrigin::Environment(value),
        }
    } else {
        debug!("Looking for a launcher attached to {}", host.display());
        let data = read_payload(host).map_err(|e| {
            JarpackError::NotFound(format!(
                "no launcher: pass --launcher-bin, set {LAUNCHER_BIN_ENV}, or attach one to {} ({e})",
                host.display()
            ))
        })?;
        LauncherStub {
            data,
            origin: StubOrigin::Embedded(host.to_path_buf()),
        }
    };

    info!("🚀 Launcher {} ({} bytes)", stub.origin, stub.data.len());
    Ok(stub)
}
