//! Java runtime discovery

use log::{debug, trace};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::exceptions::{JarpackError, Result};

#[cfg(windows)]
pub const JAVA_EXECUTABLE: &str = "java.exe";
#[cfg(not(windows))]
pub const JAVA_EXECUTABLE: &str = "java";

#[cfg(windows)]
pub const JVM_LIBRARY: &str = "jvm.dll";
#[cfg(target_os = "macos")]
pub const JVM_LIBRARY: &str = "libjvm.dylib";
#[cfg(not(any(windows, target_os = "macos")))]
pub const JVM_LIBRARY: &str = "libjvm.so";

/// Common install locations; each child directory is a candidate runtime
pub const KNOWN_ROOTS: &[&str] = &[
    r"C:\Program Files\Java",
    r"C:\Program Files (x86)\Java",
    r"C:\Program Files\Eclipse Adoptium",
    r"C:\Program Files\Amazon Corretto",
    r"C:\Program Files\Microsoft\jdk",
];

/// VM flavours under `bin`, in preference order
const VM_FLAVOURS: [&str; 2] = ["server", "client"];

/// Where to look for a Java runtime
#[derive(Debug, Clone, Default)]
pub struct RuntimeLocator {
    /// `javaPath` from the package, usually a runtime's `bin` directory
    pub java_path: Option<PathBuf>,
    pub java_home: Option<PathBuf>,
    pub search_path: bool,
    pub roots: Vec<PathBuf>,
}

impl RuntimeLocator {
    /// Locator using `JAVA_HOME`, `PATH` and the known install roots
    pub fn from_environment(java_path: &str) -> Self {
        let java_path = java_path.trim();
        RuntimeLocator {
            java_path: (!java_path.is_empty()).then(|| PathBuf::from(java_path)),
            java_home: env::var_os("JAVA_HOME")
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
            search_path: true,
            roots: KNOWN_ROOTS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Find the `java` executable
    pub fn java_executable(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.java_path {
            let candidate = dir.join(JAVA_EXECUTABLE);
            if candidate.is_file() {
                debug!("☕ java from javaPath: {}", candidate.display());
                return Ok(candidate);
            }
        }

        if let Some(home) = &self.java_home {
            let candidate = home.join("bin").join(JAVA_EXECUTABLE);
            if candidate.is_file() {
                debug!("☕ java from JAVA_HOME: {}", candidate.display());
                return Ok(candidate);
            }
        }

        if self.search_path {
            if let Ok(found) = which::which(JAVA_EXECUTABLE) {
                debug!("☕ java from PATH: {}", found.display());
                return Ok(found);
            }
        }

        for install in self.installations() {
            let candidate = install.join("bin").join(JAVA_EXECUTABLE);
            if candidate.is_file() {
                debug!("☕ java from install root: {}", candidate.display());
                return Ok(candidate);
            }
        }

        Err(JarpackError::RuntimeNotFound(format!(
            "no {JAVA_EXECUTABLE} in javaPath, JAVA_HOME, PATH or the standard install locations"
        )))
    }

    /// Find the JVM shared library, preferring the server VM
    pub fn jvm_library(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.java_path {
            if let Some(found) = flavoured_library(dir) {
                debug!("☕ JVM library from javaPath: {}", found.display());
                return Some(found);
            }
        }

        for install in self.installations() {
            if let Some(found) = flavoured_library(&install.join("bin")) {
                debug!("☕ JVM library from install root: {}", found.display());
                return Some(found);
            }
        }
        None
    }

    /// Child directories of every existing root, sorted per root
    fn installations(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for root in &self.roots {
            let Ok(entries) = fs::read_dir(root) else {
                continue;
            };
            let mut children: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_dir())
                .collect();
            children.sort();
            trace!("🔍 {} candidates under {}", children.len(), root.display());
            found.extend(children);
        }
        found
    }
}

fn flavoured_library(bin: &Path) -> Option<PathBuf> {
    VM_FLAVOURS
        .iter()
        .map(|flavour| bin.join(flavour).join(JVM_LIBRARY))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn isolated(roots: Vec<PathBuf>) -> RuntimeLocator {
        RuntimeLocator {
            roots,
            ..RuntimeLocator::default()
        }
    }

    #[test]
    fn test_java_path_wins() {
        let temp_dir = TempDir::new().unwrap();
        let bundled = temp_dir.path().join("jre").join("bin");
        let home = temp_dir.path().join("home");
        touch(&bundled.join(JAVA_EXECUTABLE));
        touch(&home.join("bin").join(JAVA_EXECUTABLE));

        let locator = RuntimeLocator {
            java_path: Some(bundled.clone()),
            java_home: Some(home.clone()),
            ..RuntimeLocator::default()
        };
        assert_eq!(locator.java_executable().unwrap(), bundled.join(JAVA_EXECUTABLE));

        let locator = RuntimeLocator {
            java_path: Some(temp_dir.path().join("missing")),
            java_home: Some(home.clone()),
            ..RuntimeLocator::default()
        };
        assert_eq!(
            locator.java_executable().unwrap(),
            home.join("bin").join(JAVA_EXECUTABLE)
        );
    }

    #[test]
    fn test_java_from_install_roots() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("Java");
        touch(&root.join("jdk-21").join("bin").join(JAVA_EXECUTABLE));
        fs::create_dir_all(root.join("empty-dir")).unwrap();

        let locator = isolated(vec![temp_dir.path().join("nowhere"), root.clone()]);
        assert_eq!(
            locator.java_executable().unwrap(),
            root.join("jdk-21").join("bin").join(JAVA_EXECUTABLE)
        );
    }

    #[test]
    fn test_no_runtime() {
        let temp_dir = TempDir::new().unwrap();
        let locator = isolated(vec![temp_dir.path().to_path_buf()]);
        assert!(matches!(
            locator.java_executable(),
            Err(JarpackError::RuntimeNotFound(_))
        ));
        assert_eq!(locator.jvm_library(), None);
    }

    #[test]
    fn test_server_preferred_over_client() {
        let temp_dir = TempDir::new().unwrap();
        let bin = temp_dir.path().join("jre").join("bin");
        touch(&bin.join("client").join(JVM_LIBRARY));

        let locator = RuntimeLocator {
            java_path: Some(bin.clone()),
            ..RuntimeLocator::default()
        };
        assert_eq!(locator.jvm_library(), Some(bin.join("client").join(JVM_LIBRARY)));

        touch(&bin.join("server").join(JVM_LIBRARY));
        assert_eq!(locator.jvm_library(), Some(bin.join("server").join(JVM_LIBRARY)));
    }

    #[test]
    fn test_library_from_install_roots() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("Eclipse Adoptium");
        let library = root
            .join("jdk-17")
            .join("bin")
            .join("server")
            .join(JVM_LIBRARY);
        touch(&library);

        let locator = RuntimeLocator {
            java_path: Some(temp_dir.path().join("not-here")),
            ..isolated(vec![root])
        };
        assert_eq!(locator.jvm_library(), Some(library));
    }

    #[test]
    fn test_from_environment_ignores_blank_java_path() {
        let locator = RuntimeLocator::from_environment("   ");
        assert_eq!(locator.java_path, None);
        assert!(locator.search_path);
        assert_eq!(locator.roots.len(), KNOWN_ROOTS.len());
    }
}
