//! Package configuration file for jarpack builds

use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::exceptions::{JarpackError, Result};
use crate::format::java_version;
use crate::format::writer::JarOptions;
use crate::format::{LaunchMode, LaunchStrings, SplashLayout};
use crate::pe::{ExecutionLevel, PeOptions, Subsystem};

/// Build configuration, stored as camelCase JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageConfig {
    pub jar_path: String,
    pub output_path: String,
    pub jvm_args: Vec<String>,
    pub program_args: Vec<String>,
    pub java_path: String,
    pub jar_extract_path: String,
    /// 0 = java.exe process, 1 = in-process JVM
    pub launch_mode: u32,
    /// Version name such as "1.8" or "21", or a raw JNI version tag
    pub java_version: String,
    pub main_class: String,
    pub enable_splash: bool,
    pub splash_image_path: String,
    pub splash_show_progress: bool,
    pub splash_show_progress_text: bool,
    /// Estimated startup time in milliseconds
    #[serde(deserialize_with = "int_or_string")]
    pub launch_time: i32,
    pub splash_program_name: String,
    pub splash_program_version: String,
    pub icon_path: String,
    pub show_console: bool,
    pub require_admin: bool,
    /// Executable patched by `jarpack-builder modify`
    pub external_exe_path: String,
    /// Text placement on the splash; stored only when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splash_layout: Option<SplashLayout>,
}

/// Accept `3000` as well as `"3000"`; anything unparsable becomes 0
fn int_or_string<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Text(String),
    }

    Ok(match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(v) => i32::try_from(v).unwrap_or(0),
        IntOrString::Text(s) => s.trim().parse().unwrap_or(0),
    })
}

fn non_empty(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    (!value.is_empty()).then(|| PathBuf::from(value))
}

impl PackageConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .map_err(|e| JarpackError::NotFound(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&data)
            .map_err(|e| JarpackError::ConfigError(format!("{}: {e}", path.display())))
    }

    /// Save as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)
            .map_err(|e| JarpackError::WriteFailed(format!("{}: {e}", path.display())))
    }

    pub fn launch_mode(&self) -> Result<LaunchMode> {
        LaunchMode::from_u32(self.launch_mode)
            .map_err(|_| JarpackError::ConfigError(format!("unknown launchMode {}", self.launch_mode)))
    }

    /// JNI version tag for `javaVersion`
    pub fn java_version_tag(&self) -> u32 {
        let tag = java_version::tag_for(&self.java_version);
        if tag != java_version::UNSPECIFIED {
            return tag;
        }
        self.java_version.trim().parse().unwrap_or(java_version::UNSPECIFIED)
    }

    pub fn jar_path(&self) -> Option<PathBuf> {
        non_empty(&self.jar_path)
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        non_empty(&self.output_path)
    }

    /// Splash image, only when the splash is enabled
    pub fn splash_image_path(&self) -> Option<PathBuf> {
        if self.enable_splash {
            non_empty(&self.splash_image_path)
        } else {
            None
        }
    }

    pub fn icon_path(&self) -> Option<PathBuf> {
        non_empty(&self.icon_path)
    }

    pub fn external_exe_path(&self) -> Option<PathBuf> {
        non_empty(&self.external_exe_path)
    }

    /// Check everything needed to build a package
    pub fn validate(&self) -> Result<()> {
        let jar = self.jar_path().ok_or_else(|| {
            JarpackError::ConfigError("jarPath and outputPath are required".into())
        })?;
        if self.output_path().is_none() {
            return Err(JarpackError::ConfigError(
                "jarPath and outputPath are required".into(),
            ));
        }

        if self.launch_mode()? == LaunchMode::DirectRuntimeLoad
            && (self.main_class.trim().is_empty() || self.java_version.trim().is_empty())
        {
            return Err(JarpackError::ConfigError(
                "direct_jvm mode needs mainClass and javaVersion".into(),
            ));
        }

        if let Some(image) = self.splash_image_path() {
            if !image.exists() {
                return Err(JarpackError::NotFound(format!(
                    "splash image {}",
                    image.display()
                )));
            }
        }

        if !jar.exists() {
            return Err(JarpackError::NotFound(format!("JAR {}", jar.display())));
        }
        Ok(())
    }

    /// Strings stored in the package; splash texts only with the splash enabled
    pub fn launch_strings(&self) -> LaunchStrings {
        let splash_text = |value: &str| {
            if self.enable_splash {
                value.trim().to_string()
            } else {
                String::new()
            }
        };
        LaunchStrings {
            main_class: self.main_class.trim().to_string(),
            jvm_args: self.jvm_args.clone(),
            program_args: self.program_args.clone(),
            java_path: self.java_path.trim().to_string(),
            extract_path: self.jar_extract_path.trim().to_string(),
            splash_name: splash_text(&self.splash_program_name),
            splash_version: splash_text(&self.splash_program_version),
        }
    }

    /// Footer settings for a build stamped with `timestamp`
    pub fn jar_options(&self, timestamp: u64) -> Result<JarOptions> {
        Ok(JarOptions {
            show_progress: self.splash_show_progress,
            show_progress_text: self.splash_show_progress_text,
            launch_time_ms: self.launch_time,
            timestamp,
            java_version: self.java_version_tag(),
            launch_mode: self.launch_mode()?,
            splash_layout: self.splash_layout.filter(|_| self.enable_splash),
        })
    }

    /// PE changes for an executable whose manifest currently requests
    /// `current`. The execution level is only rewritten when it changes.
    pub fn pe_options(&self, current: Option<ExecutionLevel>) -> PeOptions {
        let wanted = if self.require_admin {
            ExecutionLevel::RequireAdministrator
        } else {
            ExecutionLevel::AsInvoker
        };
        PeOptions {
            subsystem: Some(if self.show_console {
                Subsystem::Console
            } else {
                Subsystem::Gui
            }),
            execution_level: (current.unwrap_or_default() != wanted).then_some(wanted),
            icon: self.icon_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_camel_case_config() {
        let json = r#"{
            "jarPath": "app.jar",
            "outputPath": "app.exe",
            "jvmArgs": ["-Xmx256m"],
            "programArgs": [],
            "launchMode": 1,
            "javaVersion": "21",
            "mainClass": "com.example.Main",
            "launchTime": "3000",
            "showConsole": true
        }"#;
        let config: PackageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.jar_path, "app.jar");
        assert_eq!(config.jvm_args, vec!["-Xmx256m"]);
        assert_eq!(config.launch_time, 3000);
        assert_eq!(config.java_version_tag(), 0x0015_0000);
        assert_eq!(config.launch_mode().unwrap(), LaunchMode::DirectRuntimeLoad);
        assert!(!config.enable_splash);
    }

    #[test]
    fn test_launch_time_accepts_number_and_garbage() {
        let config: PackageConfig = serde_json::from_str(r#"{"launchTime": 2500}"#).unwrap();
        assert_eq!(config.launch_time, 2500);
        let config: PackageConfig = serde_json::from_str(r#"{"launchTime": "soon"}"#).unwrap();
        assert_eq!(config.launch_time, 0);
    }

    #[test]
    fn test_java_version_raw_tag() {
        let config = PackageConfig {
            java_version: "65544".into(),
            ..PackageConfig::default()
        };
        assert_eq!(config.java_version_tag(), 0x0001_0008);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("jarpack.json");
        let config = PackageConfig {
            jar_path: "a.jar".into(),
            launch_time: 1200,
            require_admin: true,
            ..PackageConfig::default()
        };
        config.save(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"requireAdmin\": true"));
        assert_eq!(PackageConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_validate() {
        let temp_dir = TempDir::new().unwrap();
        let jar = temp_dir.path().join("app.jar");
        fs::write(&jar, b"PK").unwrap();

        let mut config = PackageConfig {
            jar_path: jar.to_string_lossy().to_string(),
            output_path: "out.exe".into(),
            ..PackageConfig::default()
        };
        assert!(config.validate().is_ok());

        config.launch_mode = 1;
        assert!(matches!(config.validate(), Err(JarpackError::ConfigError(_))));
        config.main_class = "Main".into();
        config.java_version = "1.8".into();
        assert!(config.validate().is_ok());

        config.enable_splash = true;
        config.splash_image_path = "missing.png".into();
        assert!(matches!(config.validate(), Err(JarpackError::NotFound(_))));

        config.output_path = String::new();
        assert!(matches!(config.validate(), Err(JarpackError::ConfigError(_))));
    }

    #[test]
    fn test_splash_strings_only_when_enabled() {
        let mut config = PackageConfig {
            splash_program_name: "Demo".into(),
            splash_program_version: "1.0".into(),
            ..PackageConfig::default()
        };
        assert_eq!(config.launch_strings().splash_name, "");
        config.enable_splash = true;
        assert_eq!(config.launch_strings().splash_name, "Demo");
    }

    #[test]
    fn test_pe_options_only_change_level_when_needed() {
        let config = PackageConfig::default();
        let options = config.pe_options(None);
        assert_eq!(options.subsystem, Some(Subsystem::Gui));
        assert_eq!(options.execution_level, None);

        let admin = PackageConfig {
            require_admin: true,
            show_console: true,
            ..PackageConfig::default()
        };
        let options = admin.pe_options(Some(ExecutionLevel::AsInvoker));
        assert_eq!(options.subsystem, Some(Subsystem::Console));
        assert_eq!(options.execution_level, Some(ExecutionLevel::RequireAdministrator));
        assert_eq!(
            admin
                .pe_options(Some(ExecutionLevel::RequireAdministrator))
                .execution_level,
            None
        );
    }
}
