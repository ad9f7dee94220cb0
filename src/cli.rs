//! Human-readable reports for the `info` commands

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use crate::format::strings::join_args;
use crate::format::{AttachDescriptor, CompositeFooter, JarDescriptor, java_version};
use crate::pe::PeInfo;

const UNSPECIFIED: &str = "(unspecified)";

fn or_unspecified(value: &str) -> &str {
    if value.trim().is_empty() {
        UNSPECIFIED
    } else {
        value
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn args_line(args: &[String]) -> String {
    if args.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        join_args(args).replace('\n', " ")
    }
}

/// Millisecond timestamp plus its UTC date when it is plausible
fn timestamp_line(timestamp: u64) -> String {
    let as_date = i64::try_from(timestamp)
        .ok()
        .filter(|ms| *ms > 0)
        .and_then(DateTime::<Utc>::from_timestamp_millis);
    match as_date {
        Some(date) => format!("{timestamp} ({})", date.format("%Y-%m-%d %H:%M:%S UTC")),
        None => timestamp.to_string(),
    }
}

/// Sectioned report of a JAR package footer
pub fn format_jar_info(descriptor: &JarDescriptor) -> String {
    let footer = &descriptor.footer;
    let strings = &descriptor.strings;
    let mut out = String::new();

    let _ = writeln!(out, "📦 Package: {}", descriptor.path.display());
    let _ = writeln!(out, "  Format: {}", footer.kind());
    let _ = writeln!(out, "  File Size: {} bytes", descriptor.file_size);
    let _ = writeln!(out);

    let _ = writeln!(out, "☕ JAR:");
    let _ = writeln!(out, "  Offset: {}", footer.payload_offset);
    let _ = writeln!(out, "  Size: {} bytes", footer.payload_size);
    let _ = writeln!(out, "  Timestamp: {}", timestamp_line(footer.timestamp));
    let _ = writeln!(out);

    let _ = writeln!(out, "🚀 Launch:");
    let _ = writeln!(out, "  Launch Mode: {}", footer.launch_mode.label());
    let _ = writeln!(out, "  Java Version: {}", java_version::display(footer.java_version));
    let _ = writeln!(out, "  Main Class: {}", or_unspecified(&strings.main_class));
    let _ = writeln!(out, "  Java Path: {}", or_unspecified(&strings.java_path));
    let _ = writeln!(out, "  Extract Path: {}", or_unspecified(&strings.extract_path));
    let _ = writeln!(out, "  JVM Args: {}", args_line(&strings.jvm_args));
    let _ = writeln!(out, "  Program Args: {}", args_line(&strings.program_args));
    let _ = writeln!(out);

    let _ = writeln!(out, "🖼️ Splash:");
    if footer.image_size == 0 {
        let _ = writeln!(out, "  Image: none");
    } else {
        let _ = writeln!(out, "  Image: {} bytes", footer.image_size);
    }
    let _ = writeln!(out, "  Program Name: {}", or_unspecified(&strings.splash_name));
    let _ = writeln!(out, "  Program Version: {}", or_unspecified(&strings.splash_version));
    let _ = writeln!(out, "  Show Progress: {}", yes_no(footer.show_progress));
    let _ = writeln!(out, "  Show Progress Text: {}", yes_no(footer.show_progress_text));
    let _ = writeln!(out, "  Launch Time: {} ms", footer.launch_time_ms);
    if let Some(layout) = &footer.splash_layout {
        let _ = writeln!(
            out,
            "  Layout: title ({}, {}) {}%, version ({}, {}) {}%, status ({}, {}) {}%",
            layout.title_x,
            layout.title_y,
            layout.title_font,
            layout.version_x,
            layout.version_y,
            layout.version_font,
            layout.status_x,
            layout.status_y,
            layout.status_font
        );
    }

    out.trim_end().to_string()
}

/// Report of a generic attachment
pub fn format_attach_info(descriptor: &AttachDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "📎 Attachment: {}", descriptor.path.display());
    let _ = writeln!(out, "  File Size: {} bytes", descriptor.file_size);
    let _ = writeln!(out, "  Base Size: {} bytes", descriptor.layout.base.size);
    let _ = writeln!(out, "  Payload Offset: {}", descriptor.footer.payload_offset);
    let _ = write!(out, "  Payload Size: {} bytes", descriptor.footer.payload_size);
    out
}

/// Report of an executable's PE headers
pub fn format_pe_info(info: &PeInfo) -> String {
    let level = info
        .execution_level
        .map_or("(no manifest)", |level| level.as_str());
    let mut out = String::new();
    let _ = writeln!(out, "🪟 Executable:");
    let _ = writeln!(
        out,
        "  Format: {}",
        if info.pe32_plus { "PE32+" } else { "PE32" }
    );
    let _ = writeln!(out, "  Subsystem: {}", info.subsystem);
    let _ = writeln!(out, "  Execution Level: {level}");
    let _ = writeln!(out, "  Image Size: {} bytes", info.image_size);
    let _ = write!(out, "  Overlay: {} bytes", info.overlay_size());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::writer::{JarOptions, attach_exe, package_jar};
    use crate::format::zip_comment::tests::fake_zip;
    use crate::format::{LaunchMode, LaunchStrings, SplashLayout, open_attached, open_jar};
    use crate::pe::{ExecutionLevel, Subsystem};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_jar_info_sections() {
        let temp_dir = TempDir::new().unwrap();
        let stub = temp_dir.path().join("stub.exe");
        fs::write(&stub, vec![0u8; 100]).unwrap();
        let output = temp_dir.path().join("app.exe");
        let strings = LaunchStrings {
            main_class: "Main".into(),
            jvm_args: vec!["-Xmx1g".into(), "-Da=b".into()],
            ..LaunchStrings::default()
        };
        let options = JarOptions {
            launch_time_ms: 3000,
            timestamp: 1_700_000_000_000,
            java_version: 0x0015_0000,
            launch_mode: LaunchMode::DirectRuntimeLoad,
            show_progress: true,
            ..JarOptions::default()
        };
        package_jar(&stub, &fake_zip(500, b""), &[], &strings, &options, &output).unwrap();

        let info = format_jar_info(&open_jar(&output).unwrap());
        assert!(info.contains("  Offset: 100"));
        assert!(info.contains("  Size: 522 bytes"));
        assert!(info.contains("Launch Mode: direct_jvm"));
        assert!(info.contains("Java Version: 21"));
        assert!(info.contains("Main Class: Main"));
        assert!(info.contains("Java Path: (unspecified)"));
        assert!(info.contains("JVM Args: -Xmx1g -Da=b"));
        assert!(info.contains("Program Args: (unspecified)"));
        assert!(info.contains("Image: none"));
        assert!(info.contains("Show Progress: yes"));
        assert!(info.contains("Launch Time: 3000 ms"));
        assert!(info.contains("1700000000000 (2023-11-14 22:13:20 UTC)"));
        assert!(!info.contains("Layout:"));
    }

    #[test]
    fn test_jar_info_shows_layout() {
        let temp_dir = TempDir::new().unwrap();
        let stub = temp_dir.path().join("stub.exe");
        fs::write(&stub, vec![0u8; 10]).unwrap();
        let output = temp_dir.path().join("app.exe");
        let options = JarOptions {
            splash_layout: Some(SplashLayout::default()),
            ..JarOptions::default()
        };
        package_jar(
            &stub,
            &fake_zip(10, b""),
            b"image",
            &LaunchStrings::default(),
            &options,
            &output,
        )
        .unwrap();

        let info = format_jar_info(&open_jar(&output).unwrap());
        assert!(info.contains("Format: jar+layout"));
        assert!(info.contains("Image: 5 bytes"));
        assert!(info.contains("Layout: title (50, 40) 12%"));
        assert!(info.contains("Timestamp: 0\n"));
    }

    #[test]
    fn test_attach_info() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("base.exe");
        let payload = temp_dir.path().join("payload.bin");
        fs::write(&base, vec![1u8; 64]).unwrap();
        fs::write(&payload, vec![2u8; 32]).unwrap();
        let attached = attach_exe(&base, &payload, None).unwrap();

        let info = format_attach_info(&open_attached(&attached).unwrap());
        assert!(info.contains("File Size: 116 bytes"));
        assert!(info.contains("Payload Offset: 64"));
        assert!(info.contains("Payload Size: 32 bytes"));
    }

    #[test]
    fn test_pe_info() {
        let info = PeInfo {
            file_size: 2048,
            image_size: 1024,
            subsystem: Subsystem::Gui,
            pe32_plus: true,
            execution_level: Some(ExecutionLevel::RequireAdministrator),
        };
        let text = format_pe_info(&info);
        assert!(text.contains("Format: PE32+"));
        assert!(text.contains("Execution Level: requireAdministrator"));
        assert!(text.contains("Overlay: 1024 bytes"));
    }
}
