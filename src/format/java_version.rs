// src/format/java_version.rs
// Human Java version strings <-> JNI version tags.

/// Tag for an unknown or unspecified version
pub const UNSPECIFIED: u32 = 0;

const VERSION_TABLE: &[(&str, u32)] = &[
    ("1.1", 0x0001_0001),
    ("1.2", 0x0001_0002),
    ("1.4", 0x0001_0004),
    ("1.6", 0x0001_0006),
    ("1.8", 0x0001_0008),
    ("9", 0x0009_0000),
    ("10", 0x000a_0000),
    ("19", 0x0013_0000),
    ("20", 0x0014_0000),
    ("21", 0x0015_0000),
];

/// Map a version string such as `"1.8"` or `"21"` to its tag.
/// Unknown strings map to [`UNSPECIFIED`].
pub fn tag_for(version: &str) -> u32 {
    let version = version.trim();
    VERSION_TABLE
        .iter()
        .find(|(name, _)| *name == version)
        .map_or(UNSPECIFIED, |(_, tag)| *tag)
}

/// Reverse lookup for display
pub fn name_for(tag: u32) -> Option<&'static str> {
    VERSION_TABLE
        .iter()
        .find(|(_, t)| *t == tag)
        .map(|(name, _)| *name)
}

/// Display form used by the info report
pub fn display(tag: u32) -> String {
    match name_for(tag) {
        Some(name) => name.to_string(),
        None if tag == UNSPECIFIED => "(unspecified)".to_string(),
        None => format!("unknown ({tag:#010x})"),
    }
}
