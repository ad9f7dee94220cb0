// src/format/constants.rs
// Fixed format constants. Changing any of these breaks every existing package.

// Footer magics, little-endian u32 of the ASCII bytes
pub const ATTACH_MAGIC: u32 = 0x6578_6546; // "Fexe"
pub const JAR_MAGIC: u32 = 0x4A41_5246; // "FRAJ"
pub const JAR_EXTENDED_MAGIC: u32 = 0x324A_5246; // "FRJ2", carries splash layout

// Fixed footer sizes
pub const ATTACH_FOOTER_SIZE: usize = 4 + 8 + 8;
pub const JAR_FOOTER_SIZE: usize = 4 + 8 + 8 + 8 + 1 + 1 + 4 + 8 + 4 + STRING_FIELD_COUNT * 4 + 4;
pub const SPLASH_LAYOUT_SIZE: usize = 9 * 4;
pub const JAR_EXTENDED_FOOTER_SIZE: usize = JAR_FOOTER_SIZE + SPLASH_LAYOUT_SIZE;

// mainClass, jvmArgs, programArgs, javaPath, extractPath, splashName, splashVersion
pub const STRING_FIELD_COUNT: usize = 7;

// Separator for the argument blobs
pub const ARG_SEPARATOR: char = '\n';

// ZIP End Of Central Directory
pub const EOCD_SIGNATURE: u32 = 0x0605_4b50;
pub const EOCD_MIN_SIZE: usize = 22;
pub const EOCD_COMMENT_LENGTH_OFFSET: usize = 20;
pub const EOCD_MAX_SEARCH: usize = EOCD_MIN_SIZE + u16::MAX as usize; // 65557

// Timestamp record written as the ZIP comment of extracted JARs
pub const FINGERPRINT_RECORD_SIZE: usize = 8;

// Streaming window for extraction and hashing
pub const COPY_CHUNK_SIZE: usize = 1024 * 1024;

// Suffix of the temporary copy used when writing over the base binary
pub const BACKUP_SUFFIX: &str = ".backup";

// Default output naming for generic attachments
pub const ATTACHED_SUFFIX: &str = "_attached";
