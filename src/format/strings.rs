// src/format/strings.rs
// The seven UTF-8 string fields stored between the image and the footer.

use super::constants::{ARG_SEPARATOR, STRING_FIELD_COUNT};
use crate::exceptions::{JarpackError, Result};

/// Launch strings carried by a JAR package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchStrings {
    pub main_class: String,
    pub jvm_args: Vec<String>,
    pub program_args: Vec<String>,
    pub java_path: String,
    pub extract_path: String,
    pub splash_name: String,
    pub splash_version: String,
}

/// Join arguments with the separator. No escaping: an argument that itself
/// contains a newline is split on decode.
pub fn join_args(args: &[String]) -> String {
    args.join(&ARG_SEPARATOR.to_string())
}

/// Split an argument blob, dropping empty items
pub fn split_args(blob: &str) -> Vec<String> {
    blob.split(ARG_SEPARATOR)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl LaunchStrings {
    /// Field encodings in wire order
    pub fn encode_fields(&self) -> [Vec<u8>; STRING_FIELD_COUNT] {
        [
            self.main_class.as_bytes().to_vec(),
            join_args(&self.jvm_args).into_bytes(),
            join_args(&self.program_args).into_bytes(),
            self.java_path.as_bytes().to_vec(),
            self.extract_path.as_bytes().to_vec(),
            self.splash_name.as_bytes().to_vec(),
            self.splash_version.as_bytes().to_vec(),
        ]
    }

    /// Byte lengths of the encoded fields, as stored in the footer
    pub fn lengths(&self) -> Result<[u32; STRING_FIELD_COUNT]> {
        let fields = self.encode_fields();
        let mut lengths = [0u32; STRING_FIELD_COUNT];
        for (slot, field) in lengths.iter_mut().zip(fields.iter()) {
            *slot = u32::try_from(field.len()).map_err(|_| {
                JarpackError::InvalidFormat(format!(
                    "string field of {} bytes does not fit in u32",
                    field.len()
                ))
            })?;
        }
        Ok(lengths)
    }

    /// Rebuild from the raw field bytes in wire order
    pub fn decode_fields(fields: &[Vec<u8>]) -> Result<Self> {
        if fields.len() != STRING_FIELD_COUNT {
            return Err(JarpackError::CorruptLayout(format!(
                "expected {STRING_FIELD_COUNT} string fields, got {}",
                fields.len()
            )));
        }

        let text = |index: usize, name: &str| -> Result<String> {
            String::from_utf8(fields[index].clone()).map_err(|e| {
                JarpackError::CorruptLayout(format!("{name} is not valid UTF-8: {e}"))
            })
        };

        Ok(LaunchStrings {
            main_class: text(0, "main class")?,
            jvm_args: split_args(&text(1, "JVM args")?),
            program_args: split_args(&text(2, "program args")?),
            java_path: text(3, "java path")?,
            extract_path: text(4, "extract path")?,
            splash_name: text(5, "splash name")?,
            splash_version: text(6, "splash version")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_drops_empty_items() {
        assert_eq!(split_args("-Xmx1g\n\n-Dfoo=bar\n"), vec!["-Xmx1g", "-Dfoo=bar"]);
        assert!(split_args("").is_empty());
    }

    #[test]
    fn test_lengths_match_encoding() {
        let strings = LaunchStrings {
            main_class: "com.example.Main".into(),
            jvm_args: vec!["-Xmx256m".into(), "-Dx=1".into()],
            splash_name: "Démo".into(),
            ..LaunchStrings::default()
        };
        let lengths = strings.lengths().unwrap();
        assert_eq!(lengths[0], 16);
        assert_eq!(lengths[1], 14); // "-Xmx256m\n-Dx=1"
        assert_eq!(lengths[2], 0);
        assert_eq!(lengths[5], 5); // é is two bytes
    }

    #[test]
    fn test_decode_fields_restores_strings() {
        let strings = LaunchStrings {
            main_class: "Main".into(),
            jvm_args: vec!["-Xmx256m".into()],
            program_args: vec!["--mode".into(), "fast".into()],
            java_path: "C:\\jdk".into(),
            extract_path: "$ENV{APPDATA}\\demo".into(),
            splash_name: "Demo".into(),
            splash_version: "1.0".into(),
        };
        let fields = strings.encode_fields().to_vec();
        assert_eq!(LaunchStrings::decode_fields(&fields).unwrap(), strings);
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let mut fields = vec![Vec::new(); STRING_FIELD_COUNT];
        fields[0] = vec![0xff, 0xfe];
        assert!(matches!(
            LaunchStrings::decode_fields(&fields),
            Err(JarpackError::CorruptLayout(_))
        ));
    }
}
