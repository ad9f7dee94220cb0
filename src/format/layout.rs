// src/format/layout.rs
// Segment arithmetic for composite files. All offsets in a composite file
// are derived here, once by the writer and once by the reader.

use crate::exceptions::{JarpackError, Result};
use std::fmt;

/// A contiguous byte range inside a composite file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Segment {
    pub offset: u64,
    pub size: u64,
}

impl Segment {
    pub fn new(offset: u64, size: u64) -> Self {
        Segment { offset, size }
    }

    /// One past the last byte
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}..{:#x} ({} bytes)", self.offset, self.end(), self.size)
    }
}

/// Full layout of a composite file:
/// `[base][payload][image][string fields...][footer]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub base: Segment,
    pub payload: Segment,
    pub image: Segment,
    pub fields: Vec<Segment>,
    pub footer: Segment,
}

impl Layout {
    /// Plan the layout of a file about to be written
    pub fn plan(
        base_size: u64,
        payload_size: u64,
        image_size: u64,
        field_lengths: &[u32],
        footer_size: usize,
    ) -> Self {
        let base = Segment::new(0, base_size);
        let payload = Segment::new(base.end(), payload_size);
        let image = Segment::new(payload.end(), image_size);

        let mut cursor = image.end();
        let fields = field_lengths
            .iter()
            .map(|&len| {
                let field = Segment::new(cursor, u64::from(len));
                cursor = field.end();
                field
            })
            .collect();

        let footer = Segment::new(cursor, footer_size as u64);

        Layout {
            base,
            payload,
            image,
            fields,
            footer,
        }
    }

    /// Re-derive the layout of an existing file from its footer.
    ///
    /// Walks backward from the footer: string fields, then image, then the
    /// payload must end exactly where the image begins.
    pub fn recover(
        file_size: u64,
        footer_size: usize,
        payload: Segment,
        image_size: u64,
        field_lengths: &[u32],
    ) -> Result<Self> {
        let footer_start =
            file_size
                .checked_sub(footer_size as u64)
                .ok_or(JarpackError::TooSmall {
                    size: file_size,
                    required: footer_size as u64,
                })?;

        let strings_total: u64 = field_lengths.iter().map(|&len| u64::from(len)).sum();
        let strings_start = footer_start.checked_sub(strings_total).ok_or_else(|| {
            JarpackError::CorruptLayout(format!(
                "string fields declare {strings_total} bytes but only {footer_start} precede the footer"
            ))
        })?;

        let image_start = strings_start.checked_sub(image_size).ok_or_else(|| {
            JarpackError::CorruptLayout(format!(
                "image declares {image_size} bytes but only {strings_start} precede the string fields"
            ))
        })?;

        let payload_end = payload.offset.checked_add(payload.size).ok_or_else(|| {
            JarpackError::CorruptLayout(format!(
                "payload offset {} + size {} overflows",
                payload.offset, payload.size
            ))
        })?;

        if payload_end != image_start {
            return Err(JarpackError::CorruptLayout(format!(
                "payload ends at {payload_end:#x} but the trailing segments start at {image_start:#x}"
            )));
        }

        Ok(Self::plan(
            payload.offset,
            payload.size,
            image_size,
            field_lengths,
            footer_size,
        ))
    }

    /// The concatenated string fields
    pub fn strings_region(&self) -> Segment {
        let start = self.image.end();
        Segment::new(start, self.footer.offset - start)
    }

    /// Total file size described by this layout
    pub fn total_size(&self) -> u64 {
        self.footer.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_is_contiguous() {
        let layout = Layout::plan(100, 5000, 10, &[4, 8, 0], 78);
        assert_eq!(layout.payload, Segment::new(100, 5000));
        assert_eq!(layout.image, Segment::new(5100, 10));
        assert_eq!(layout.fields[0], Segment::new(5110, 4));
        assert_eq!(layout.fields[1], Segment::new(5114, 8));
        assert_eq!(layout.fields[2], Segment::new(5122, 0));
        assert_eq!(layout.footer, Segment::new(5122, 78));
        assert_eq!(layout.strings_region(), Segment::new(5110, 12));
        assert_eq!(layout.total_size(), 100 + 5000 + 10 + 12 + 78);
    }

    #[test]
    fn test_recover_matches_plan() {
        let planned = Layout::plan(100, 5000, 10, &[4, 8, 0], 78);
        let recovered = Layout::recover(
            planned.total_size(),
            78,
            planned.payload,
            10,
            &[4, 8, 0],
        )
        .unwrap();
        assert_eq!(planned, recovered);
    }

    #[test]
    fn test_recover_rejects_oversized_strings() {
        let err = Layout::recover(200, 78, Segment::new(0, 100), 0, &[u32::MAX]).unwrap_err();
        assert!(matches!(err, JarpackError::CorruptLayout(_)));
    }

    #[test]
    fn test_recover_rejects_gap_or_overlap() {
        // one byte too few in the declared strings
        let err = Layout::recover(200, 20, Segment::new(100, 70), 0, &[9]).unwrap_err();
        assert!(matches!(err, JarpackError::CorruptLayout(_)));

        let err = Layout::recover(200, 20, Segment::new(100, 70), 0, &[11]).unwrap_err();
        assert!(matches!(err, JarpackError::CorruptLayout(_)));

        assert!(Layout::recover(200, 20, Segment::new(100, 70), 0, &[10]).is_ok());
    }

    #[test]
    fn test_recover_too_small() {
        let err = Layout::recover(10, 20, Segment::default(), 0, &[]).unwrap_err();
        assert!(matches!(
            err,
            JarpackError::TooSmall {
                size: 10,
                required: 20
            }
        ));
    }

    #[test]
    fn test_recover_payload_overflow() {
        let err = Layout::recover(100, 20, Segment::new(u64::MAX, 2), 0, &[]).unwrap_err();
        assert!(matches!(err, JarpackError::CorruptLayout(_)));
    }
}
