//! `.ico` parsing and `RT_GROUP_ICON` construction

use anyhow::{Context, Result, bail};

const ICONDIR_SIZE: usize = 6;
const ICONDIRENTRY_SIZE: usize = 16;
const ICON_TYPE: u16 = 1;

/// One image from an `.ico` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    pub width: u8,
    pub height: u8,
    pub color_count: u8,
    pub reserved: u8,
    pub planes: u16,
    pub bit_count: u16,
    pub data: Vec<u8>,
}

fn u16_at(data: &[u8], at: usize) -> Result<u16> {
    let b = data.get(at..at + 2).context("icon file truncated")?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

fn u32_at(data: &[u8], at: usize) -> Result<u32> {
    let b = data.get(at..at + 4).context("icon file truncated")?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Parse all images of an `.ico` file
pub fn parse_ico(data: &[u8]) -> Result<Vec<IconImage>> {
    if u16_at(data, 2)? != ICON_TYPE {
        bail!("not an icon file");
    }
    let count = u16_at(data, 4)? as usize;
    if count == 0 {
        bail!("icon file contains no images");
    }

    (0..count)
        .map(|i| {
            let entry = ICONDIR_SIZE + i * ICONDIRENTRY_SIZE;
            let header = data
                .get(entry..entry + ICONDIRENTRY_SIZE)
                .context("icon directory truncated")?;
            let size = u32_at(data, entry + 8)? as usize;
            let offset = u32_at(data, entry + 12)? as usize;
            let image = data
                .get(offset..offset + size)
                .with_context(|| format!("icon image {i} lies outside the file"))?;
            Ok(IconImage {
                width: header[0],
                height: header[1],
                color_count: header[2],
                reserved: header[3],
                planes: u16_at(data, entry + 4)?,
                bit_count: u16_at(data, entry + 6)?,
                data: image.to_vec(),
            })
        })
        .collect()
}

/// `GRPICONDIR` for `images`, whose `RT_ICON` ids run from `first_id`
pub fn group_icon_directory(images: &[IconImage], first_id: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(ICONDIR_SIZE + images.len() * 14);
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&ICON_TYPE.to_le_bytes());
    out.extend_from_slice(&(images.len() as u16).to_le_bytes());
    for (i, image) in images.iter().enumerate() {
        out.extend_from_slice(&[image.width, image.height, image.color_count, image.reserved]);
        out.extend_from_slice(&image.planes.to_le_bytes());
        out.extend_from_slice(&image.bit_count.to_le_bytes());
        out.extend_from_slice(&(image.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(first_id + i as u16).to_le_bytes());
    }
    out
}
