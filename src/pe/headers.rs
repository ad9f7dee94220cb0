//! PE header inspection and patching on in-memory images
//!
//! Everything here works on byte slices so it runs on any host. Only the
//! resource updater in [`super::resources`] needs the Windows API.

use anyhow::{Context, Result, bail};
use log::{debug, trace, warn};
use std::fmt;

const PE_OFFSET_FIELD: usize = 0x3C;
const COFF_HEADER_SIZE: usize = 20;
const SECTION_HEADER_SIZE: usize = 40;

const OPTIONAL_MAGIC_PE32: u16 = 0x10b;
const OPTIONAL_MAGIC_PE32_PLUS: u16 = 0x20b;

// Offsets inside the optional header, identical for PE32 and PE32+
const CHECKSUM_OFFSET: usize = 64;
const SUBSYSTEM_OFFSET: usize = 68;

const SUBSYSTEM_WINDOWS_GUI: u16 = 2;
const SUBSYSTEM_WINDOWS_CUI: u16 = 3;

/// Whether the process gets a console window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Console,
    Gui,
    Other(u16),
}

impl Subsystem {
    pub fn from_u16(value: u16) -> Self {
        match value {
            SUBSYSTEM_WINDOWS_CUI => Subsystem::Console,
            SUBSYSTEM_WINDOWS_GUI => Subsystem::Gui,
            other => Subsystem::Other(other),
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Subsystem::Console => SUBSYSTEM_WINDOWS_CUI,
            Subsystem::Gui => SUBSYSTEM_WINDOWS_GUI,
            Subsystem::Other(v) => v,
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subsystem::Console => write!(f, "Windows Console (console shown)"),
            Subsystem::Gui => write!(f, "Windows GUI (no console)"),
            Subsystem::Other(v) => write!(f, "other ({v})"),
        }
    }
}

/// Requested UAC execution level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionLevel {
    #[default]
    AsInvoker,
    RequireAdministrator,
}

impl ExecutionLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionLevel::AsInvoker => "asInvoker",
            ExecutionLevel::RequireAdministrator => "requireAdministrator",
        }
    }
}

/// Check for the "MZ" DOS signature
pub fn is_pe_executable(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == b'M' && data[1] == b'Z'
}

fn read_u16(data: &[u8], at: usize) -> Result<u16> {
    let bytes = data
        .get(at..at + 2)
        .with_context(|| format!("PE truncated at offset {at:#x}"))?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(data: &[u8], at: usize) -> Result<u32> {
    let bytes = data
        .get(at..at + 4)
        .with_context(|| format!("PE truncated at offset {at:#x}"))?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn write_at(data: &mut [u8], at: usize, value: &[u8]) -> Result<()> {
    data.get_mut(at..at + value.len())
        .with_context(|| format!("PE truncated at offset {at:#x}"))?
        .copy_from_slice(value);
    Ok(())
}

/// Offsets of the headers that matter for patching
#[derive(Debug, Clone, Copy)]
struct HeaderOffsets {
    coff: usize,
    optional: usize,
    optional_size: usize,
    plus: bool,
}

fn header_offsets(data: &[u8]) -> Result<HeaderOffsets> {
    if !is_pe_executable(data) {
        bail!("not a PE executable: missing MZ signature");
    }
    let pe_offset = read_u32(data, PE_OFFSET_FIELD)? as usize;
    let signature = data
        .get(pe_offset..pe_offset + 4)
        .context("PE header offset points past end of file")?;
    if signature != b"PE\0\0" {
        bail!("invalid PE signature at {pe_offset:#x}");
    }

    let coff = pe_offset + 4;
    let optional_size = read_u16(data, coff + 16)? as usize;
    let optional = coff + COFF_HEADER_SIZE;
    let plus = match read_u16(data, optional)? {
        OPTIONAL_MAGIC_PE32 => false,
        OPTIONAL_MAGIC_PE32_PLUS => true,
        other => bail!("unsupported optional header magic {other:#x}"),
    };
    if optional_size < SUBSYSTEM_OFFSET + 2 {
        bail!("optional header too small ({optional_size} bytes)");
    }
    trace!("PE header at {pe_offset:#x}, optional header at {optional:#x}, plus={plus}");

    Ok(HeaderOffsets {
        coff,
        optional,
        optional_size,
        plus,
    })
}

/// Current subsystem of a PE image
pub fn subsystem(data: &[u8]) -> Result<Subsystem> {
    let offsets = header_offsets(data)?;
    Ok(Subsystem::from_u16(read_u16(
        data,
        offsets.optional + SUBSYSTEM_OFFSET,
    )?))
}

/// True for PE32+ (64-bit) images
pub fn is_pe32_plus(data: &[u8]) -> Result<bool> {
    Ok(header_offsets(data)?.plus)
}

/// Patch the subsystem field and refresh the checksum
pub fn set_subsystem(data: &mut [u8], target: Subsystem) -> Result<()> {
    let offsets = header_offsets(data)?;
    let at = offsets.optional + SUBSYSTEM_OFFSET;
    write_at(data, at, &target.as_u16().to_le_bytes())?;
    debug!("🪟 Subsystem set to {target}");
    update_checksum(data)
}

/// PE image checksum as computed by the loader's `CheckSumMappedFile`
pub fn compute_checksum(data: &[u8]) -> Result<u32> {
    let checksum_at = header_offsets(data)?.optional + CHECKSUM_OFFSET;

    let mut sum: u64 = 0;
    let mut i = 0;
    while i < data.len() {
        if i == checksum_at || i == checksum_at + 2 {
            i += 2;
            continue;
        }
        let lo = u64::from(data[i]);
        let hi = data.get(i + 1).map_or(0, |b| u64::from(*b));
        sum += lo | (hi << 8);
        sum = (sum & 0xffff) + (sum >> 16);
        i += 2;
    }
    sum = (sum & 0xffff) + (sum >> 16);
    let total = sum + data.len() as u64;
    u32::try_from(total).context("image too large for a PE checksum")
}

/// Recompute and store the checksum
pub fn update_checksum(data: &mut [u8]) -> Result<()> {
    let checksum = compute_checksum(data)?;
    let at = header_offsets(data)?.optional + CHECKSUM_OFFSET;
    write_at(data, at, &checksum.to_le_bytes())?;
    trace!("PE checksum {checksum:#010x}");
    Ok(())
}

/// Stored checksum field
pub fn stored_checksum(data: &[u8]) -> Result<u32> {
    read_u32(data, header_offsets(data)?.optional + CHECKSUM_OFFSET)
}

/// End of the last section's raw data: everything past it is overlay
pub fn image_end(data: &[u8]) -> Result<u64> {
    let offsets = header_offsets(data)?;
    let sections = read_u16(data, offsets.coff + 2)? as usize;
    let table = offsets.optional + offsets.optional_size;

    let mut end = 0u64;
    for i in 0..sections {
        let header = table + i * SECTION_HEADER_SIZE;
        let raw_size = u64::from(read_u32(data, header + 16)?);
        let raw_ptr = u64::from(read_u32(data, header + 20)?);
        end = end.max(raw_ptr + raw_size);
    }

    if end == 0 {
        return Ok(data.len() as u64);
    }
    if end > data.len() as u64 {
        warn!("Section table claims {end} bytes, file has {}", data.len());
        return Ok(data.len() as u64);
    }
    Ok(end)
}

/// Requested execution level found in the embedded manifest, if any
pub fn execution_level(data: &[u8]) -> Option<ExecutionLevel> {
    let contains = |needle: &[u8]| data.windows(needle.len()).any(|w| w == needle);
    if !contains(b"requestedExecutionLevel") {
        return None;
    }
    if contains(b"requireAdministrator") {
        Some(ExecutionLevel::RequireAdministrator)
    } else {
        Some(ExecutionLevel::AsInvoker)
    }
}

/// Application manifest requesting `level`, with the Common Controls v6
/// dependency so dialogs get the modern theme.
pub fn manifest_for(level: ExecutionLevel) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<assembly xmlns="urn:schemas-microsoft-com:asm.v1" manifestVersion="1.0">"#,
            r#"<trustInfo xmlns="urn:schemas-microsoft-com:asm.v3">"#,
            "<security><requestedPrivileges>",
            r#"<requestedExecutionLevel level="{}" uiAccess="false"/>"#,
            "</requestedPrivileges></security></trustInfo>",
            "<dependency><dependentAssembly>",
            r#"<assemblyIdentity type="win32" name="Microsoft.Windows.Common-Controls" version="6.0.0.0""#,
            r#" processorArchitecture="*" publicKeyToken="6595b64144ccf1df" language="*"/>"#,
            "</dependentAssembly></dependency>",
            "</assembly>"
        ),
        level.as_str()
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest image the header walkers accept: one section at 0x200
    pub(crate) fn minimal_pe(plus: bool) -> Vec<u8> {
        let mut data = vec![0u8; 0x400];
        data[0] = b'M';
        data[1] = b'Z';
        data[PE_OFFSET_FIELD..PE_OFFSET_FIELD + 4].copy_from_slice(&0x80u32.to_le_bytes());
        data[0x80..0x84].copy_from_slice(b"PE\0\0");

        let coff = 0x84;
        data[coff + 2..coff + 4].copy_from_slice(&1u16.to_le_bytes());
        let optional_size: u16 = if plus { 0xF0 } else { 0xE0 };
        data[coff + 16..coff + 18].copy_from_slice(&optional_size.to_le_bytes());

        let optional = coff + COFF_HEADER_SIZE;
        let magic = if plus {
            OPTIONAL_MAGIC_PE32_PLUS
        } else {
            OPTIONAL_MAGIC_PE32
        };
        data[optional..optional + 2].copy_from_slice(&magic.to_le_bytes());
        data[optional + SUBSYSTEM_OFFSET..optional + SUBSYSTEM_OFFSET + 2]
            .copy_from_slice(&SUBSYSTEM_WINDOWS_CUI.to_le_bytes());

        let section = optional + optional_size as usize;
        data[section..section + 5].copy_from_slice(b".text");
        data[section + 16..section + 20].copy_from_slice(&0x200u32.to_le_bytes());
        data[section + 20..section + 24].copy_from_slice(&0x200u32.to_le_bytes());
        data
    }

    #[test]
    fn test_subsystem_patch_pe32_and_pe32_plus() {
        for plus in [false, true] {
            let mut data = minimal_pe(plus);
            assert_eq!(is_pe32_plus(&data).unwrap(), plus);
            assert_eq!(subsystem(&data).unwrap(), Subsystem::Console);

            set_subsystem(&mut data, Subsystem::Gui).unwrap();
            assert_eq!(subsystem(&data).unwrap(), Subsystem::Gui);
            assert_eq!(stored_checksum(&data).unwrap(), compute_checksum(&data).unwrap());

            set_subsystem(&mut data, Subsystem::Console).unwrap();
            assert_eq!(subsystem(&data).unwrap(), Subsystem::Console);
        }
    }

    #[test]
    fn test_checksum_ignores_its_own_field() {
        let mut data = minimal_pe(false);
        let before = compute_checksum(&data).unwrap();
        update_checksum(&mut data).unwrap();
        assert_eq!(compute_checksum(&data).unwrap(), before);
        assert_ne!(before, 0);
    }

    #[test]
    fn test_image_end_excludes_overlay() {
        let mut data = minimal_pe(true);
        assert_eq!(image_end(&data).unwrap(), 0x400);
        data.extend_from_slice(b"overlay bytes");
        assert_eq!(image_end(&data).unwrap(), 0x400);
    }

    #[test]
    fn test_rejects_non_pe() {
        assert!(subsystem(b"not an exe").is_err());
        let mut data = minimal_pe(false);
        data[0x80] = b'X';
        assert!(subsystem(&data).is_err());
    }

    #[test]
    fn test_truncated_optional_header_is_an_error() {
        let optional = 0x84 + COFF_HEADER_SIZE;
        for len in [optional + 0x30, optional + CHECKSUM_OFFSET + 2] {
            let mut data = minimal_pe(false);
            data.truncate(len);
            assert!(set_subsystem(&mut data, Subsystem::Gui).is_err());
            assert!(update_checksum(&mut data).is_err());
            assert_eq!(data.len(), len);
        }
    }

    #[test]
    fn test_manifest_round_trips_through_scanner() {
        for level in [ExecutionLevel::AsInvoker, ExecutionLevel::RequireAdministrator] {
            let manifest = manifest_for(level);
            assert!(manifest.contains("Microsoft.Windows.Common-Controls"));
            assert_eq!(execution_level(manifest.as_bytes()), Some(level));
        }
        assert_eq!(execution_level(b"no manifest here"), None);
    }
}
