//! Disc header information ("bi2.bin")
//!
//! 0x2000 bytes following the disc header. Only the leading fields are
//! interpreted; the rest of the sector is carried through unchanged.
//!
//! ```ascii
//!     0x00 [UInt32:debug_monitor_size]
//!     0x04 [UInt32:simulated_memory_size]
//!     0x08 [UInt32:debug_flag]
//!     0x0C [UInt32:argument_offset]
//!     0x10 [UInt32:track_location]
//!     0x14 [UInt32:track_size]
//!     0x18 [UInt32:region]
//! ```

use std::io::Cursor;

use crate::binary::{DiscBinaryReader, DiscBinaryWriter};
use crate::error::{Error, Result};

pub const BOOT_INFO_SIZE: usize = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    NtscJ,
    NtscU,
    Pal,
    Unknown(u32),
}

impl From<u32> for Region {
    fn from(value: u32) -> Self {
        match value {
            0 => Region::NtscJ,
            1 => Region::NtscU,
            2 => Region::Pal,
            other => Region::Unknown(other),
        }
    }
}

impl From<Region> for u32 {
    fn from(region: Region) -> Self {
        match region {
            Region::NtscJ => 0,
            Region::NtscU => 1,
            Region::Pal => 2,
            Region::Unknown(value) => value,
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Region::NtscJ => write!(f, "NTSC-J"),
            Region::NtscU => write!(f, "NTSC-U"),
            Region::Pal => write!(f, "PAL"),
            Region::Unknown(value) => write!(f, "unknown ({value})"),
        }
    }
}

#[derive(Debug, Clone)]
struct Fields {
    raw: Vec<u8>,
    values: [u32; 7],
}

/// The header information sector.
///
/// Like [`crate::boot::BootHeader`], an uninitialized instance (`default()`)
/// answers `None` to every getter and ignores every setter.
#[derive(Debug, Clone, Default)]
pub struct BootInfo {
    fields: Option<Box<Fields>>,
}

impl PartialEq for BootInfo {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BootInfo {}

const DEBUG_MONITOR_SIZE: usize = 0;
const SIMULATED_MEMORY_SIZE: usize = 1;
const DEBUG_FLAG: usize = 2;
const ARGUMENT_OFFSET: usize = 3;
const TRACK_LOCATION: usize = 4;
const TRACK_SIZE: usize = 5;
const REGION: usize = 6;

impl BootInfo {
    pub fn blank() -> Self {
        Self::from_bytes(&vec![0u8; BOOT_INFO_SIZE]).unwrap_or_default()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != BOOT_INFO_SIZE {
            return Err(Error::SizeMismatch {
                expected: BOOT_INFO_SIZE,
                actual: data.len(),
            });
        }
        let mut reader = Cursor::new(data);
        let mut values = [0u32; 7];
        for value in values.iter_mut() {
            *value = reader.read_disc_u32()?;
        }
        Ok(BootInfo {
            fields: Some(Box::new(Fields {
                raw: data.to_vec(),
                values,
            })),
        })
    }

    /// Encode the sector; `None` for an uninitialized instance
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let f = self.fields.as_ref()?;
        let mut out = f.raw.clone();
        let mut writer = Cursor::new(&mut out[..]);
        for value in f.values {
            writer.write_disc_u32(value).ok()?;
        }
        Some(out)
    }

    pub fn is_valid(&self) -> bool {
        self.fields.is_some()
    }

    fn get(&self, index: usize) -> Option<u32> {
        self.fields.as_ref().map(|f| f.values[index])
    }

    fn set(&mut self, index: usize, value: u32) {
        if let Some(f) = self.fields.as_mut() {
            f.values[index] = value;
        }
    }

    pub fn debug_monitor_size(&self) -> Option<u32> {
        self.get(DEBUG_MONITOR_SIZE)
    }

    pub fn set_debug_monitor_size(&mut self, value: u32) {
        self.set(DEBUG_MONITOR_SIZE, value)
    }

    pub fn simulated_memory_size(&self) -> Option<u32> {
        self.get(SIMULATED_MEMORY_SIZE)
    }

    pub fn set_simulated_memory_size(&mut self, value: u32) {
        self.set(SIMULATED_MEMORY_SIZE, value)
    }

    pub fn debug_flag(&self) -> Option<u32> {
        self.get(DEBUG_FLAG)
    }

    pub fn set_debug_flag(&mut self, value: u32) {
        self.set(DEBUG_FLAG, value)
    }

    pub fn argument_offset(&self) -> Option<u32> {
        self.get(ARGUMENT_OFFSET)
    }

    pub fn set_argument_offset(&mut self, value: u32) {
        self.set(ARGUMENT_OFFSET, value)
    }

    pub fn track_location(&self) -> Option<u32> {
        self.get(TRACK_LOCATION)
    }

    pub fn set_track_location(&mut self, value: u32) {
        self.set(TRACK_LOCATION, value)
    }

    pub fn track_size(&self) -> Option<u32> {
        self.get(TRACK_SIZE)
    }

    pub fn set_track_size(&mut self, value: u32) {
        self.set(TRACK_SIZE, value)
    }

    pub fn region(&self) -> Option<Region> {
        self.get(REGION).map(Region::from)
    }

    pub fn set_region(&mut self, region: Region) {
        self.set(REGION, region.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_fields() {
        let mut data = vec![0u8; BOOT_INFO_SIZE];
        data[0x04..0x08].copy_from_slice(&0x0180_0000u32.to_be_bytes());
        data[0x0C..0x10].copy_from_slice(&0x2440u32.to_be_bytes());
        data[0x18..0x1C].copy_from_slice(&2u32.to_be_bytes());
        data[0x1FFF] = 0x5A;

        let info = BootInfo::from_bytes(&data).unwrap();
        assert_eq!(info.simulated_memory_size(), Some(0x0180_0000));
        assert_eq!(info.argument_offset(), Some(0x2440));
        assert_eq!(info.debug_flag(), Some(0));
        assert_eq!(info.region(), Some(Region::Pal));
        assert_eq!(info.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_region_values() {
        assert_eq!(Region::from(0), Region::NtscJ);
        assert_eq!(Region::from(1), Region::NtscU);
        assert_eq!(Region::from(3), Region::Unknown(3));
        assert_eq!(u32::from(Region::Unknown(0xFFFF_FFFF)), 0xFFFF_FFFF);
        assert_eq!(Region::NtscU.to_string(), "NTSC-U");
    }

    #[test]
    fn test_wrong_size_rejected() {
        assert!(matches!(
            BootInfo::from_bytes(&[0u8; 0x440]),
            Err(Error::SizeMismatch {
                expected: BOOT_INFO_SIZE,
                actual: 0x440
            })
        ));
    }

    #[test]
    fn test_uninitialized_is_total_and_inert() {
        let mut info = BootInfo::default();
        assert_eq!(info.region(), None);
        assert_eq!(info.track_size(), None);
        info.set_region(Region::Pal);
        assert_eq!(info.region(), None);
        assert!(info.to_bytes().is_none());
    }

    #[test]
    fn test_setters_round_trip() {
        let mut info = BootInfo::blank();
        info.set_region(Region::NtscU);
        info.set_track_size(0x1000);
        let decoded = BootInfo::from_bytes(&info.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, info);
        assert_eq!(decoded.region(), Some(Region::NtscU));
        assert_eq!(decoded.track_size(), Some(0x1000));
    }
}
