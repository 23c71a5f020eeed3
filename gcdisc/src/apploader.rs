//! Apploader
//! ---------
//!
//! The apploader is the small loader program the console runs before the main
//! executable. It sits right after the two fixed headers and has the following
//! layout:
//!
//! ```ascii
//!     [Char[10]:build_date]   /* "YYYY/MM/DD" */
//!     [Byte[6]:padding]
//!     [UInt32:entry_point]
//!     [UInt32:loader_size]
//!     [UInt32:trailer_size]
//!     [Byte[4]:reserved]
//!     [Byte[loader_size]:loader]
//!     [Byte[trailer_size]:trailer]
//! ```

use std::io::Cursor;

use chrono::NaiveDate;

use crate::binary::{align_up, DiscBinaryReader, DiscBinaryWriter};
use crate::error::{Error, Result};

pub const HEADER_SIZE: usize = 0x20;
const DATE_WIDTH: usize = 10;
const DATE_FORMAT: &str = "%Y/%m/%d";
const ENTRY_POINT_OFFSET: u64 = 0x10;

/// Lowest valid entry point (inclusive)
pub const MIN_ENTRY_POINT: u32 = 0x8000_3000;
/// Highest valid entry point (exclusive)
pub const MAX_ENTRY_POINT: u32 = 0x8180_0000;
/// Segments of this size or larger cannot be loaded into main memory
pub const MAX_SEGMENT_SIZE: usize = 0x180_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apploader {
    entry_point: u32,
    /// Raw header, kept for the date and the bytes the codec does not interpret.
    header: [u8; HEADER_SIZE],
    loader: Vec<u8>,
    trailer: Vec<u8>,
}

impl Apploader {
    /// Decode an apploader from its complete blob.
    ///
    /// The blob length must equal the header size plus the declared loader and
    /// trailer sizes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let declared = Self::declared_len(data)?;
        if declared != data.len() {
            return Err(Error::SizeMismatch {
                expected: declared,
                actual: data.len(),
            });
        }

        let mut reader = Cursor::new(data);
        reader.set_position(ENTRY_POINT_OFFSET);
        let entry_point = reader.read_disc_u32()?;
        let loader_size = reader.read_disc_u32()? as usize;
        let trailer_size = reader.read_disc_u32()? as usize;

        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&data[..HEADER_SIZE]);
        let loader_end = HEADER_SIZE + loader_size;

        Ok(Apploader {
            entry_point,
            header,
            loader: data[HEADER_SIZE..loader_end].to_vec(),
            trailer: data[loader_end..loader_end + trailer_size].to_vec(),
        })
    }

    /// Total blob length declared by the header at the start of `prefix`.
    ///
    /// Only the first 0x20 bytes are inspected, which lets callers find the end
    /// of the apploader inside a larger image before slicing it out.
    pub fn declared_len(prefix: &[u8]) -> Result<usize> {
        if prefix.len() < HEADER_SIZE {
            return Err(Error::SizeMismatch {
                expected: HEADER_SIZE,
                actual: prefix.len(),
            });
        }
        let mut reader = Cursor::new(&prefix[0x14..0x1C]);
        let loader_size = reader.read_disc_u32()? as usize;
        let trailer_size = reader.read_disc_u32()? as usize;
        Ok(HEADER_SIZE + loader_size + trailer_size)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.header);
        {
            let mut writer = Cursor::new(&mut out[..]);
            writer.set_position(ENTRY_POINT_OFFSET);
            writer.write_disc_u32(self.entry_point)?;
            writer.write_disc_u32(u32::try_from(self.loader.len())?)?;
            writer.write_disc_u32(u32::try_from(self.trailer.len())?)?;
        }
        out.extend_from_slice(&self.loader);
        out.extend_from_slice(&self.trailer);
        Ok(out)
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        HEADER_SIZE + self.loader.len() + self.trailer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loader.is_empty() && self.trailer.is_empty()
    }

    /// The raw "YYYY/MM/DD" build date string
    pub fn build_date(&self) -> String {
        let mut reader = Cursor::new(&self.header[..DATE_WIDTH]);
        reader
            .read_disc_fixed_string(DATE_WIDTH)
            .unwrap_or_default()
    }

    /// The build date, if the stored string is a well-formed date
    pub fn build_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.build_date(), DATE_FORMAT).ok()
    }

    pub fn set_build_date(&mut self, date: NaiveDate) {
        let text = date.format(DATE_FORMAT).to_string();
        let field = &mut self.header[..DATE_WIDTH];
        field.fill(0);
        let len = text.len().min(DATE_WIDTH);
        field[..len].copy_from_slice(&text.as_bytes()[..len]);
    }

    pub fn entry_point(&self) -> u32 {
        self.entry_point
    }

    pub fn set_entry_point(&mut self, address: u32) -> Result<()> {
        if !(MIN_ENTRY_POINT..MAX_ENTRY_POINT).contains(&address) {
            return Err(Error::OutOfRange(format!(
                "entry point {address:#010x} outside [{MIN_ENTRY_POINT:#010x}, {MAX_ENTRY_POINT:#010x})"
            )));
        }
        self.entry_point = address;
        Ok(())
    }

    pub fn loader(&self) -> &[u8] {
        &self.loader
    }

    pub fn trailer(&self) -> &[u8] {
        &self.trailer
    }

    /// Replace the loader segment, zero-padding it to a 4-byte boundary
    pub fn set_loader_data(&mut self, data: &[u8]) -> Result<()> {
        self.loader = padded_segment(data)?;
        Ok(())
    }

    /// Replace the trailer segment, zero-padding it to a 4-byte boundary
    pub fn set_trailer_data(&mut self, data: &[u8]) -> Result<()> {
        self.trailer = padded_segment(data)?;
        Ok(())
    }
}

fn padded_segment(data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() >= MAX_SEGMENT_SIZE {
        return Err(Error::OutOfRange(format!(
            "apploader segment of {:#x} bytes (must be in 1..{MAX_SEGMENT_SIZE:#x})",
            data.len()
        )));
    }
    let mut segment = data.to_vec();
    segment.resize(align_up(data.len() as u64, 4) as usize, 0);
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(loader: &[u8], trailer: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..10].copy_from_slice(b"2004/02/10");
        data[0x10..0x14].copy_from_slice(&0x8120_0000u32.to_be_bytes());
        data[0x14..0x18].copy_from_slice(&(loader.len() as u32).to_be_bytes());
        data[0x18..0x1C].copy_from_slice(&(trailer.len() as u32).to_be_bytes());
        data.extend_from_slice(loader);
        data.extend_from_slice(trailer);
        data
    }

    #[test]
    fn test_decode_loader_view() {
        let loader: Vec<u8> = (0u8..16).collect();
        let apploader = Apploader::from_bytes(&sample(&loader, &[])).unwrap();

        assert_eq!(apploader.loader(), &loader[..]);
        assert!(apploader.trailer().is_empty());
        assert_eq!(apploader.entry_point(), 0x8120_0000);
        assert_eq!(apploader.build_date(), "2004/02/10");
        assert_eq!(
            apploader.build_naive_date(),
            NaiveDate::from_ymd_opt(2004, 2, 10)
        );
    }

    #[test]
    fn test_decode_size_mismatch() {
        let mut data = sample(&[1, 2, 3, 4], &[5, 6, 7, 8]);
        data.push(0);
        assert!(matches!(
            Apploader::from_bytes(&data),
            Err(Error::SizeMismatch { expected: 0x28, actual: 0x29 })
        ));
        assert!(Apploader::from_bytes(&data[..0x10]).is_err());
    }

    #[test]
    fn test_round_trip_keeps_unknown_header_bytes() {
        let mut data = sample(&[0xAA; 8], &[0xBB; 4]);
        data[0x0C] = 0x7F;
        data[0x1D] = 0x42;
        let apploader = Apploader::from_bytes(&data).unwrap();
        assert_eq!(apploader.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_set_entry_point_bounds() {
        let mut apploader = Apploader::from_bytes(&sample(&[0; 4], &[])).unwrap();
        assert!(apploader.set_entry_point(MIN_ENTRY_POINT).is_ok());
        assert!(apploader.set_entry_point(MAX_ENTRY_POINT - 4).is_ok());
        assert!(apploader.set_entry_point(MAX_ENTRY_POINT).is_err());
        assert!(apploader.set_entry_point(0x8000_2FFC).is_err());
        assert_eq!(apploader.entry_point(), MAX_ENTRY_POINT - 4);
    }

    #[test]
    fn test_set_loader_data_pads_and_keeps_trailer() {
        let mut apploader = Apploader::from_bytes(&sample(&[1; 8], &[9; 4])).unwrap();
        apploader.set_loader_data(&[7, 7, 7, 7, 7]).unwrap();

        assert_eq!(apploader.loader(), &[7, 7, 7, 7, 7, 0, 0, 0]);
        assert_eq!(apploader.trailer(), &[9; 4]);

        let encoded = apploader.to_bytes().unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE + 8 + 4);
        assert_eq!(&encoded[0x14..0x18], &8u32.to_be_bytes());
        assert_eq!(Apploader::from_bytes(&encoded).unwrap(), apploader);
    }

    #[test]
    fn test_set_segment_rejects_empty_and_oversized() {
        let mut apploader = Apploader::from_bytes(&sample(&[1; 4], &[2; 4])).unwrap();
        assert!(apploader.set_trailer_data(&[]).is_err());
        assert!(apploader
            .set_loader_data(&vec![0u8; MAX_SEGMENT_SIZE])
            .is_err());
        assert_eq!(apploader.loader(), &[1; 4]);
        assert_eq!(apploader.trailer(), &[2; 4]);
    }

    #[test]
    fn test_set_build_date() {
        let mut apploader = Apploader::from_bytes(&sample(&[0; 4], &[])).unwrap();
        apploader.set_build_date(NaiveDate::from_ymd_opt(2001, 9, 14).unwrap());
        let encoded = apploader.to_bytes().unwrap();
        assert_eq!(&encoded[..11], b"2001/09/14\0");
    }
}
