//! Where each region of an image goes, and streaming the image out.

use std::io::Write;

use crate::binary::align_up;
use crate::error::{Error, Result};

/// Capacity of a single-layer mini-DVD
pub const DEFAULT_DISC_SIZE: u32 = 0x5705_8000;
pub const DEFAULT_REGION_ALIGNMENT: u32 = 0x100;
pub const DEFAULT_FIRST_FILE_ALIGNMENT: u32 = 0x8000;

const ZERO_CHUNK: usize = 0x8000;

/// Size and alignment parameters used when laying an image out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscLayout {
    pub disc_size: u32,
    /// Alignment of the file system table and of the executable
    pub region_alignment: u32,
    /// Alignment of the lowest offset file payloads may use
    pub first_file_alignment: u32,
}

impl Default for DiscLayout {
    fn default() -> Self {
        DiscLayout {
            disc_size: DEFAULT_DISC_SIZE,
            region_alignment: DEFAULT_REGION_ALIGNMENT,
            first_file_alignment: DEFAULT_FIRST_FILE_ALIGNMENT,
        }
    }
}

/// Offsets chosen for one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub fst_offset: u32,
    pub fst_size: u32,
    pub executable_offset: u32,
    pub first_file_offset: u32,
}

impl DiscLayout {
    pub fn with_disc_size(mut self, disc_size: u32) -> Self {
        self.disc_size = disc_size;
        self
    }

    /// Lay out the system regions that follow the apploader:
    ///
    /// ```ascii
    ///     [apploader]  ... pad ...  [fst]  ... pad ...  [executable]  ... pad ...  [files]
    /// ```
    pub fn place(&self, apploader_end: usize, fst_len: usize, executable_len: usize) -> Result<Placement> {
        if self.region_alignment == 0 || self.first_file_alignment == 0 {
            return Err(Error::OutOfRange("alignments must be non-zero".to_string()));
        }
        let region = u64::from(self.region_alignment);
        let fst_offset = align_up(apploader_end as u64, region);
        let executable_offset = align_up(fst_offset + fst_len as u64, region);
        let first_file_offset = align_up(
            executable_offset + executable_len as u64,
            u64::from(self.first_file_alignment),
        );
        if first_file_offset > u64::from(self.disc_size) {
            return Err(Error::OutOfRange(format!(
                "system regions end at {first_file_offset:#x}, past the disc size {:#x}",
                self.disc_size
            )));
        }
        Ok(Placement {
            fst_offset: u32::try_from(fst_offset)?,
            fst_size: u32::try_from(fst_len)?,
            executable_offset: u32::try_from(executable_offset)?,
            first_file_offset: u32::try_from(first_file_offset)?,
        })
    }
}

/// A writer that knows its position and can zero-fill up to a target offset
pub(crate) struct ImageWriter<W: Write> {
    inner: W,
    position: u64,
}

impl<W: Write> ImageWriter<W> {
    pub fn new(inner: W) -> Self {
        ImageWriter { inner, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn write_region(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.pad_to(offset)?;
        self.inner.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    /// Write zeros until `offset`. Regions must be written in ascending order.
    pub fn pad_to(&mut self, offset: u64) -> Result<()> {
        if offset < self.position {
            return Err(Error::OutOfRange(format!(
                "region at {offset:#x} overlaps data ending at {:#x}",
                self.position
            )));
        }
        let zeros = [0u8; ZERO_CHUNK];
        while self.position < offset {
            let step = (offset - self.position).min(ZERO_CHUNK as u64) as usize;
            self.inner.write_all(&zeros[..step])?;
            self.position += step as u64;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
