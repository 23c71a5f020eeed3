//! Main executable
//! ---------------
//!
//! The executable is stored as-is; only its header is read, to learn how many
//! bytes it occupies on disc. The header is 0x100 bytes of big-endian words:
//!
//! ```ascii
//!     [UInt32[7]:text_offsets]    /* 0x00 */
//!     [UInt32[11]:data_offsets]   /* 0x1C */
//!     [UInt32[7]:text_addresses]  /* 0x48 */
//!     [UInt32[11]:data_addresses] /* 0x64 */
//!     [UInt32[7]:text_sizes]      /* 0x90 */
//!     [UInt32[11]:data_sizes]     /* 0xAC */
//!     [UInt32:bss_address]        /* 0xD8 */
//!     [UInt32:bss_size]           /* 0xDC */
//!     [UInt32:entry_point]        /* 0xE0 */
//! ```
//!
//! Sections with a zero offset or size are unused.

use std::io::Cursor;

use crate::binary::DiscBinaryReader;
use crate::error::{Error, Result};

pub const EXECUTABLE_HEADER_SIZE: usize = 0x100;

const TEXT_SECTIONS: usize = 7;
const DATA_SECTIONS: usize = 11;
const SECTIONS: usize = TEXT_SECTIONS + DATA_SECTIONS;
const SIZES_OFFSET: u64 = 0x90;
const ENTRY_POINT_OFFSET: u64 = 0xE0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    data: Vec<u8>,
}

fn read_words(header: &[u8], offset: u64, count: usize) -> Result<Vec<u32>> {
    let mut reader = Cursor::new(header);
    reader.set_position(offset);
    (0..count).map(|_| reader.read_disc_u32()).collect()
}

impl Executable {
    /// Wrap a complete executable; its length must match what its header declares
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let declared = Self::declared_len(&data)?;
        if declared != data.len() {
            return Err(Error::SizeMismatch {
                expected: declared,
                actual: data.len(),
            });
        }
        Ok(Executable { data })
    }

    /// Slice the executable out of a larger buffer starting at `offset`
    pub fn from_image(image: &[u8], offset: usize) -> Result<Self> {
        let tail = image.get(offset..).ok_or_else(|| {
            Error::OutOfRange(format!(
                "executable offset {offset:#x} is past the end of the image"
            ))
        })?;
        let len = Self::declared_len(tail)?;
        let data = tail.get(..len).ok_or(Error::SizeMismatch {
            expected: len,
            actual: tail.len(),
        })?;
        Ok(Executable {
            data: data.to_vec(),
        })
    }

    /// Total length declared by the header at the start of `prefix`: the end
    /// of the furthest section, and never less than the header itself.
    pub fn declared_len(prefix: &[u8]) -> Result<usize> {
        if prefix.len() < EXECUTABLE_HEADER_SIZE {
            return Err(Error::SizeMismatch {
                expected: EXECUTABLE_HEADER_SIZE,
                actual: prefix.len(),
            });
        }
        let header = &prefix[..EXECUTABLE_HEADER_SIZE];
        let offsets = read_words(header, 0, SECTIONS)?;
        let sizes = read_words(header, SIZES_OFFSET, SECTIONS)?;

        let mut len = EXECUTABLE_HEADER_SIZE as u64;
        for (offset, size) in offsets.into_iter().zip(sizes) {
            if offset == 0 || size == 0 {
                continue;
            }
            len = len.max(u64::from(offset) + u64::from(size));
        }
        Ok(usize::try_from(len)?)
    }

    pub fn entry_point(&self) -> Result<u32> {
        let mut reader = Cursor::new(&self.data);
        reader.set_position(ENTRY_POINT_OFFSET);
        reader.read_disc_u32()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
