//! A single file system table record.
//!
//! ```ascii
//!     [UInt8:type]            /* 0 = file, 1 = directory */
//!     [UInt24:name_offset]    /* into the name blob */
//!     [UInt32:position|parent]
//!     [UInt32:size|end]
//! ```

use crate::binary::{DiscBinaryReader, DiscBinaryWriter};
use crate::error::{Error, Result};

pub const ENTRY_SIZE: usize = 12;

const FILE_TAG: u8 = 0;
const DIRECTORY_TAG: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    File {
        name_offset: u32,
        /// Disc offset of the payload
        position: u32,
        size: u32,
    },
    Directory {
        name_offset: u32,
        /// Entry number of the enclosing directory
        parent: u32,
        /// One past the last entry number of this directory's subtree
        end: u32,
    },
}

impl Entry {
    pub fn from_binary_reader<R: DiscBinaryReader>(reader: &mut R) -> Result<Self> {
        let tag = reader.read_disc_u8()?;
        let name_offset = reader.read_disc_u24()?;
        let first = reader.read_disc_u32()?;
        let second = reader.read_disc_u32()?;
        match tag {
            FILE_TAG => Ok(Entry::File {
                name_offset,
                position: first,
                size: second,
            }),
            DIRECTORY_TAG => Ok(Entry::Directory {
                name_offset,
                parent: first,
                end: second,
            }),
            other => Err(Error::StructuralViolation(format!(
                "unknown entry type {other:#04x}"
            ))),
        }
    }

    pub fn write_to<W: DiscBinaryWriter>(&self, writer: &mut W) -> Result<()> {
        let (tag, name_offset, first, second) = match *self {
            Entry::File {
                name_offset,
                position,
                size,
            } => (FILE_TAG, name_offset, position, size),
            Entry::Directory {
                name_offset,
                parent,
                end,
            } => (DIRECTORY_TAG, name_offset, parent, end),
        };
        writer.write_disc_u8(tag)?;
        writer.write_disc_u24(name_offset)?;
        writer.write_disc_u32(first)?;
        writer.write_disc_u32(second)
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::File { .. } => EntryKind::File,
            Entry::Directory { .. } => EntryKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File { .. })
    }

    pub fn name_offset(&self) -> u32 {
        match *self {
            Entry::File { name_offset, .. } | Entry::Directory { name_offset, .. } => name_offset,
        }
    }

    pub(crate) fn name_offset_mut(&mut self) -> &mut u32 {
        match self {
            Entry::File { name_offset, .. } | Entry::Directory { name_offset, .. } => name_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use std::io::Cursor;

    #[test]
    fn test_decode_file_record() {
        let data = hex!("00 00 00 0C 00 45 6E 00 00 00 01 F4");
        let entry = Entry::from_binary_reader(&mut Cursor::new(&data)).unwrap();
        assert_eq!(
            entry,
            Entry::File {
                name_offset: 0x0C,
                position: 0x456E00,
                size: 500
            }
        );
        assert_eq!(entry.kind(), EntryKind::File);
    }

    #[test]
    fn test_decode_directory_record() {
        let data = hex!("01 00 01 00 00 00 00 02 00 00 00 09");
        let entry = Entry::from_binary_reader(&mut Cursor::new(&data)).unwrap();
        assert_eq!(
            entry,
            Entry::Directory {
                name_offset: 0x100,
                parent: 2,
                end: 9
            }
        );

        let mut out = Vec::new();
        entry.write_to(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let data = hex!("02 00 00 00 00 00 00 00 00 00 00 01");
        assert!(matches!(
            Entry::from_binary_reader(&mut Cursor::new(&data)),
            Err(Error::StructuralViolation(_))
        ));
    }
}
