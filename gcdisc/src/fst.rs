//! File System Table
//! -----------------
//!
//! The FST is the disc's directory tree, flattened in pre-order into a table of
//! fixed-size records followed by a blob of NUL-terminated names:
//!
//! ```ascii
//!     (
//!         [Entry]             /* 12 bytes, see `entry::Entry` */
//!     )   /* repeat <root.end> times */
//!     [Byte[]:name_blob]
//! ```
//!
//! Entry 0 is the root directory. A directory's subtree is the contiguous run
//! of entry numbers between it and its `end`, so children are found by
//! walking forward and skipping each sub-directory's range.
//!
//! Siblings are kept in ascending byte order of their names. Lookups, inserts
//! and the placement pass all rely on that ordering and on the ranges staying
//! consistent, which is why every mutation finishes with a repair pass over
//! the whole table (see `repair`).

pub mod entry;
mod mutate;
pub mod placement;
mod repair;
mod traverse;
mod validate;

use std::borrow::Cow;
use std::io::Cursor;

use crate::error::{Error, Result};

pub use entry::{Entry, EntryKind, ENTRY_SIZE};
pub use placement::AlignmentRuleset;
pub use traverse::Children;

/// Name blob offsets are 24-bit
pub const MAX_NAMES_LEN: usize = 0x100_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemTable {
    entries: Vec<Entry>,
    names: Vec<u8>,
    min_pos: u32,
    max_pos: u32,
}

/// Separators accepted in `&str` paths
pub(crate) const TEXT_SEPARATORS: &[u8] = b"/\\";
/// Separators in raw byte paths. Shift-JIS trail bytes can be 0x5C, so `\`
/// is part of a name there.
pub(crate) const RAW_SEPARATORS: &[u8] = b"/";

/// The NUL-terminated name starting at `offset`, without its terminator
pub(crate) fn name_at(names: &[u8], offset: u32) -> Option<&[u8]> {
    let tail = names.get(offset as usize..)?;
    let len = tail.iter().position(|&b| b == 0)?;
    Some(&tail[..len])
}

/// Whether `name` can be stored as a single entry name.
///
/// `.` and `..` and anything holding `/` would resolve to some other place
/// once the tree is written out as directories.
pub(crate) fn is_valid_name(name: &[u8]) -> bool {
    !name.is_empty()
        && name != b"."
        && name != b".."
        && !name.contains(&b'/')
        && !name.contains(&0)
}

/// Path components, skipping empty and `.` ones
pub(crate) fn components<'a>(
    path: &'a [u8],
    separators: &'a [u8],
) -> impl Iterator<Item = &'a [u8]> + 'a {
    path.split(move |b| separators.contains(b))
        .filter(|component| !component.is_empty() && component[..] != *b".")
}

impl FileSystemTable {
    /// A table holding only the root directory.
    ///
    /// Files may be placed within `[min_pos, max_pos)`.
    pub fn new(min_pos: u32, max_pos: u32) -> Self {
        FileSystemTable {
            entries: vec![Entry::Directory {
                name_offset: 0,
                parent: 0,
                end: 1,
            }],
            names: Vec::new(),
            min_pos,
            max_pos,
        }
    }

    /// Decode and validate a table.
    ///
    /// Everything after the last record is taken as the name blob.
    pub fn from_bytes(data: &[u8], min_pos: u32, max_pos: u32) -> Result<Self> {
        if data.len() < ENTRY_SIZE {
            return Err(Error::SizeMismatch {
                expected: ENTRY_SIZE,
                actual: data.len(),
            });
        }
        let mut reader = Cursor::new(data);
        let root = Entry::from_binary_reader(&mut reader)?;
        let count = match root {
            Entry::Directory { end, .. } => end as usize,
            Entry::File { .. } => {
                return Err(Error::StructuralViolation(
                    "root entry is not a directory".to_string(),
                ))
            }
        };
        let table_len = count
            .checked_mul(ENTRY_SIZE)
            .filter(|&len| len <= data.len())
            .ok_or(Error::SizeMismatch {
                expected: count.saturating_mul(ENTRY_SIZE),
                actual: data.len(),
            })?;

        let mut entries = Vec::with_capacity(count);
        entries.push(root);
        for _ in 1..count {
            entries.push(Entry::from_binary_reader(&mut reader)?);
        }
        let names = data[table_len..].to_vec();

        validate::validate(&entries, &names, min_pos, max_pos)?;
        log::debug!(
            "decoded file system table: {} entries, {} name bytes",
            entries.len(),
            names.len()
        );
        Ok(FileSystemTable {
            entries,
            names,
            min_pos,
            max_pos,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.encoded_len());
        for entry in &self.entries {
            entry.write_to(&mut out)?;
        }
        out.extend_from_slice(&self.names);
        Ok(out)
    }

    /// Size of the encoded table in bytes
    pub fn encoded_len(&self) -> usize {
        self.entries.len() * ENTRY_SIZE + self.names.len()
    }

    /// Re-run the structural checks the decoder applies
    pub fn validate(&self) -> Result<()> {
        validate::validate(&self.entries, &self.names, self.min_pos, self.max_pos)
    }

    /// Number of entries, the root included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table holds nothing but the root
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    pub fn file_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_file()).count()
    }

    pub fn names_len(&self) -> usize {
        self.names.len()
    }

    pub fn entry(&self, index: u32) -> Option<&Entry> {
        self.entries.get(index as usize)
    }

    /// All entries in table order, paired with their entry numbers
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Entry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (index as u32, entry))
    }

    /// `(entry number, position, size)` of every file in table order
    pub fn file_entries(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        self.iter().filter_map(|(index, entry)| match *entry {
            Entry::File { position, size, .. } => Some((index, position, size)),
            Entry::Directory { .. } => None,
        })
    }

    /// Raw name bytes; empty for the root or an unknown entry
    pub fn name_bytes(&self, index: u32) -> &[u8] {
        match self.entry(index) {
            Some(entry) if index != 0 => name_at(&self.names, entry.name_offset()).unwrap_or(&[]),
            _ => &[],
        }
    }

    pub fn name(&self, index: u32) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes(index))
    }

    pub fn min_pos(&self) -> u32 {
        self.min_pos
    }

    pub fn max_pos(&self) -> u32 {
        self.max_pos
    }

    /// Change the addressable range. Fails, leaving the table unchanged, if a
    /// file would fall outside it.
    pub fn set_bounds(&mut self, min_pos: u32, max_pos: u32) -> Result<()> {
        for (index, position, size) in self.file_entries() {
            validate::check_file_bounds(index, position, size, min_pos, max_pos)?;
        }
        self.min_pos = min_pos;
        self.max_pos = max_pos;
        Ok(())
    }

    /// End of the last name in the blob; trailing padding is not counted
    fn names_end(&self) -> u32 {
        self.entries
            .iter()
            .skip(1)
            .filter_map(|entry| {
                name_at(&self.names, entry.name_offset())
                    .map(|name| entry.name_offset() + name.len() as u32 + 1)
            })
            .max()
            .unwrap_or(0)
    }
}
