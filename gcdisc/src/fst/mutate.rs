//! Creating, removing and editing entries.
//!
//! Every operation checks everything that can fail before touching the table,
//! so an error always leaves the previous (valid) table in place.

use std::cmp::Ordering;

use super::repair::{shift_forward_refs, Shift};
use super::validate::check_file_bounds;
use super::{
    components, is_valid_name, name_at, Entry, EntryKind, FileSystemTable, MAX_NAMES_LEN,
    RAW_SEPARATORS, TEXT_SEPARATORS,
};
use crate::error::{Error, Result};

/// Where a new child would go
enum Slot {
    Existing(u32),
    Insert(u32),
}

fn split_leaf<'a>(name: &'a [u8], separators: &[u8]) -> (Option<&'a [u8]>, &'a [u8]) {
    let is_separator = |b: &u8| separators.contains(b);
    let end = name.iter().rposition(|b| !is_separator(b)).map_or(0, |last| last + 1);
    let trimmed = &name[..end];
    match trimmed.iter().rposition(is_separator) {
        Some(split) => (Some(&trimmed[..split]), &trimmed[split + 1..]),
        None => (None, trimmed),
    }
}

impl FileSystemTable {
    fn require_dir(&self, dir: u32) -> Result<()> {
        match self.entry(dir) {
            Some(Entry::Directory { .. }) => Ok(()),
            Some(Entry::File { .. }) => Err(Error::NotFound(format!(
                "entry {dir} is a file, not a directory"
            ))),
            None => Err(Error::NotFound(format!("entry {dir}"))),
        }
    }

    fn slot_for(&self, dir: u32, name: &[u8], kind: EntryKind) -> Result<Slot> {
        for child in self.children(dir) {
            match self.name_bytes(child).cmp(name) {
                Ordering::Less => continue,
                Ordering::Equal => {
                    let existing = self.entries[child as usize].kind();
                    return if existing == kind {
                        Ok(Slot::Existing(child))
                    } else {
                        Err(Error::DuplicateConflict(format!(
                            "'{}' already exists as a {existing:?}",
                            String::from_utf8_lossy(name)
                        )))
                    };
                }
                Ordering::Greater => return Ok(Slot::Insert(child)),
            }
        }
        Ok(Slot::Insert(self.subtree_end(dir).unwrap_or(0)))
    }

    fn check_name(&self, name: &[u8], extra_bytes: usize) -> Result<()> {
        if !is_valid_name(name) {
            return Err(Error::OutOfRange(format!(
                "invalid entry name {:?}",
                String::from_utf8_lossy(name)
            )));
        }
        if self.names.len() + extra_bytes > MAX_NAMES_LEN {
            return Err(Error::OutOfRange(
                "name blob would exceed 24-bit addressing".to_string(),
            ));
        }
        Ok(())
    }

    /// `dir` and every directory above it
    fn ancestors_of_dir(&self, dir: u32) -> Vec<u32> {
        let mut chain = vec![dir];
        let mut current = dir;
        while let Some(parent) = self.parent_of(current) {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Create `name` inside the directory `dir`, keeping siblings sorted.
    ///
    /// `name` may carry a path prefix (`"sub/dir/file.bin"`), resolved from
    /// `dir`; the prefix must already exist. When a child with the same name
    /// and kind exists its entry number is returned and nothing changes.
    pub fn create_entry(&mut self, dir: u32, kind: EntryKind, name: &str) -> Result<u32> {
        self.create_entry_with(dir, kind, name.as_bytes(), TEXT_SEPARATORS)
    }

    /// `create_entry` for a raw name, where only `/` separates components
    pub fn create_entry_bytes(&mut self, dir: u32, kind: EntryKind, name: &[u8]) -> Result<u32> {
        self.create_entry_with(dir, kind, name, RAW_SEPARATORS)
    }

    fn create_entry_with(
        &mut self,
        dir: u32,
        kind: EntryKind,
        name: &[u8],
        separators: &[u8],
    ) -> Result<u32> {
        let (prefix, leaf) = split_leaf(name, separators);
        let parent = match prefix {
            Some(prefix) => self.resolve(dir, prefix, separators)?,
            None => dir,
        };
        self.require_dir(parent)?;
        self.check_name(leaf, 0)?;

        let slot = match self.slot_for(parent, leaf, kind)? {
            Slot::Existing(index) => return Ok(index),
            Slot::Insert(slot) => slot,
        };
        let name_len = leaf.len() + 1;
        self.check_name(leaf, name_len)?;

        let name_pos = if (slot as usize) < self.entries.len() {
            self.entries[slot as usize].name_offset()
        } else {
            self.names_end()
        };
        let ancestors = self.ancestors_of_dir(parent);

        shift_forward_refs(
            &mut self.entries,
            &Shift {
                at: slot,
                entries: 1,
                name_at: name_pos,
                name_bytes: name_len as i64,
                owners: Some(ancestors.as_slice()),
            },
        );
        let entry = match kind {
            EntryKind::File => Entry::File {
                name_offset: name_pos,
                position: self.min_pos,
                size: 0,
            },
            EntryKind::Directory => Entry::Directory {
                name_offset: name_pos,
                parent,
                end: slot + 1,
            },
        };
        self.entries.insert(slot as usize, entry);
        let mut bytes = leaf.to_vec();
        bytes.push(0);
        let at = name_pos as usize;
        self.names.splice(at..at, bytes);

        log::debug!(
            "created {kind:?} '{}' as entry {slot} under entry {parent}",
            String::from_utf8_lossy(leaf)
        );
        Ok(slot)
    }

    /// Create `path` from the root, adding any missing intermediate directories
    pub fn create_path(&mut self, path: &str, kind: EntryKind) -> Result<u32> {
        self.create_path_with(path.as_bytes(), kind, TEXT_SEPARATORS)
    }

    /// `create_path` for a raw path, where only `/` separates components
    pub fn create_path_bytes(&mut self, path: &[u8], kind: EntryKind) -> Result<u32> {
        self.create_path_with(path, kind, RAW_SEPARATORS)
    }

    fn create_path_with(&mut self, path: &[u8], kind: EntryKind, separators: &[u8]) -> Result<u32> {
        let parts: Vec<&[u8]> = components(path, separators).collect();
        let Some((leaf, dirs)) = parts.split_last() else {
            return Err(Error::OutOfRange(format!(
                "invalid entry path {:?}",
                String::from_utf8_lossy(path)
            )));
        };

        // Dry run so a conflict deep in the path cannot leave half of it created.
        let mut current = Some(0);
        let mut new_bytes = 0;
        for (depth, part) in parts.iter().enumerate() {
            let part_kind = if depth == dirs.len() {
                kind
            } else {
                EntryKind::Directory
            };
            self.check_name(part, 0)?;
            current = match current {
                Some(dir) => match self.slot_for(dir, part, part_kind)? {
                    Slot::Existing(index) => Some(index),
                    Slot::Insert(_) => None,
                },
                None => None,
            };
            if current.is_none() {
                new_bytes += part.len() + 1;
            }
        }
        if self.names.len() + new_bytes > MAX_NAMES_LEN {
            return Err(Error::OutOfRange(
                "name blob would exceed 24-bit addressing".to_string(),
            ));
        }

        let mut dir = 0;
        for part in dirs {
            dir = self.create_entry_with(dir, EntryKind::Directory, part, separators)?;
        }
        self.create_entry_with(dir, kind, leaf, separators)
    }

    /// Remove `entry`, or with `recursive` a directory and its whole subtree.
    ///
    /// A non-empty directory is only removed when `recursive` is set. The root
    /// cannot be removed.
    pub fn remove_entry(&mut self, entry: u32, recursive: bool) -> Result<()> {
        let span_end = match self.entry(entry) {
            None => return Err(Error::NotFound(format!("entry {entry}"))),
            Some(_) if entry == 0 => {
                return Err(Error::OutOfRange(
                    "the root directory cannot be removed".to_string(),
                ))
            }
            Some(Entry::File { .. }) => entry + 1,
            Some(Entry::Directory { end, .. }) => {
                if *end > entry + 1 && !recursive {
                    return Err(Error::DirectoryNotEmpty(self.path_of(entry)?));
                }
                *end
            }
        };

        let mut name_ranges: Vec<(u32, u32)> = self.entries[entry as usize..span_end as usize]
            .iter()
            .filter_map(|removed| {
                let offset = removed.name_offset();
                name_at(&self.names, offset).map(|name| (offset, offset + name.len() as u32 + 1))
            })
            .collect();
        name_ranges.sort_unstable_by(|a, b| b.cmp(a));

        let removed = span_end - entry;
        self.entries.drain(entry as usize..span_end as usize);
        shift_forward_refs(&mut self.entries, &Shift::entries(span_end, -i64::from(removed)));

        for (start, end) in name_ranges {
            self.names.drain(start as usize..end as usize);
            shift_forward_refs(
                &mut self.entries,
                &Shift::names(end, -i64::from(end - start)),
            );
        }

        log::debug!("removed {removed} entries starting at entry {entry}");
        Ok(())
    }

    pub fn set_file_position(&mut self, entry: u32, position: u32) -> Result<()> {
        let (min_pos, max_pos) = (self.min_pos, self.max_pos);
        match self.entries.get_mut(entry as usize) {
            Some(Entry::File {
                position: current,
                size,
                ..
            }) => {
                check_file_bounds(entry, position, *size, min_pos, max_pos)?;
                *current = position;
                Ok(())
            }
            _ => Err(Error::NotFound(format!("file entry {entry}"))),
        }
    }

    pub fn set_file_size(&mut self, entry: u32, size: u32) -> Result<()> {
        let (min_pos, max_pos) = (self.min_pos, self.max_pos);
        match self.entries.get_mut(entry as usize) {
            Some(Entry::File {
                position,
                size: current,
                ..
            }) => {
                check_file_bounds(entry, *position, size, min_pos, max_pos)?;
                *current = size;
                Ok(())
            }
            _ => Err(Error::NotFound(format!("file entry {entry}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{encode, sample};
    use super::*;

    fn assert_consistent(fst: &FileSystemTable) {
        fst.validate().unwrap();
        for (index, _) in fst.iter() {
            let path = fst.path_of(index).unwrap();
            assert_eq!(fst.find_entry(&path).unwrap(), index, "{path}");
        }
        for (dir, entry) in fst.iter() {
            if entry.is_dir() {
                let names: Vec<&[u8]> = fst.children(dir).map(|c| fst.name_bytes(c)).collect();
                assert!(names.windows(2).all(|pair| pair[0] < pair[1]), "{names:?}");
            }
        }
    }

    #[test]
    fn test_insert_after_last_subdirectory() {
        let data = encode(&[(true, "data", 0, 2)]);
        let mut fst = FileSystemTable::from_bytes(&data, 0, 0x1000).unwrap();

        let index = fst.create_entry(0, EntryKind::File, "readme.txt").unwrap();

        assert_eq!(index, 2);
        assert_eq!(fst.len(), 3);
        assert_eq!(fst.subtree_end(0), Some(3));
        assert_eq!(fst.subtree_end(1), Some(2));
        assert_eq!(fst.path_of(index).unwrap(), "readme.txt");
        assert_consistent(&fst);
    }

    #[test]
    fn test_insert_in_name_order() {
        let mut fst = sample();
        let index = fst.create_entry(0, EntryKind::File, "banner.bnr").unwrap();
        assert_eq!(index, 4);
        assert_eq!(fst.name(5), "boot.bin");
        assert_eq!(fst.find_entry("data/level1/map.bin").unwrap(), 8);
        assert_consistent(&fst);

        let index = fst.create_entry(0, EntryKind::Directory, "zzz").unwrap();
        assert_eq!(index as usize, fst.len() - 1);
        assert_eq!(fst.subtree_end(index), Some(index + 1));
        assert_consistent(&fst);
    }

    #[test]
    fn test_insert_first_entry_moves_every_name() {
        let mut fst = sample();
        let before = fst.names_len();
        let index = fst.create_entry(0, EntryKind::File, "!first").unwrap();
        assert_eq!(index, 1);
        assert_eq!(fst.entry(1).unwrap().name_offset(), 0);
        assert_eq!(fst.names_len(), before + 7);
        assert_eq!(fst.name(2), "audio");
        assert_consistent(&fst);
    }

    #[test]
    fn test_insert_into_nested_directory_with_prefix() {
        let mut fst = sample();
        let index = fst
            .create_entry(0, EntryKind::File, "data/level1/enemies.bin")
            .unwrap();
        assert_eq!(index, 7);
        assert_eq!(fst.path_of(index).unwrap(), "data/level1/enemies.bin");
        assert_eq!(fst.subtree_end(6), Some(9));
        assert_eq!(fst.subtree_end(5), Some(10));
        assert_consistent(&fst);
    }

    #[test]
    fn test_insert_into_empty_directory_between_siblings() {
        let data = encode(&[(true, "a", 0, 2), (true, "b", 0, 3)]);
        let mut fst = FileSystemTable::from_bytes(&data, 0, 0x1000).unwrap();
        let index = fst.create_entry(1, EntryKind::File, "x").unwrap();
        assert_eq!(index, 2);
        assert_eq!(fst.subtree_end(1), Some(3));
        assert_eq!(fst.subtree_end(3), Some(4));
        assert_eq!(fst.path_of(2).unwrap(), "a/x");
        assert_consistent(&fst);
    }

    #[test]
    fn test_insert_existing_same_kind_is_noop() {
        let mut fst = sample();
        let before = fst.clone();
        assert_eq!(fst.create_entry(0, EntryKind::Directory, "data").unwrap(), 5);
        assert_eq!(fst.create_entry(5, EntryKind::File, "readme.txt").unwrap(), 8);
        assert_eq!(fst, before);
    }

    #[test]
    fn test_insert_existing_other_kind_conflicts() {
        let mut fst = sample();
        let before = fst.clone();
        assert!(matches!(
            fst.create_entry(0, EntryKind::File, "data"),
            Err(Error::DuplicateConflict(_))
        ));
        assert_eq!(fst, before);
    }

    #[test]
    fn test_insert_rejects_bad_targets() {
        let mut fst = sample();
        let before = fst.clone();
        assert!(fst.create_entry(4, EntryKind::File, "x").is_err());
        assert!(fst.create_entry(0, EntryKind::File, "missing/x").is_err());
        assert!(fst.create_entry(0, EntryKind::File, "").is_err());
        assert!(fst.create_entry(99, EntryKind::File, "x").is_err());
        assert_eq!(fst, before);
    }

    #[test]
    fn test_create_path_builds_directories() {
        let mut fst = FileSystemTable::new(0, 0x1000);
        let index = fst.create_path("a/b/c.bin", EntryKind::File).unwrap();
        assert_eq!(fst.path_of(index).unwrap(), "a/b/c.bin");
        assert_eq!(fst.len(), 4);
        fst.create_path("a/a.bin", EntryKind::File).unwrap();
        assert_eq!(fst.len(), 5);
        assert_consistent(&fst);
    }

    #[test]
    fn test_names_leaving_their_directory_rejected() {
        let mut fst = sample();
        let before = fst.clone();
        assert!(matches!(
            fst.create_path("../../escaped.txt", EntryKind::File),
            Err(Error::OutOfRange(_))
        ));
        assert!(fst.create_path("data/../../x", EntryKind::File).is_err());
        assert!(fst.create_entry(0, EntryKind::File, "..").is_err());
        assert!(fst.create_entry(5, EntryKind::Directory, "level1/..").is_err());
        assert!(fst.create_entry_bytes(0, EntryKind::File, b"..").is_err());
        assert!(fst.create_path_bytes(b"a/../b", EntryKind::File).is_err());
        assert_eq!(fst, before);
    }

    #[test]
    fn test_create_raw_names() {
        let mut fst = FileSystemTable::new(0, 0x1000);
        // Shift-JIS "ソ" ends in 0x5C
        let file = fst
            .create_path_bytes(b"\x83\x5C/\x82\xA0.bin", EntryKind::File)
            .unwrap();
        assert_eq!(file, 2);
        let first = fst
            .create_entry_bytes(0, EntryKind::File, b"\x82\xA2")
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(fst.len(), 4);
        assert_eq!(fst.name_bytes(2), b"\x83\x5C");
        assert_eq!(fst.raw_path_of(3).unwrap(), b"\x83\x5C/\x82\xA0.bin");
        assert_eq!(fst.find_entry_bytes(b"\x82\xA2").unwrap(), first);
        fst.validate().unwrap();
    }

    #[test]
    fn test_create_path_conflict_creates_nothing() {
        let mut fst = sample();
        let before = fst.clone();
        assert!(fst.create_path("boot.bin/x", EntryKind::File).is_err());
        assert!(fst.create_path("data/readme.txt", EntryKind::Directory).is_err());
        assert_eq!(fst, before);
    }

    #[test]
    fn test_remove_file() {
        let mut fst = sample();
        fst.remove_entry(2, false).unwrap();
        assert_eq!(fst.len(), 8);
        assert_eq!(fst.subtree_end(1), Some(3));
        assert_eq!(fst.find_entry("audio/se.dsp").unwrap(), 2);
        assert!(fst.find_entry("audio/bgm.adp").is_err());
        assert_consistent(&fst);
    }

    #[test]
    fn test_remove_non_empty_directory_requires_recursive() {
        let mut fst = sample();
        let before = fst.clone();
        assert!(matches!(
            fst.remove_entry(5, false),
            Err(Error::DirectoryNotEmpty(_))
        ));
        assert_eq!(fst, before);

        fst.remove_entry(5, true).unwrap();
        assert_eq!(fst.len(), 5);
        assert_eq!(fst.subtree_end(0), Some(5));
        assert!(fst.find_entry("data").is_err());
        assert_eq!(fst.names_len(), before.names_len() - 31);
        assert_consistent(&fst);
    }

    #[test]
    fn test_remove_middle_subtree() {
        let mut fst = sample();
        fst.remove_entry(1, true).unwrap();
        assert_eq!(fst.len(), 6);
        assert_eq!(fst.find_entry("data/readme.txt").unwrap(), 5);
        assert_eq!(fst.name(1), "boot.bin");
        assert_eq!(fst.entry(1).unwrap().name_offset(), 0);
        assert_consistent(&fst);
    }

    #[test]
    fn test_remove_empty_directory_non_recursive() {
        let data = encode(&[(true, "empty", 0, 2), (false, "f", 0, 0)]);
        let mut fst = FileSystemTable::from_bytes(&data, 0, 0x10).unwrap();
        fst.remove_entry(1, false).unwrap();
        assert_eq!(fst.len(), 2);
        assert_eq!(fst.name(1), "f");
        assert_consistent(&fst);
    }

    #[test]
    fn test_remove_root_or_missing() {
        let mut fst = sample();
        assert!(matches!(fst.remove_entry(0, true), Err(Error::OutOfRange(_))));
        assert!(matches!(fst.remove_entry(42, true), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_mixed_sequence_stays_valid() {
        let mut fst = sample();
        fst.create_path("movies/intro.thp", EntryKind::File).unwrap();
        fst.create_entry(0, EntryKind::File, "audio/aaa.adp").unwrap();
        fst.remove_entry(fst.find_entry("data/level1").unwrap(), true)
            .unwrap();
        fst.create_path("data/level2/map.bin", EntryKind::File).unwrap();
        fst.remove_entry(fst.find_entry("boot.bin").unwrap(), false)
            .unwrap();
        fst.create_entry(0, EntryKind::Directory, "audio/sub").unwrap();
        assert_consistent(&fst);

        let decoded =
            FileSystemTable::from_bytes(&fst.to_bytes().unwrap(), fst.min_pos(), fst.max_pos())
                .unwrap();
        assert_eq!(decoded, fst);
    }

    #[test]
    fn test_set_file_position_and_size() {
        let mut fst = sample();
        fst.set_file_position(4, 0x1F000).unwrap();
        fst.set_file_size(4, 0x1000).unwrap();
        assert!(matches!(
            fst.set_file_size(4, 0x1001),
            Err(Error::OutOfRange(_))
        ));
        assert!(fst.set_file_position(4, 0x100).is_err());
        assert!(fst.set_file_position(5, 0x10000).is_err());
        assert_eq!(
            fst.entry(4),
            Some(&Entry::File {
                name_offset: 0x15,
                position: 0x1F000,
                size: 0x1000
            })
        );
    }
}
