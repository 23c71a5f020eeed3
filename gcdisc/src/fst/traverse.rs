//! Walking the flattened tree and resolving paths.

use super::{components, Entry, FileSystemTable, RAW_SEPARATORS, TEXT_SEPARATORS};
use crate::error::{Error, Result};

/// Direct children of a directory, in table (and therefore name) order
pub struct Children<'a> {
    fst: &'a FileSystemTable,
    next: u32,
    end: u32,
}

impl Iterator for Children<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next >= self.end {
            return None;
        }
        let current = self.next;
        self.next = self.fst.next_sibling(current, false);
        Some(current)
    }
}

impl FileSystemTable {
    /// One past the last entry of `dir`'s subtree; `None` for files
    pub fn subtree_end(&self, dir: u32) -> Option<u32> {
        match self.entry(dir)? {
            Entry::Directory { end, .. } => Some(*end),
            Entry::File { .. } => None,
        }
    }

    pub fn first_child(&self, dir: u32) -> Option<u32> {
        let end = self.subtree_end(dir)?;
        (dir + 1 < end).then_some(dir + 1)
    }

    /// The last direct child of `dir` (not the last entry of its subtree)
    pub fn last_child(&self, dir: u32) -> Option<u32> {
        self.children(dir).last()
    }

    /// The entry after `entry` at the same level, or the first entry of its
    /// subtree when `recursive` is set. Files have no subtree to skip.
    ///
    /// The result may be past the parent's range; callers bound it.
    pub fn next_sibling(&self, entry: u32, recursive: bool) -> u32 {
        match self.entry(entry) {
            Some(Entry::Directory { end, .. }) if !recursive => *end,
            _ => entry + 1,
        }
    }

    pub fn previous_sibling(&self, entry: u32) -> Option<u32> {
        let parent = self.parent_of(entry)?;
        let mut previous = None;
        for child in self.children(parent) {
            if child == entry {
                return previous;
            }
            previous = Some(child);
        }
        None
    }

    /// Direct children of `dir`; empty for files
    pub fn children(&self, dir: u32) -> Children<'_> {
        let end = self.subtree_end(dir).unwrap_or(0);
        Children {
            fst: self,
            next: dir + 1,
            end,
        }
    }

    /// The directory containing `entry`; `None` for the root or an unknown entry.
    ///
    /// Files do not record their parent, so it is found by stepping backward to
    /// the nearest directory whose subtree still covers the file. The root
    /// covers everything, which bounds the walk at entry 0.
    pub fn parent_of(&self, entry: u32) -> Option<u32> {
        if entry == 0 {
            return None;
        }
        match self.entry(entry)? {
            Entry::Directory { parent, .. } => Some(*parent),
            Entry::File { .. } => (0..entry).rev().find(
                |&candidate| matches!(self.entry(candidate), Some(Entry::Directory { end, .. }) if *end > entry),
            ),
        }
    }

    /// The child of `dir` called `name`
    pub fn find_child(&self, dir: u32, name: &[u8]) -> Option<u32> {
        self.children(dir)
            .find(|&child| self.name_bytes(child) == name)
    }

    /// Resolve a root-relative path (separators `/` or `\`) to an entry number.
    ///
    /// The empty path, `.` and `/` all resolve to the root.
    pub fn find_entry(&self, path: &str) -> Result<u32> {
        self.find_entry_from(0, path)
    }

    /// Resolve `path` relative to the directory `base`
    pub fn find_entry_from(&self, base: u32, path: &str) -> Result<u32> {
        self.resolve(base, path.as_bytes(), TEXT_SEPARATORS)
    }

    /// Resolve a root-relative path of raw name bytes.
    ///
    /// Only `/` separates components, so names that are not UTF-8 (Shift-JIS
    /// on retail discs) resolve as stored.
    pub fn find_entry_bytes(&self, path: &[u8]) -> Result<u32> {
        self.resolve(0, path, RAW_SEPARATORS)
    }

    pub(crate) fn resolve(&self, base: u32, path: &[u8], separators: &[u8]) -> Result<u32> {
        if self.entry(base).is_none() {
            return Err(Error::NotFound(format!("entry {base}")));
        }
        let mut current = base;
        for component in components(path, separators) {
            current = self.find_child(current, component).ok_or_else(|| {
                Error::NotFound(String::from_utf8_lossy(path).into_owned())
            })?;
        }
        Ok(current)
    }

    /// Root-relative path of `entry` without a leading separator; `.` for the root
    pub fn path_of(&self, entry: u32) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.raw_path_of(entry)?).into_owned())
    }

    /// Like `path_of`, but built from the stored name bytes
    pub fn raw_path_of(&self, entry: u32) -> Result<Vec<u8>> {
        if self.entry(entry).is_none() {
            return Err(Error::NotFound(format!("entry {entry}")));
        }
        if entry == 0 {
            return Ok(b".".to_vec());
        }
        let mut segments: Vec<&[u8]> = Vec::new();
        let mut current = entry;
        while current != 0 {
            segments.push(self.name_bytes(current));
            current = self
                .parent_of(current)
                .ok_or_else(|| Error::NotFound(format!("parent of entry {current}")))?;
        }
        segments.reverse();
        Ok(segments.join(&b'/'))
    }

    /// Path of `entry` as seen from the directory `base`.
    ///
    /// `.` when both are the same entry, `/`-prefixed when `base` is the
    /// root and `./`-prefixed otherwise. Fails if `entry` is not below `base`.
    pub fn relative_path(&self, entry: u32, base: u32) -> Result<String> {
        if self.entry(entry).is_none() || self.entry(base).is_none() {
            return Err(Error::NotFound(format!("entry {entry} or {base}")));
        }
        if entry == base {
            return Ok(".".to_string());
        }
        let mut segments = Vec::new();
        let mut current = entry;
        while current != base {
            if current == 0 {
                return Err(Error::NotFound(format!(
                    "entry {entry} is not below entry {base}"
                )));
            }
            segments.push(self.name(current).into_owned());
            current = self
                .parent_of(current)
                .ok_or_else(|| Error::NotFound(format!("parent of entry {current}")))?;
        }
        segments.reverse();
        let prefix = if base == 0 { "/" } else { "./" };
        Ok(format!("{prefix}{}", segments.join("/")))
    }
}
