//! Assigning disc positions to files.
//!
//! Files are packed against the end of the addressable range: the last file
//! in table order ends as close to `max_pos` as its alignment allows, the one
//! before it ends at or below that file's start, and so on down to the first.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use super::{Entry, FileSystemTable};
use crate::binary::align_down;
use crate::error::{Error, Result};

pub const DEFAULT_ALIGNMENT: u32 = 4;

fn default_alignment() -> u32 {
    DEFAULT_ALIGNMENT
}

/// Extension to alignment mapping used by placement.
///
/// Stored as JSON:
///
/// ```json
/// { "default": 4, "extensions": { "thp": 32768, "adp": 32768 } }
/// ```
///
/// Extensions are matched case-insensitively and without the leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentRuleset {
    #[serde(default = "default_alignment")]
    pub default: u32,
    #[serde(default)]
    pub extensions: BTreeMap<String, u32>,
}

impl Default for AlignmentRuleset {
    fn default() -> Self {
        AlignmentRuleset {
            default: DEFAULT_ALIGNMENT,
            extensions: BTreeMap::new(),
        }
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}

impl AlignmentRuleset {
    pub fn with_rule(mut self, extension: &str, alignment: u32) -> Self {
        self.extensions
            .insert(normalize_extension(extension), alignment);
        self
    }

    /// Alignment for a file called `name`
    pub fn alignment_for(&self, name: &str) -> u32 {
        name.rsplit_once('.')
            .and_then(|(_, extension)| self.extensions.get(&extension.to_ascii_lowercase()))
            .copied()
            .unwrap_or(self.default)
    }

    /// Load a ruleset from a JSON reader
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let parsed: AlignmentRuleset = serde_json::from_reader(reader)?;
        parsed.normalized()
    }

    /// Load a ruleset from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    fn normalized(self) -> Result<Self> {
        if self.default == 0 {
            return Err(Error::OutOfRange(
                "default alignment must be non-zero".to_string(),
            ));
        }
        let mut extensions = BTreeMap::new();
        for (extension, alignment) in self.extensions {
            if alignment == 0 {
                return Err(Error::OutOfRange(format!(
                    "alignment for '{extension}' must be non-zero"
                )));
            }
            extensions.insert(normalize_extension(&extension), alignment);
        }
        Ok(AlignmentRuleset {
            default: self.default,
            extensions,
        })
    }
}

impl FileSystemTable {
    /// Re-place every file, last to first, packed down from `max_pos`.
    ///
    /// Each file ends at or below the start of the file after it and starts on
    /// its extension's alignment. Fails with `OutOfRange`, leaving every
    /// position untouched, once a file would start below `min_pos`.
    pub fn recalculate_positions(&mut self, rules: &AlignmentRuleset) -> Result<()> {
        self.relocate(self.min_pos, self.max_pos, rules)
    }

    /// Move the table to the range `[min_pos, max_pos)` and re-place every
    /// file inside it. Nothing changes on failure.
    pub fn relocate(&mut self, min_pos: u32, max_pos: u32, rules: &AlignmentRuleset) -> Result<()> {
        if min_pos > max_pos {
            return Err(Error::OutOfRange(format!(
                "empty range [{min_pos:#x}, {max_pos:#x})"
            )));
        }
        let files: Vec<(u32, u32)> = self
            .file_entries()
            .map(|(index, _, size)| (index, size))
            .collect();

        let mut boundary = u64::from(max_pos);
        let mut placed = Vec::with_capacity(files.len());
        for &(index, size) in files.iter().rev() {
            let alignment = u64::from(rules.alignment_for(&self.name(index)).max(1));
            let start = boundary.checked_sub(u64::from(size)).ok_or_else(|| {
                Error::OutOfRange(format!(
                    "file {index} ({size:#x} bytes) does not fit below {boundary:#x}"
                ))
            })?;
            let position = align_down(start, alignment);
            if position < u64::from(min_pos) {
                return Err(Error::OutOfRange(format!(
                    "file {index} would start at {position:#x}, below {min_pos:#x}"
                )));
            }
            placed.push((index, position as u32));
            boundary = position;
        }

        for (index, position) in placed {
            if let Some(Entry::File { position: slot, .. }) = self.entries.get_mut(index as usize) {
                *slot = position;
            }
        }
        self.min_pos = min_pos;
        self.max_pos = max_pos;
        log::debug!(
            "placed {} files, lowest position {boundary:#x}",
            files.len()
        );
        Ok(())
    }

    /// The lowest position any file occupies; `max_pos` when there are none
    pub fn lowest_position(&self) -> u32 {
        self.file_entries()
            .map(|(_, position, _)| position)
            .min()
            .unwrap_or(self.max_pos)
    }
}
