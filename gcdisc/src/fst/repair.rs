//! Forward-reference repair after the entry or name sequences are spliced.
//!
//! Entries refer to later entries (`parent`, `end`) by number and to the name
//! blob by byte offset. Inserting or erasing part of either sequence moves
//! everything behind the cut, so every reference at or past the cut has to
//! move by the same amount.

use super::entry::Entry;

/// One splice of the entry sequence and/or the name blob.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Shift<'a> {
    /// First entry number that moves
    pub at: u32,
    pub entries: i64,
    /// First name blob offset that moves
    pub name_at: u32,
    pub name_bytes: i64,
    /// Directories whose `end` is exactly `at` and grow with the splice.
    /// `None` moves every such `end`.
    pub owners: Option<&'a [u32]>,
}

impl Shift<'_> {
    /// A splice of the entry sequence only
    pub fn entries(at: u32, entries: i64) -> Self {
        Shift {
            at,
            entries,
            name_at: u32::MAX,
            name_bytes: 0,
            owners: None,
        }
    }

    /// A splice of the name blob only
    pub fn names(name_at: u32, name_bytes: i64) -> Self {
        Shift {
            at: u32::MAX,
            entries: 0,
            name_at,
            name_bytes,
            owners: None,
        }
    }
}

fn moved(value: u32, delta: i64) -> u32 {
    (i64::from(value) + delta) as u32
}

/// Apply `shift` to every reference in `entries`.
///
/// The root's name offset is fixed at zero and never moves.
pub(crate) fn shift_forward_refs(entries: &mut [Entry], shift: &Shift) {
    for (index, entry) in entries.iter_mut().enumerate() {
        if let Entry::Directory { parent, end, .. } = entry {
            if *parent >= shift.at {
                *parent = moved(*parent, shift.entries);
            }
            let owns_cut = *end == shift.at
                && shift
                    .owners
                    .map_or(true, |owners| owners.contains(&(index as u32)));
            if *end > shift.at || owns_cut {
                *end = moved(*end, shift.entries);
            }
        }
        if index != 0 {
            let name_offset = entry.name_offset_mut();
            if *name_offset >= shift.name_at {
                *name_offset = moved(*name_offset, shift.name_bytes);
            }
        }
    }
}
