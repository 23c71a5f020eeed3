//! Shape validation of a decoded table.
//!
//! A single forward pass keeps a stack of open directories. Before each entry
//! is checked, every directory whose `end` has been reached is popped, so the
//! top of the stack is always the directory the entry must belong to.

use super::entry::Entry;
use super::{is_valid_name, name_at};
use crate::error::{Error, Result};

struct Open {
    index: u32,
    end: u32,
}

pub(crate) fn validate(entries: &[Entry], names: &[u8], min_pos: u32, max_pos: u32) -> Result<()> {
    let count = u32::try_from(entries.len())?;
    match entries.first() {
        Some(&Entry::Directory {
            name_offset: 0,
            parent: 0,
            end,
        }) if end == count => {}
        Some(root) => {
            return Err(Error::StructuralViolation(format!(
                "bad root entry {root:?} for a table of {count} entries"
            )))
        }
        None => return Err(Error::StructuralViolation("empty table".to_string())),
    }

    let mut stack = vec![Open { index: 0, end: count }];
    for (index, entry) in entries.iter().enumerate().skip(1) {
        let index = index as u32;
        while stack.last().is_some_and(|open| open.end <= index) {
            stack.pop();
        }
        // The root spans the whole table, so it is never popped here.
        let Some(top) = stack.last() else {
            return Err(Error::StructuralViolation(format!(
                "entry {index} is outside the root directory"
            )));
        };

        match name_at(names, entry.name_offset()) {
            None => {
                return Err(Error::StructuralViolation(format!(
                    "entry {index} has a bad name offset {:#x}",
                    entry.name_offset()
                )))
            }
            Some(name) if !is_valid_name(name) => {
                return Err(Error::StructuralViolation(format!(
                    "entry {index} has an unusable name {:?}",
                    String::from_utf8_lossy(name)
                )))
            }
            Some(_) => {}
        }

        match *entry {
            Entry::File { position, size, .. } => {
                check_file_bounds(index, position, size, min_pos, max_pos)?;
            }
            Entry::Directory { parent, end, .. } => {
                if parent != top.index {
                    return Err(Error::StructuralViolation(format!(
                        "directory {index} records parent {parent}, expected {}",
                        top.index
                    )));
                }
                if end <= index || end > top.end {
                    return Err(Error::StructuralViolation(format!(
                        "directory {index} ends at {end}, outside ({index}, {}]",
                        top.end
                    )));
                }
                stack.push(Open { index, end });
            }
        }
    }
    Ok(())
}

/// `[position, position + size)` must lie within `[min_pos, max_pos)`.
pub(crate) fn check_file_bounds(
    index: u32,
    position: u32,
    size: u32,
    min_pos: u32,
    max_pos: u32,
) -> Result<()> {
    let end = u64::from(position) + u64::from(size);
    if position < min_pos || end > u64::from(max_pos) {
        return Err(Error::OutOfRange(format!(
            "file {index} occupies [{position:#x}, {end:#x}), outside [{min_pos:#x}, {max_pos:#x})"
        )));
    }
    Ok(())
}
