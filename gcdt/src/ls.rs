use std::path::Path;

use gcdisc::Entry;

use crate::error::Result;
use crate::utils;

pub fn show(path: &Path, folder: Option<&str>) -> Result<()> {
    let image = utils::open_image(path)?;
    let fst = image.fst();
    let base = fst.find_entry(folder.unwrap_or(""))?;
    let end = fst.subtree_end(base).unwrap_or(base + 1);

    let title = if base == 0 {
        String::new()
    } else {
        fst.path_of(base)?
    };
    println!("Files in /{}\n----------------", title);
    let first = if fst.entry(base).is_some_and(|e| e.is_dir()) {
        base + 1
    } else {
        base
    };
    for index in first..end {
        let path = fst.relative_path(index, 0)?;
        match fst.entry(index) {
            Some(Entry::File { position, size, .. }) => {
                println!("{:#010x} {:#010x}  {}", position, size, path)
            }
            Some(Entry::Directory { .. }) => println!("{:>10} {:>10}  {}/", "<dir>", "", path),
            None => {}
        }
    }
    Ok(())
}
