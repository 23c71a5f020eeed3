use std::path::Path;

use crate::error::Result;
use crate::utils;

/// Decoding already cross-checks every region, so reaching the end means the image is sound
pub fn run(path: &Path) -> Result<()> {
    let image = utils::open_image(path)?;
    image.fst().validate()?;
    println!(
        "OK: {} entries, {} files",
        image.fst().len(),
        image.fst().file_count()
    );
    Ok(())
}
