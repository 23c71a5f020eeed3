use std::path::Path;

use crate::error::Result;
use crate::utils;

pub fn run(path: &Path, destination: &Path) -> Result<()> {
    let image = utils::open_image(path)?;
    image.to_directory(destination)?;
    println!(
        "Extracted {} files to {}",
        image.fst().file_count(),
        destination.display()
    );
    Ok(())
}
