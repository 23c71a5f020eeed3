use std::path::Path;

use gcdisc::{AlignmentRuleset, DiscImage, DiscLayout};

use crate::error::Result;
use crate::utils;

pub fn run(
    source: &Path,
    destination: &Path,
    alignment: Option<&Path>,
    disc_size: Option<&str>,
) -> Result<()> {
    let mut layout = DiscLayout::default();
    if let Some(size) = disc_size {
        layout = layout.with_disc_size(utils::parse_size(size)?);
    }
    let mut image = DiscImage::from_directory(source, layout)?;
    if let Some(rules) = alignment {
        image.set_alignment_rules(AlignmentRuleset::from_file(rules)?);
    }
    image.write_image_file(destination)?;
    println!(
        "Wrote {} ({} files, {:#x} bytes)",
        destination.display(),
        image.fst().file_count(),
        layout.disc_size
    );
    Ok(())
}
