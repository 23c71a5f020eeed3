use std::path::Path;

use gcdisc::DiscImage;

use crate::error::{Error, Result};

/// Route `log` output to stderr; `--debug` lowers the threshold to debug,
/// `RUST_LOG` overrides either.
pub fn initialize_logging_from_args(matches: &clap::ArgMatches) {
    let level = if matches.is_present("debug") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    // A second initialization (tests) keeps the first logger.
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

pub fn open_image(path: &Path) -> Result<DiscImage> {
    log::debug!("reading image {}", path.display());
    Ok(DiscImage::from_image_file(path)?)
}

/// Parse a byte count given in decimal or as 0x-prefixed hex
pub fn parse_size(value: &str) -> Result<u32> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    };
    parsed.map_err(|_| Error::CliInputError(format!("'{}' is not a valid size", value)))
}
