use std::path::Path;

use crate::error::Result;
use crate::utils;

fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value.map_or("N/A".to_string(), |v| v.to_string())
}

pub fn show(path: &Path) -> Result<()> {
    let image = utils::open_image(path)?;
    let boot = image.boot_header();
    let info = image.boot_info();
    let apploader = image.apploader();
    let fst = image.fst();

    println!("Disc image {}\n----------------", path.display());
    println!("Game code: {}", or_unknown(boot.game_code_text()));
    println!("Maker code: {}", or_unknown(boot.maker_code_text()));
    println!("Game name: {}", or_unknown(boot.game_name()));
    println!(
        "Disk id: {}, version: {}",
        or_unknown(boot.disk_id()),
        or_unknown(boot.disk_version())
    );
    println!(
        "Console: {}",
        boot.console_magic()
            .map_or("N/A".to_string(), |magic| format!("{:?}", magic))
    );
    println!("Region: {}", or_unknown(info.region()));
    println!(
        "Audio streaming: {}, buffer size: {}",
        or_unknown(boot.audio_streaming()),
        or_unknown(boot.stream_buffer_size())
    );
    println!(
        "Apploader: built {}, entry point {:#010x}, {:#x} bytes",
        apploader.build_date(),
        apploader.entry_point(),
        apploader.len()
    );
    println!(
        "Executable: offset {:#x}, {:#x} bytes",
        boot.executable_offset().unwrap_or_default(),
        image.executable().len()
    );
    println!(
        "File system table: offset {:#x}, {:#x} bytes (capacity {:#x}), {} entries, {} files",
        boot.fst_offset().unwrap_or_default(),
        boot.fst_size().unwrap_or_default(),
        boot.fst_capacity().unwrap_or_default(),
        fst.len(),
        fst.file_count()
    );
    println!(
        "First file offset: {:#x}",
        boot.first_file_offset().unwrap_or_default()
    );
    Ok(())
}
