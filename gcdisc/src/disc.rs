//! Disc image
//! ----------
//!
//! A complete image in the order the console reads it:
//!
//! ```ascii
//!     [BootHeader]        /* 0x0000, 0x440 bytes */
//!     [BootInfo]          /* 0x0440, 0x2000 bytes */
//!     [Apploader]         /* 0x2440, length from its own header */
//!     [FileSystemTable]   /* at boot.fst_offset, boot.fst_size bytes */
//!     [Executable]        /* at boot.executable_offset */
//!     [Byte[]:payloads]   /* at the positions the FST records */
//! ```
//!
//! Gaps between regions are zero-filled. `DiscImage` keeps the payloads in
//! memory keyed by the stored bytes of their root-relative path (names are
//! often Shift-JIS), next to the table that places them, and every mutation
//! updates both together.

pub mod layout;
mod tree;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::apploader::Apploader;
use crate::bi2::{BootInfo, BOOT_INFO_SIZE};
use crate::boot::{BootHeader, BOOT_HEADER_SIZE};
use crate::error::{Error, Result};
use crate::executable::Executable;
use crate::fst::{AlignmentRuleset, EntryKind, FileSystemTable};

pub use layout::{DiscLayout, Placement};
use layout::ImageWriter;

pub const BOOT_INFO_OFFSET: usize = BOOT_HEADER_SIZE;
pub const APPLOADER_OFFSET: usize = BOOT_INFO_OFFSET + BOOT_INFO_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscImage {
    boot: BootHeader,
    info: BootInfo,
    apploader: Apploader,
    executable: Executable,
    fst: FileSystemTable,
    files: BTreeMap<Vec<u8>, Vec<u8>>,
    layout: DiscLayout,
    rules: AlignmentRuleset,
}

fn region<'a>(image: &'a [u8], offset: u64, len: u64, what: &str) -> Result<&'a [u8]> {
    let end = offset + len;
    if end > image.len() as u64 {
        return Err(Error::OutOfRange(format!(
            "{what} at [{offset:#x}, {end:#x}) lies outside the {:#x}-byte image",
            image.len()
        )));
    }
    Ok(&image[offset as usize..end as usize])
}

fn u32_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::OutOfRange(format!("{what} of {len:#x} bytes is too large")))
}

impl DiscImage {
    /// An image with the given system files and no payloads
    pub fn new(
        boot: BootHeader,
        info: BootInfo,
        apploader: Apploader,
        executable: Executable,
        layout: DiscLayout,
    ) -> Result<Self> {
        if !boot.is_valid() || !info.is_valid() {
            return Err(Error::InvalidFormat(
                "boot header and boot info must be initialized".to_string(),
            ));
        }
        Ok(DiscImage {
            boot,
            info,
            apploader,
            executable,
            fst: FileSystemTable::new(0, layout.disc_size),
            files: BTreeMap::new(),
            layout,
            rules: AlignmentRuleset::default(),
        })
    }

    /// Decode a complete image, cross-checking every region the headers
    /// declare against the image itself.
    pub fn from_image_bytes(image: &[u8]) -> Result<Self> {
        let boot = BootHeader::from_bytes(region(image, 0, BOOT_HEADER_SIZE as u64, "boot header")?)?;
        let info = BootInfo::from_bytes(region(
            image,
            BOOT_INFO_OFFSET as u64,
            BOOT_INFO_SIZE as u64,
            "boot info",
        )?)?;

        let apploader_tail = image.get(APPLOADER_OFFSET..).unwrap_or_default();
        let apploader_len = Apploader::declared_len(apploader_tail)?;
        let apploader = Apploader::from_bytes(region(
            image,
            APPLOADER_OFFSET as u64,
            apploader_len as u64,
            "apploader",
        )?)?;

        // The headers were just decoded, so every field is present.
        let fst_offset = boot.fst_offset().unwrap_or_default();
        let fst_size = boot.fst_size().unwrap_or_default();
        let fst_capacity = boot.fst_capacity().unwrap_or_default();
        let executable_offset = boot.executable_offset().unwrap_or_default();
        if fst_size > fst_capacity {
            return Err(Error::InvalidFormat(format!(
                "file system table size {fst_size:#x} exceeds its capacity {fst_capacity:#x}"
            )));
        }
        let fst_bytes = region(image, u64::from(fst_offset), u64::from(fst_size), "file system table")?;
        let executable = Executable::from_image(image, executable_offset as usize)?;

        let system_end = [
            (APPLOADER_OFFSET + apploader_len) as u64,
            u64::from(fst_offset) + u64::from(fst_size),
            u64::from(executable_offset) + executable.len() as u64,
        ]
        .into_iter()
        .max()
        .unwrap_or_default();
        let disc_size = u32_len(image.len(), "image")?;
        let first_file_offset = boot.first_file_offset().unwrap_or_default();
        if u64::from(first_file_offset) != system_end && first_file_offset != 0 {
            log::debug!(
                "first file offset {first_file_offset:#x} differs from the end of the system regions {system_end:#x}"
            );
        }
        let fst = FileSystemTable::from_bytes(fst_bytes, u32::try_from(system_end)?, disc_size)?;

        let mut files = BTreeMap::new();
        for (index, position, size) in fst.file_entries() {
            let key = fst.raw_path_of(index)?;
            let payload = region(
                image,
                u64::from(position),
                u64::from(size),
                &String::from_utf8_lossy(&key),
            )?;
            files.insert(key, payload.to_vec());
        }

        log::debug!(
            "decoded image: {} files, file system table at {fst_offset:#x}, executable at {executable_offset:#x}",
            files.len()
        );
        Ok(DiscImage {
            boot,
            info,
            apploader,
            executable,
            fst,
            files,
            layout: DiscLayout {
                disc_size,
                ..DiscLayout::default()
            },
            rules: AlignmentRuleset::default(),
        })
    }

    pub fn from_image_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        Self::from_image_bytes(&data)
    }

    /// Lay the image out and return the placement plus the updated header and table
    fn plan(&self) -> Result<(Placement, BootHeader, FileSystemTable)> {
        if !self.boot.is_valid() || !self.info.is_valid() {
            return Err(Error::InvalidFormat(
                "boot header and boot info must be initialized".to_string(),
            ));
        }
        let mut fst = self.fst.clone();
        let placement = self.layout.place(
            APPLOADER_OFFSET + self.apploader.len(),
            fst.encoded_len(),
            self.executable.len(),
        )?;
        fst.relocate(placement.first_file_offset, self.layout.disc_size, &self.rules)?;

        let mut boot = self.boot.clone();
        boot.set_fst_offset(placement.fst_offset);
        boot.set_fst_size(placement.fst_size);
        boot.set_fst_capacity(placement.fst_size);
        boot.set_executable_offset(placement.executable_offset);
        boot.set_first_file_offset(placement.first_file_offset);
        log::debug!("layout: {placement:?}");
        Ok((placement, boot, fst))
    }

    /// Compute the layout and stream the whole image into `writer`.
    ///
    /// Exactly `disc_size` bytes are written. The in-memory image is left as
    /// it was; use [`DiscImage::apply_layout`] to keep the new offsets.
    pub fn write_image<W: Write>(&self, writer: W) -> Result<W> {
        let (placement, boot, fst) = self.plan()?;
        let missing = || Error::InvalidFormat("uninitialized header".to_string());

        let mut out = ImageWriter::new(writer);
        out.write_region(0, &boot.to_bytes().ok_or_else(missing)?)?;
        out.write_region(BOOT_INFO_OFFSET as u64, &self.info.to_bytes().ok_or_else(missing)?)?;
        out.write_region(APPLOADER_OFFSET as u64, &self.apploader.to_bytes()?)?;
        out.write_region(u64::from(placement.fst_offset), &fst.to_bytes()?)?;
        out.write_region(u64::from(placement.executable_offset), self.executable.as_bytes())?;

        let mut payloads: Vec<(u32, u32)> = fst
            .file_entries()
            .map(|(index, position, _)| (position, index))
            .collect();
        payloads.sort_unstable();
        for (position, index) in payloads {
            let key = fst.raw_path_of(index)?;
            let payload = self.files.get(&key).ok_or_else(|| {
                Error::NotFound(format!("payload for {}", String::from_utf8_lossy(&key)))
            })?;
            out.write_region(u64::from(position), payload)?;
        }
        out.pad_to(u64::from(self.layout.disc_size))?;
        log::debug!("wrote {:#x} bytes", out.position());
        out.finish()
    }

    pub fn to_image_bytes(&self) -> Result<Vec<u8>> {
        self.write_image(Vec::new())
    }

    pub fn write_image_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_image(BufWriter::new(file))?;
        Ok(())
    }

    /// Store the offsets and positions the next written image will use
    pub fn apply_layout(&mut self) -> Result<Placement> {
        let (placement, boot, fst) = self.plan()?;
        self.boot = boot;
        self.fst = fst;
        Ok(placement)
    }

    /// Add (or overwrite) the file at `path`, creating missing directories
    pub fn add_file(&mut self, path: &str, data: Vec<u8>) -> Result<u32> {
        let mut fst = self.fst.clone();
        let index = fst.create_path(path, EntryKind::File)?;
        self.store_file(fst, index, data)
    }

    /// `add_file` for a raw path; only `/` separates its components
    pub fn add_file_bytes(&mut self, path: &[u8], data: Vec<u8>) -> Result<u32> {
        let mut fst = self.fst.clone();
        let index = fst.create_path_bytes(path, EntryKind::File)?;
        self.store_file(fst, index, data)
    }

    /// Commit `fst` with `data` as the contents of its file `index`
    fn store_file(&mut self, mut fst: FileSystemTable, index: u32, data: Vec<u8>) -> Result<u32> {
        let key = fst.raw_path_of(index)?;
        let size = u32_len(data.len(), &String::from_utf8_lossy(&key))?;
        fst.set_file_position(index, fst.min_pos())?;
        fst.set_file_size(index, size)?;
        self.fst = fst;
        self.files.insert(key, data);
        Ok(index)
    }

    /// Add an empty directory at `path`
    pub fn add_directory(&mut self, path: &str) -> Result<u32> {
        self.fst.create_path(path, EntryKind::Directory)
    }

    pub fn add_directory_bytes(&mut self, path: &[u8]) -> Result<u32> {
        self.fst.create_path_bytes(path, EntryKind::Directory)
    }

    /// Replace the contents of an existing file
    pub fn replace_file(&mut self, path: &str, data: Vec<u8>) -> Result<()> {
        let index = self.fst.find_entry(path)?;
        if !self.fst.entry(index).is_some_and(|entry| entry.is_file()) {
            return Err(Error::NotFound(format!("file {path}")));
        }
        self.store_file(self.fst.clone(), index, data)?;
        Ok(())
    }

    /// Remove the file or directory at `path`
    pub fn remove(&mut self, path: &str, recursive: bool) -> Result<()> {
        let index = self.fst.find_entry(path)?;
        let end = self.fst.subtree_end(index).unwrap_or(index + 1);
        let mut removed = Vec::new();
        for entry in index..end {
            if self.fst.entry(entry).is_some_and(|e| e.is_file()) {
                removed.push(self.fst.raw_path_of(entry)?);
            }
        }
        self.fst.remove_entry(index, recursive)?;
        for key in removed {
            self.files.remove(&key);
        }
        Ok(())
    }

    /// Contents of the file at `path`
    pub fn file_data(&self, path: &str) -> Result<&[u8]> {
        self.entry_data(self.fst.find_entry(path)?)
    }

    /// Contents of the file entry `index`
    pub fn entry_data(&self, index: u32) -> Result<&[u8]> {
        if !self.fst.entry(index).is_some_and(|entry| entry.is_file()) {
            return Err(Error::NotFound(format!("file entry {index}")));
        }
        let key = self.fst.raw_path_of(index)?;
        self.files.get(&key).map(Vec::as_slice).ok_or_else(|| {
            Error::NotFound(format!("payload for {}", String::from_utf8_lossy(&key)))
        })
    }

    pub fn boot_header(&self) -> &BootHeader {
        &self.boot
    }

    pub fn boot_header_mut(&mut self) -> &mut BootHeader {
        &mut self.boot
    }

    pub fn boot_info(&self) -> &BootInfo {
        &self.info
    }

    pub fn boot_info_mut(&mut self) -> &mut BootInfo {
        &mut self.info
    }

    pub fn apploader(&self) -> &Apploader {
        &self.apploader
    }

    pub fn apploader_mut(&mut self) -> &mut Apploader {
        &mut self.apploader
    }

    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    pub fn set_executable(&mut self, executable: Executable) {
        self.executable = executable;
    }

    pub fn fst(&self) -> &FileSystemTable {
        &self.fst
    }

    pub fn layout(&self) -> &DiscLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: DiscLayout) {
        self.layout = layout;
    }

    pub fn alignment_rules(&self) -> &AlignmentRuleset {
        &self.rules
    }

    pub fn set_alignment_rules(&mut self, rules: AlignmentRuleset) {
        self.rules = rules;
    }
}
