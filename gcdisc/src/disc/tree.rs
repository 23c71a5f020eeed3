//! Unpacked images on the local file system.
//!
//! ```ascii
//!     <root>/sys/boot.bin
//!     <root>/sys/bi2.bin
//!     <root>/sys/apploader.img
//!     <root>/sys/main.dol
//!     <root>/sys/fst.bin      /* written for reference, ignored when reading */
//!     <root>/files/...        /* the disc's file tree */
//! ```

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Component, Path, PathBuf};

use super::{DiscImage, DiscLayout};
use crate::apploader::Apploader;
use crate::bi2::BootInfo;
use crate::boot::BootHeader;
use crate::error::{Error, Result};
use crate::executable::Executable;
use crate::fst::Entry;

pub const SYS_DIR: &str = "sys";
pub const FILES_DIR: &str = "files";
pub const BOOT_HEADER_FILE: &str = "boot.bin";
pub const BOOT_INFO_FILE: &str = "bi2.bin";
pub const APPLOADER_FILE: &str = "apploader.img";
pub const EXECUTABLE_FILE: &str = "main.dol";
pub const FST_FILE: &str = "fst.bin";

fn read_sys_file(root: &Path, name: &str) -> Result<Vec<u8>> {
    let path = root.join(SYS_DIR).join(name);
    fs::read(&path).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
        _ => Error::IoError(err),
    })
}

#[cfg(unix)]
fn raw_name(name: &OsStr) -> Result<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;
    Ok(name.as_bytes().to_vec())
}

#[cfg(not(unix))]
fn raw_name(name: &OsStr) -> Result<Vec<u8>> {
    name.to_str()
        .map(|name| name.as_bytes().to_vec())
        .ok_or_else(|| Error::InvalidFormat(format!("file name {name:?} is not valid UTF-8")))
}

#[cfg(unix)]
fn host_name(name: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    OsStr::from_bytes(name).to_os_string()
}

#[cfg(not(unix))]
fn host_name(name: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(name).into_owned())
}

/// The host file name for one entry name. Anything that is not a single
/// plain component (`..`, a drive prefix, an embedded separator) is refused.
fn host_component(name: &[u8]) -> Result<OsString> {
    let host = host_name(name);
    let single = {
        let mut parts = Path::new(&host).components();
        matches!((parts.next(), parts.next()), (Some(Component::Normal(_)), None))
    };
    if !single {
        return Err(Error::InvalidFormat(format!(
            "refusing to extract entry named {:?}",
            String::from_utf8_lossy(name)
        )));
    }
    Ok(host)
}

/// Every entry under `dir`, depth first, names in byte order.
///
/// Each item is the raw disc path, the host path and whether it is a directory.
fn walk(dir: &Path, prefix: &[u8], out: &mut Vec<(Vec<u8>, PathBuf, bool)>) -> Result<()> {
    let mut children = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    children.sort_by_key(|child| child.file_name());
    for child in children {
        let mut path = prefix.to_vec();
        if !path.is_empty() {
            path.push(b'/');
        }
        path.extend_from_slice(&raw_name(&child.file_name())?);
        let host = child.path();
        if child.file_type()?.is_dir() {
            out.push((path.clone(), host.clone(), true));
            walk(&host, &path, out)?;
        } else {
            out.push((path, host, false));
        }
    }
    Ok(())
}

impl DiscImage {
    /// Build an image from an unpacked directory tree
    pub fn from_directory<P: AsRef<Path>>(root: P, layout: DiscLayout) -> Result<Self> {
        let root = root.as_ref();
        let boot = BootHeader::from_bytes(&read_sys_file(root, BOOT_HEADER_FILE)?)?;
        let info = BootInfo::from_bytes(&read_sys_file(root, BOOT_INFO_FILE)?)?;
        let apploader = Apploader::from_bytes(&read_sys_file(root, APPLOADER_FILE)?)?;
        let executable = Executable::from_bytes(read_sys_file(root, EXECUTABLE_FILE)?)?;
        let mut image = DiscImage::new(boot, info, apploader, executable, layout)?;

        let files_root = root.join(FILES_DIR);
        let mut entries = Vec::new();
        if files_root.is_dir() {
            walk(&files_root, b"", &mut entries)?;
        } else {
            log::warn!("{} is missing, the image will hold no files", files_root.display());
        }
        for (path, host, is_dir) in entries {
            if is_dir {
                image.add_directory_bytes(&path)?;
            } else {
                image.add_file_bytes(&path, fs::read(&host)?)?;
            }
        }
        log::debug!(
            "read {} files from {}",
            image.files.len(),
            root.display()
        );
        Ok(image)
    }

    /// Unpack the image into `root`, creating it if needed
    pub fn to_directory<P: AsRef<Path>>(&self, root: P) -> Result<()> {
        let root = root.as_ref();
        let sys = root.join(SYS_DIR);
        fs::create_dir_all(&sys)?;
        let missing = || Error::InvalidFormat("uninitialized header".to_string());
        fs::write(sys.join(BOOT_HEADER_FILE), self.boot.to_bytes().ok_or_else(missing)?)?;
        fs::write(sys.join(BOOT_INFO_FILE), self.info.to_bytes().ok_or_else(missing)?)?;
        fs::write(sys.join(APPLOADER_FILE), self.apploader.to_bytes()?)?;
        fs::write(sys.join(EXECUTABLE_FILE), self.executable.as_bytes())?;
        fs::write(sys.join(FST_FILE), self.fst.to_bytes()?)?;

        let files_root = root.join(FILES_DIR);
        fs::create_dir_all(&files_root)?;
        for (index, entry) in self.fst.iter().skip(1) {
            let key = self.fst.raw_path_of(index)?;
            let mut target = files_root.clone();
            for name in key.split(|&b| b == b'/') {
                target.push(host_component(name)?);
            }
            match entry {
                Entry::Directory { .. } => fs::create_dir_all(&target)?,
                Entry::File { .. } => {
                    let data = self.files.get(&key).ok_or_else(|| {
                        Error::NotFound(format!("payload for {}", String::from_utf8_lossy(&key)))
                    })?;
                    fs::write(&target, data)?;
                }
            }
        }
        log::debug!("extracted {} files to {}", self.files.len(), root.display());
        Ok(())
    }
}
