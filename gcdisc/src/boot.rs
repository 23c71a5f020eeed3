//! Disc header ("boot.bin")
//! ------------------------
//!
//! The first 0x440 bytes of every image identify the game and point at the
//! other regions of the disc:
//!
//! ```ascii
//!     0x000 [UInt32:game_code]
//!     0x004 [UInt16:maker_code]
//!     0x006 [UInt8:disk_id]
//!     0x007 [UInt8:disk_version]
//!     0x008 [Bool:audio_streaming]
//!     0x009 [UInt8:stream_buffer_size]
//!     0x01C [UInt32:console_magic]
//!     0x020 [Char[0x3E0]:game_name]          /* NUL padded */
//!     0x400 [UInt32:debug_monitor_offset]
//!     0x404 [UInt32:debug_monitor_address]
//!     0x420 [UInt32:executable_offset]
//!     0x424 [UInt32:fst_offset]
//!     0x428 [UInt32:fst_size]
//!     0x42C [UInt32:fst_capacity]
//!     0x430 [UInt32:fst_address]
//!     0x434 [UInt32:first_file_offset]
//! ```
//!
//! Bytes not listed above are carried through unchanged.
//!
//! A `BootHeader` can also be *uninitialized* (`BootHeader::default()`). Every
//! getter then returns `None` and every setter does nothing.

use std::io::{Cursor, Write};

use crate::binary::{DiscBinaryReader, DiscBinaryWriter};
use crate::error::{Error, Result};

pub const BOOT_HEADER_SIZE: usize = 0x440;

pub const GAME_NAME_WIDTH: usize = 0x3E0;

pub const GAMECUBE_MAGIC: u32 = 0xC233_9F3D;
pub const WII_MAGIC: u32 = 0x5D1C_9EA3;

/// Console signature stored at 0x1C
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMagic {
    GameCube,
    Wii,
    Unknown(u32),
}

impl From<u32> for ConsoleMagic {
    fn from(value: u32) -> Self {
        match value {
            GAMECUBE_MAGIC => ConsoleMagic::GameCube,
            WII_MAGIC => ConsoleMagic::Wii,
            other => ConsoleMagic::Unknown(other),
        }
    }
}

impl From<ConsoleMagic> for u32 {
    fn from(magic: ConsoleMagic) -> Self {
        match magic {
            ConsoleMagic::GameCube => GAMECUBE_MAGIC,
            ConsoleMagic::Wii => WII_MAGIC,
            ConsoleMagic::Unknown(value) => value,
        }
    }
}

#[derive(Debug, Clone)]
struct Fields {
    raw: Vec<u8>,
    game_code: u32,
    maker_code: u16,
    disk_id: u8,
    disk_version: u8,
    audio_streaming: bool,
    stream_buffer_size: u8,
    console_magic: u32,
    game_name: Vec<u8>,
    debug_monitor_offset: u32,
    debug_monitor_address: u32,
    executable_offset: u32,
    fst_offset: u32,
    fst_size: u32,
    fst_capacity: u32,
    fst_address: u32,
    first_file_offset: u32,
}

#[derive(Debug, Clone, Default)]
pub struct BootHeader {
    fields: Option<Box<Fields>>,
}

impl PartialEq for BootHeader {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for BootHeader {}

/// Getter and setter for a field stored as-is
macro_rules! field {
    ($(#[$doc:meta])* $get:ident, $set:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $get(&self) -> Option<$ty> {
            self.fields.as_ref().map(|f| f.$get)
        }

        pub fn $set(&mut self, value: $ty) {
            if let Some(f) = self.fields.as_mut() {
                f.$get = value;
            }
        }
    };
}

impl BootHeader {
    /// A zero-filled, valid header
    pub fn blank() -> Self {
        // A zeroed buffer of the right size always decodes.
        Self::from_bytes(&[0u8; BOOT_HEADER_SIZE]).unwrap_or_default()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != BOOT_HEADER_SIZE {
            return Err(Error::SizeMismatch {
                expected: BOOT_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let mut reader = Cursor::new(data);
        let game_code = reader.read_disc_u32()?;
        let maker_code = reader.read_disc_u16()?;
        let disk_id = reader.read_disc_u8()?;
        let disk_version = reader.read_disc_u8()?;
        let audio_streaming = reader.read_disc_bool()?;
        let stream_buffer_size = reader.read_disc_u8()?;
        reader.set_position(0x1C);
        let console_magic = reader.read_disc_u32()?;
        let game_name = reader.read_disc_bytes(GAME_NAME_WIDTH)?;
        let debug_monitor_offset = reader.read_disc_u32()?;
        let debug_monitor_address = reader.read_disc_u32()?;
        reader.set_position(0x420);

        Ok(BootHeader {
            fields: Some(Box::new(Fields {
                raw: data.to_vec(),
                game_code,
                maker_code,
                disk_id,
                disk_version,
                audio_streaming,
                stream_buffer_size,
                console_magic,
                game_name,
                debug_monitor_offset,
                debug_monitor_address,
                executable_offset: reader.read_disc_u32()?,
                fst_offset: reader.read_disc_u32()?,
                fst_size: reader.read_disc_u32()?,
                fst_capacity: reader.read_disc_u32()?,
                fst_address: reader.read_disc_u32()?,
                first_file_offset: reader.read_disc_u32()?,
            })),
        })
    }

    /// Encode the header; `None` for an uninitialized instance
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        let f = self.fields.as_ref()?;
        let mut out = f.raw.clone();
        // The buffer always has room for every field.
        encode_fields(f, &mut out).ok()?;
        Some(out)
    }

    pub fn is_valid(&self) -> bool {
        self.fields.is_some()
    }

    field!(game_code, set_game_code, u32);

    /// The game code as its four characters (e.g. "GALE")
    pub fn game_code_text(&self) -> Option<String> {
        self.game_code()
            .map(|code| String::from_utf8_lossy(&code.to_be_bytes()).into_owned())
    }

    field!(maker_code, set_maker_code, u16);

    /// The maker code as its two characters (e.g. "01")
    pub fn maker_code_text(&self) -> Option<String> {
        self.maker_code()
            .map(|code| String::from_utf8_lossy(&code.to_be_bytes()).into_owned())
    }

    field!(disk_id, set_disk_id, u8);
    field!(disk_version, set_disk_version, u8);
    field!(
        /// Whether the disc streams audio
        audio_streaming,
        set_audio_streaming,
        bool
    );
    field!(stream_buffer_size, set_stream_buffer_size, u8);

    pub fn console_magic(&self) -> Option<ConsoleMagic> {
        self.fields
            .as_ref()
            .map(|f| ConsoleMagic::from(f.console_magic))
    }

    pub fn set_console_magic(&mut self, magic: ConsoleMagic) {
        if let Some(f) = self.fields.as_mut() {
            f.console_magic = magic.into();
        }
    }

    /// Game title, up to the first NUL
    pub fn game_name(&self) -> Option<String> {
        self.fields.as_ref().map(|f| {
            let end = f
                .game_name
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(f.game_name.len());
            String::from_utf8_lossy(&f.game_name[..end]).into_owned()
        })
    }

    /// Replace the game title. It must leave room for a terminating NUL.
    pub fn set_game_name(&mut self, name: &str) -> Result<()> {
        let Some(f) = self.fields.as_mut() else {
            return Ok(());
        };
        let mut field = Vec::with_capacity(GAME_NAME_WIDTH);
        field.write_disc_fixed_string(name, GAME_NAME_WIDTH)?;
        f.game_name = field;
        Ok(())
    }

    field!(debug_monitor_offset, set_debug_monitor_offset, u32);
    field!(
        /// Virtual address the debug monitor is loaded at
        debug_monitor_address,
        set_debug_monitor_address,
        u32
    );
    field!(
        /// Disc offset of the main executable
        executable_offset,
        set_executable_offset,
        u32
    );
    field!(
        /// Disc offset of the file system table
        fst_offset,
        set_fst_offset,
        u32
    );
    field!(fst_size, set_fst_size, u32);
    field!(
        /// Largest file system table size any disc of a multi-disc set uses
        fst_capacity,
        set_fst_capacity,
        u32
    );
    field!(fst_address, set_fst_address, u32);
    field!(
        /// Lowest disc offset a file payload may be placed at
        first_file_offset,
        set_first_file_offset,
        u32
    );
}

fn encode_fields(f: &Fields, out: &mut [u8]) -> Result<()> {
    let mut writer = Cursor::new(out);
    writer.write_disc_u32(f.game_code)?;
    writer.write_disc_u16(f.maker_code)?;
    writer.write_disc_u8(f.disk_id)?;
    writer.write_disc_u8(f.disk_version)?;
    writer.write_disc_bool(f.audio_streaming)?;
    writer.write_disc_u8(f.stream_buffer_size)?;
    writer.set_position(0x1C);
    writer.write_disc_u32(f.console_magic)?;
    writer.write_all(&f.game_name)?;
    writer.write_disc_u32(f.debug_monitor_offset)?;
    writer.write_disc_u32(f.debug_monitor_address)?;
    writer.set_position(0x420);
    for value in [
        f.executable_offset,
        f.fst_offset,
        f.fst_size,
        f.fst_capacity,
        f.fst_address,
        f.first_file_offset,
    ] {
        writer.write_disc_u32(value)?;
    }
    Ok(())
}
