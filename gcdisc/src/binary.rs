//! Big-endian primitives shared by every on-disc structure.
//!
//! All multi-byte integers on the disc are stored in network byte order. The
//! decoders read them through [`DiscBinaryReader`] and the encoders write them
//! through [`DiscBinaryWriter`], so the in-memory types only ever hold
//! host-native values.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// DiscBinaryReader provides methods for reading the disc's binary primitives
pub trait DiscBinaryReader: Read {
    /// Read a boolean value (1 byte, any non-zero value is true)
    fn read_disc_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_disc_u8(&mut self) -> Result<u8> {
        Ok(self.read_u8()?)
    }

    /// Read a 16-bit unsigned integer (network byte order)
    fn read_disc_u16(&mut self) -> Result<u16> {
        Ok(self.read_u16::<BigEndian>()?)
    }

    /// Read a 24-bit unsigned integer (network byte order)
    fn read_disc_u24(&mut self) -> Result<u32> {
        Ok(self.read_u24::<BigEndian>()?)
    }

    /// Read a 32-bit unsigned integer (network byte order)
    fn read_disc_u32(&mut self) -> Result<u32> {
        Ok(self.read_u32::<BigEndian>()?)
    }

    /// Read exactly `length` bytes
    fn read_disc_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; length];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read a NUL-padded string occupying exactly `width` bytes.
    ///
    /// Everything from the first NUL onwards is dropped. Non-ASCII bytes are
    /// replaced rather than rejected, since retail discs do carry them.
    fn read_disc_fixed_string(&mut self, width: usize) -> Result<String> {
        let buffer = self.read_disc_bytes(width)?;
        let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
        Ok(String::from_utf8_lossy(&buffer[..end]).into_owned())
    }
}

impl<R: Read> DiscBinaryReader for R {}

/// DiscBinaryWriter is the encoding counterpart of [`DiscBinaryReader`]
pub trait DiscBinaryWriter: Write {
    fn write_disc_bool(&mut self, value: bool) -> Result<()> {
        Ok(self.write_u8(u8::from(value))?)
    }

    fn write_disc_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.write_u8(value)?)
    }

    fn write_disc_u16(&mut self, value: u16) -> Result<()> {
        Ok(self.write_u16::<BigEndian>(value)?)
    }

    /// Write the low 24 bits of `value`; larger values are rejected
    fn write_disc_u24(&mut self, value: u32) -> Result<()> {
        if value > 0x00FF_FFFF {
            return Err(Error::OutOfRange(format!(
                "{value:#x} does not fit in 24 bits"
            )));
        }
        Ok(self.write_u24::<BigEndian>(value)?)
    }

    fn write_disc_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.write_u32::<BigEndian>(value)?)
    }

    /// Write `value` NUL-padded to exactly `width` bytes.
    ///
    /// At least one terminating NUL must fit.
    fn write_disc_fixed_string(&mut self, value: &str, width: usize) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() >= width {
            return Err(Error::OutOfRange(format!(
                "string of {} bytes does not fit in a {width}-byte field",
                bytes.len()
            )));
        }
        self.write_all(bytes)?;
        self.write_all(&vec![0u8; width - bytes.len()])?;
        Ok(())
    }
}

impl<W: Write> DiscBinaryWriter for W {}

/// Round `value` up to the next multiple of `alignment` (which must be non-zero)
pub fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Round `value` down to a multiple of `alignment` (which must be non-zero)
pub fn align_down(value: u64, alignment: u64) -> u64 {
    value - value % alignment
}
