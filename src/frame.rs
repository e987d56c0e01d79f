/// Reader and writer for length-prefixed binary strings.
///
/// Frame layout:
///   u32 L        (big- or little-endian, fixed per stream)
///   4 * L bytes  (UTF-8 text, right-padded with NUL bytes)
///
/// Trailing NULs are stripped on read, so strings that themselves end in
/// NUL do not survive a round trip.
use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::FrameError;

pub type Result<T> = std::result::Result<T, FrameError>;

/// Byte order of the length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

impl Endianness {
    fn decode_u32(self, bytes: &[u8; 4]) -> u32 {
        match self {
            Endianness::Big => BigEndian::read_u32(bytes),
            Endianness::Little => LittleEndian::read_u32(bytes),
        }
    }
}

/// Fill as much of `buf` as the reader allows. Returns the byte count.
fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

pub struct BinaryFrameReader<R> {
    reader: R,
    endian: Endianness,
}

impl<R: Read> BinaryFrameReader<R> {
    pub fn new(reader: R, endian: Endianness) -> Self {
        Self { reader, endian }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        let n = read_up_to(&mut self.reader, &mut buf)?;
        if n != 4 {
            return Err(FrameError::Truncated {
                expected: 4,
                actual: n,
            });
        }
        Ok(self.endian.decode_u32(&buf))
    }

    pub fn read_str(&mut self) -> Result<String> {
        let len = self.read_u32()?;
        self.read_payload(len)
    }

    /// Like `read_str`, but a clean end of stream before the length field
    /// yields `None`.
    pub fn try_read_str(&mut self) -> Result<Option<String>> {
        let mut buf = [0u8; 4];
        let n = read_up_to(&mut self.reader, &mut buf)?;
        match n {
            0 => Ok(None),
            4 => self.read_payload(self.endian.decode_u32(&buf)).map(Some),
            _ => Err(FrameError::Truncated {
                expected: 4,
                actual: n,
            }),
        }
    }

    fn read_payload(&mut self, len: u32) -> Result<String> {
        let expected = u64::from(len) * 4;
        let mut payload = Vec::new();
        (&mut self.reader).take(expected).read_to_end(&mut payload)?;
        if (payload.len() as u64) < expected {
            return Err(FrameError::Truncated {
                expected: expected as usize,
                actual: payload.len(),
            });
        }

        let end = payload
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |pos| pos + 1);
        payload.truncate(end);
        Ok(String::from_utf8(payload)?)
    }
}

impl<R: Read> Iterator for BinaryFrameReader<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_read_str().transpose()
    }
}

/// Produces frames `BinaryFrameReader` can decode.
pub struct FrameWriter<W> {
    writer: W,
    endian: Endianness,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W, endian: Endianness) -> Self {
        Self { writer, endian }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        match self.endian {
            Endianness::Big => self.writer.write_u32::<BigEndian>(value)?,
            Endianness::Little => self.writer.write_u32::<LittleEndian>(value)?,
        }
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        let bytes = s.as_bytes();
        let words = bytes.len().div_ceil(4);
        let len = u32::try_from(words).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "string too long for frame")
        })?;
        self.write_u32(len)?;
        self.writer.write_all(bytes)?;
        let padding = words * 4 - bytes.len();
        self.writer.write_all(&[0u8; 3][..padding])?;
        Ok(())
    }
}
