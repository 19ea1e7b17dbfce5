use std::io::{Cursor, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

/// Little-endian reader for packed on-disk structures (BPB, DAP).
///
/// Field offsets are part of the wire contract, so decoding always goes
/// through explicit reads at declared positions instead of overlay casts.
pub struct BinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Position the reader at an absolute byte offset.
    pub fn seek(&mut self, offset: u64) -> std::io::Result<()> {
        self.cursor.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn read_u8(&mut self) -> std::io::Result<u8> {
        self.cursor.read_u8()
    }

    pub fn read_u16(&mut self) -> std::io::Result<u16> {
        self.cursor.read_u16::<LittleEndian>()
    }

    pub fn read_u32(&mut self) -> std::io::Result<u32> {
        self.cursor.read_u32::<LittleEndian>()
    }

    pub fn read_u64(&mut self) -> std::io::Result<u64> {
        self.cursor.read_u64::<LittleEndian>()
    }

    /// Read `count` bytes starting at the current position.
    pub fn read_bytes(&mut self, count: usize) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        std::io::Read::read_exact(&mut self.cursor, &mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::BinaryReader;

    #[test]
    fn reads_little_endian_fields() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x12345678);
    }

    #[test]
    fn seek_positions_absolute() {
        let data = [0u8, 0, 0, 0xAA, 0x55];
        let mut reader = BinaryReader::new(&data);
        reader.seek(3).unwrap();
        assert_eq!(reader.read_u16().unwrap(), 0x55AA);
    }

    #[test]
    fn short_read_is_an_error() {
        let data = [0x01];
        let mut reader = BinaryReader::new(&data);
        assert!(reader.read_u16().is_err());
    }
}
