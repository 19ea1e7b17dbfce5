use std::io;
use std::path::Path;

use log::{debug, warn};

use crate::utils::binary::BinaryReader;
use crate::utils::number::narrow;

/// Fallback sector size when the boot sector carries no readable BPB.
pub const SECTOR_SIZE: u64 = 512;

/// Geometry for a 1.44MB floppy, used when the BPB is not parseable.
const FALLBACK_SECTORS_PER_TRACK: u16 = 18;
const FALLBACK_HEADS: u16 = 2;

/// Boot-sector geometry fields (BPB) plus the boot signature check.
///
/// Parsing never fails; an image without a readable BPB yields an entry
/// with `valid == false` and all consumers fall back to floppy defaults.
#[derive(Debug, Clone)]
pub struct Mbr {
    pub valid: bool,
    pub oem_name: String,
    pub bytes_per_sector: u16,
    pub sectors_per_track: u16,
    pub heads: u16,
    pub media_descriptor: u8,
}

impl Mbr {
    /// Decode the BPB fields of a FAT12/16 boot sector.
    pub fn parse(sector: &[u8]) -> Self {
        let invalid = Self {
            valid: false,
            oem_name: String::new(),
            bytes_per_sector: 0,
            sectors_per_track: 0,
            heads: 0,
            media_descriptor: 0,
        };

        if sector.len() < 512 {
            return invalid;
        }

        let mut reader = BinaryReader::new(sector);
        let parsed: io::Result<(Vec<u8>, u16, u8, u16, u16, u16)> = (|| {
            reader.seek(3)?;
            let oem = reader.read_bytes(8)?;
            reader.seek(11)?;
            let bytes_per_sector = reader.read_u16()?;
            reader.seek(21)?;
            let media = reader.read_u8()?;
            reader.seek(24)?;
            let sectors_per_track = reader.read_u16()?;
            let heads = reader.read_u16()?;
            reader.seek(510)?;
            let signature = reader.read_u16()?;
            Ok((oem, bytes_per_sector, media, sectors_per_track, heads, signature))
        })();

        let (oem, bytes_per_sector, media, sectors_per_track, heads, signature) = match parsed {
            Ok(fields) => fields,
            Err(_) => return invalid,
        };

        let plausible = signature == 0xAA55
            && matches!(bytes_per_sector, 256 | 512 | 1024 | 2048 | 4096)
            && sectors_per_track > 0
            && heads > 0;

        if !plausible {
            return invalid;
        }

        Self {
            valid: true,
            oem_name: String::from_utf8_lossy(&oem).trim_end().to_string(),
            bytes_per_sector,
            sectors_per_track,
            heads,
            media_descriptor: media,
        }
    }
}

/// The FAT boot medium, immutable for the duration of the run.
///
/// Both addressing schemes the disk services use are exposed here so that
/// CHS and LBA reads derive from the same geometry source.
pub struct BootImage {
    data: Vec<u8>,
    mbr: Mbr,
}

impl BootImage {
    pub fn open(path: &Path) -> io::Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::from_bytes(data))
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mbr = Mbr::parse(&data);
        if mbr.valid {
            debug!(
                "BPB: oem '{}', {} bytes/sector, {} sectors/track, {} heads, media {:02X}",
                mbr.oem_name,
                mbr.bytes_per_sector,
                mbr.sectors_per_track,
                mbr.heads,
                mbr.media_descriptor
            );
        } else {
            warn!(
                "boot image has no readable BPB, assuming {} bytes/sector",
                SECTOR_SIZE
            );
        }
        Self { data, mbr }
    }

    pub fn mbr(&self) -> &Mbr {
        &self.mbr
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Bytes per sector, defaulting to 512 when the BPB is invalid.
    pub fn bytes_per_sector(&self) -> u64 {
        if self.mbr.valid {
            self.mbr.bytes_per_sector as u64
        } else {
            SECTOR_SIZE
        }
    }

    pub fn sectors_per_track(&self) -> u64 {
        if self.mbr.valid {
            self.mbr.sectors_per_track as u64
        } else {
            FALLBACK_SECTORS_PER_TRACK as u64
        }
    }

    pub fn heads(&self) -> u64 {
        if self.mbr.valid {
            self.mbr.heads as u64
        } else {
            FALLBACK_HEADS as u64
        }
    }

    /// CHS to 0-based linear sector index. Sector numbers are 1-based on
    /// the wire; sector 0 is not addressable.
    pub fn chs_to_lba(&self, cylinder: u16, head: u8, sector: u8) -> Option<u64> {
        if sector == 0 {
            return None;
        }
        Some(
            (cylinder as u64 * self.heads() + head as u64) * self.sectors_per_track()
                + (sector as u64 - 1),
        )
    }

    /// Read whole sectors by CHS address. Returns an empty buffer when the
    /// address or count falls outside the image.
    pub fn read_chs(&self, cylinder: u16, head: u8, sector: u8, count: u8) -> Vec<u8> {
        let lba = match self.chs_to_lba(cylinder, head, sector) {
            Some(lba) => lba,
            None => return Vec::new(),
        };
        self.read_at(
            lba * self.bytes_per_sector(),
            count as u64 * self.bytes_per_sector(),
        )
    }

    /// Read an arbitrary byte span. Returns an empty buffer when the span
    /// is empty or extends past the end of the image.
    pub fn read_at(&self, offset: u64, size: u64) -> Vec<u8> {
        let end = match offset.checked_add(size) {
            Some(end) => end,
            None => return Vec::new(),
        };
        if size == 0 || end > self.data.len() as u64 {
            return Vec::new();
        }
        match (narrow::<u64, usize>(offset), narrow::<u64, usize>(end)) {
            (Some(start), Some(end)) => self.data[start..end].to_vec(),
            _ => Vec::new(),
        }
    }

    /// The first sector of the medium, loaded at 0x7C00 at boot.
    pub fn boot_sector(&self) -> Vec<u8> {
        self.read_at(0, SECTOR_SIZE)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a minimal FAT-style boot sector with the given geometry.
    pub fn boot_sector_bytes(bytes_per_sector: u16, sectors_per_track: u16, heads: u16) -> Vec<u8> {
        let mut sector = vec![0u8; 512];
        sector[0] = 0xEB;
        sector[1] = 0x3C;
        sector[2] = 0x90;
        sector[3..11].copy_from_slice(b"BIOS86  ");
        sector[11..13].copy_from_slice(&bytes_per_sector.to_le_bytes());
        sector[21] = 0xF0;
        sector[24..26].copy_from_slice(&sectors_per_track.to_le_bytes());
        sector[26..28].copy_from_slice(&heads.to_le_bytes());
        sector[510] = 0x55;
        sector[511] = 0xAA;
        sector
    }

    fn floppy_image() -> BootImage {
        // 16 tracks worth of data, each sector filled with its LBA
        let mut data = boot_sector_bytes(512, 18, 2);
        data.resize(512 * 18 * 2 * 16, 0);
        for lba in 1..(data.len() / 512) {
            data[lba * 512..(lba + 1) * 512].fill(lba as u8);
        }
        BootImage::from_bytes(data)
    }

    #[test]
    fn parses_bpb_geometry() {
        let image = floppy_image();
        assert!(image.mbr().valid);
        assert_eq!(image.mbr().oem_name, "BIOS86");
        assert_eq!(image.bytes_per_sector(), 512);
        assert_eq!(image.sectors_per_track(), 18);
        assert_eq!(image.heads(), 2);
    }

    #[test]
    fn invalid_bpb_falls_back_to_floppy_defaults() {
        let image = BootImage::from_bytes(vec![0u8; 4096]);
        assert!(!image.mbr().valid);
        assert_eq!(image.bytes_per_sector(), 512);
        assert_eq!(image.sectors_per_track(), 18);
        assert_eq!(image.heads(), 2);
    }

    #[test]
    fn chs_addressing_is_one_based() {
        let image = floppy_image();
        assert_eq!(image.chs_to_lba(0, 0, 1), Some(0));
        assert_eq!(image.chs_to_lba(0, 0, 2), Some(1));
        assert_eq!(image.chs_to_lba(0, 1, 1), Some(18));
        assert_eq!(image.chs_to_lba(1, 0, 1), Some(36));
        assert_eq!(image.chs_to_lba(0, 0, 0), None);
    }

    #[test]
    fn read_chs_matches_linear_layout() {
        let image = floppy_image();
        let bytes = image.read_chs(0, 0, 2, 1);
        assert_eq!(bytes.len(), 512);
        assert!(bytes.iter().all(|&b| b == 1));

        let two = image.read_chs(0, 1, 1, 2);
        assert_eq!(two.len(), 1024);
        assert!(two[..512].iter().all(|&b| b == 18));
        assert!(two[512..].iter().all(|&b| b == 19));
    }

    #[test]
    fn out_of_range_reads_are_empty() {
        let image = floppy_image();
        assert!(image.read_chs(200, 0, 1, 1).is_empty());
        assert!(image.read_chs(0, 0, 0, 1).is_empty());
        assert!(image.read_at(image.len(), 1).is_empty());
        assert!(image.read_at(0, 0).is_empty());
        assert!(image.read_at(u64::MAX, 2).is_empty());
    }

    #[test]
    fn boot_sector_is_first_sector() {
        let image = floppy_image();
        let boot = image.boot_sector();
        assert_eq!(boot.len(), 512);
        assert_eq!(&boot[510..], &[0x55, 0xAA]);
    }
}
