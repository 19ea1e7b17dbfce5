use std::io;

use crate::bios::{failure, run_service, success, Service, ServiceResult, ERR_INVALID_COMMAND};
use crate::engine::{get_address, Cpu};
use crate::machine::Vm;
use crate::utils::binary::BinaryReader;
use crate::utils::hex::{seg_off, to_hex};

/// INT 13h — Disk services
///
/// Only the boot drive (DL=0) is backed by the image; reads addressed to
/// any other drive fail with the BIOS "invalid command" status.
pub fn int13h(vm: &mut Vm) -> ServiceResult {
    run_service(vm, SERVICES)
}

const SERVICES: &[(u8, Service)] = &[
    (0x00, reset),
    (0x02, read_sectors),
    (0x41, check_extensions),
    (0x42, extended_read),
];

/// Disk Address Packet for the INT 13h extensions (AH=42h), 16 bytes
/// little-endian at DS:SI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskAddressPacket {
    pub sectors: u16,
    pub destination_offset: u16,
    pub destination_segment: u16,
    pub logical_block_address: u64,
}

impl DiskAddressPacket {
    pub const SIZE: usize = 16;

    pub fn parse(bytes: &[u8]) -> io::Result<Self> {
        let mut reader = BinaryReader::new(bytes);
        let size = reader.read_u8()?;
        if (size as usize) < Self::SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("packet declares {} bytes, expected 16", size),
            ));
        }
        let _reserved = reader.read_u8()?;
        Ok(Self {
            sectors: reader.read_u16()?,
            destination_offset: reader.read_u16()?,
            destination_segment: reader.read_u16()?,
            logical_block_address: reader.read_u64()?,
        })
    }
}

/// AH=00h reset. Nothing to spin down; always succeeds.
fn reset(vm: &mut Vm) -> ServiceResult {
    let drive = vm.dl()?;
    vm.get_data()
        .ui
        .debug(format!("resetting drive {}", to_hex(drive)));
    success(vm)
}

/// AH=02h read sectors by CHS into ES:BX.
fn read_sectors(vm: &mut Vm) -> ServiceResult {
    let drive = vm.dl()?;
    let sectors = vm.al()?;
    let ch = vm.ch()?;
    let cl = vm.cl()?;
    let cylinder = ((cl as u16 & 0xC0) << 2) | ch as u16;
    let sector = cl & 0x3F;
    let head = vm.dh()?;
    let es = vm.es()?;
    let bx = vm.bx()?;
    let destination = get_address(es, bx);
    let ui = vm.get_data().ui.clone();

    if drive != 0x00 {
        ui.debug(format!(
            "[ ERROR ] reading from drive {} is not supported",
            to_hex(drive)
        ));
        return read_failed(vm);
    }
    if sectors == 0 {
        ui.debug("[ ERROR ] zero sector count");
        return read_failed(vm);
    }

    let image = vm.get_data().image.clone();
    ui.debug(format!(
        "reading {} sector{} C={} H={} S={} -> {} ({})",
        sectors,
        if sectors > 1 { "s" } else { "" },
        cylinder,
        head,
        sector,
        to_hex(destination as u32),
        seg_off(es, bx),
    ));

    let bytes = image.read_chs(cylinder, head, sector, sectors);
    let expected = sectors as u64 * image.bytes_per_sector();
    if bytes.len() as u64 != expected {
        ui.debug("[ ERROR ] no data received");
        return read_failed(vm);
    }
    if destination + expected > vm.get_data().memory_size {
        ui.debug("[ ERROR ] destination beyond end of memory");
        return read_failed(vm);
    }

    vm.write(destination, &bytes)?;
    ui.debug(format!(
        "[ SUCCESS ] wrote {} bytes at {} -> {}",
        bytes.len(),
        to_hex(destination as u32),
        to_hex(destination as u32 + bytes.len() as u32),
    ));

    vm.set_al(sectors)?;
    success(vm)
}

/// AH=41h installation check for the INT 13h extensions.
fn check_extensions(vm: &mut Vm) -> ServiceResult {
    vm.get_data()
        .ui
        .debug("checking for INT 13h extension support");
    vm.set_bx(0xAA55)?;
    vm.set_cx(0x0007)?; // packet access supported
    success(vm)
}

/// AH=42h extended read through a Disk Address Packet at DS:SI.
fn extended_read(vm: &mut Vm) -> ServiceResult {
    let drive = vm.dl()?;
    let packet_address = get_address(vm.ds()?, vm.si()?);
    let ui = vm.get_data().ui.clone();

    if drive != 0x00 {
        ui.debug(format!(
            "[ ERROR ] reading from drive {} is not supported",
            to_hex(drive)
        ));
        return read_failed(vm);
    }

    let packet_bytes = vm.read(packet_address, DiskAddressPacket::SIZE)?;
    let packet = match DiskAddressPacket::parse(&packet_bytes) {
        Ok(packet) => packet,
        Err(e) => {
            ui.debug(format!("[ ERROR ] bad disk address packet: {}", e));
            return read_failed(vm);
        }
    };

    let image = vm.get_data().image.clone();
    let bytes_per_sector = image.bytes_per_sector();
    let offset = match packet.logical_block_address.checked_mul(bytes_per_sector) {
        Some(offset) => offset,
        None => {
            ui.debug("[ ERROR ] block address out of range");
            return read_failed(vm);
        }
    };
    let size = packet.sectors as u64 * bytes_per_sector;
    let destination = get_address(packet.destination_segment, packet.destination_offset);

    ui.debug(format!(
        "extended read of {} sector{} LBA={} offset={} -> {} ({})",
        packet.sectors,
        if packet.sectors > 1 { "s" } else { "" },
        packet.logical_block_address,
        to_hex(offset as u32),
        to_hex(destination as u32),
        seg_off(packet.destination_segment, packet.destination_offset),
    ));

    let bytes = image.read_at(offset, size);
    if bytes.len() as u64 != size {
        ui.debug("[ ERROR ] no data received");
        return read_failed(vm);
    }
    if destination + size > vm.get_data().memory_size {
        ui.debug("[ ERROR ] destination beyond end of memory");
        return read_failed(vm);
    }

    vm.write(destination, &bytes)?;
    ui.debug(format!(
        "[ SUCCESS ] wrote {} bytes at {} -> {}",
        bytes.len(),
        to_hex(destination as u32),
        to_hex(destination as u32 + bytes.len() as u32),
    ));

    success(vm)
}

/// The failed-read epilogue: CF=1, AH=01h, AL=0.
fn read_failed(vm: &mut Vm) -> ServiceResult {
    vm.set_al(0)?;
    failure(vm, ERR_INVALID_COMMAND)
}

#[cfg(test)]
mod tests {
    use super::DiskAddressPacket;

    fn packet_bytes(sectors: u16, offset: u16, segment: u16, lba: u64) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0] = 16;
        bytes[2..4].copy_from_slice(&sectors.to_le_bytes());
        bytes[4..6].copy_from_slice(&offset.to_le_bytes());
        bytes[6..8].copy_from_slice(&segment.to_le_bytes());
        bytes[8..16].copy_from_slice(&lba.to_le_bytes());
        bytes
    }

    #[test]
    fn parses_packed_layout() {
        let packet = DiskAddressPacket::parse(&packet_bytes(2, 0x0000, 0x2000, 10)).unwrap();
        assert_eq!(
            packet,
            DiskAddressPacket {
                sectors: 2,
                destination_offset: 0x0000,
                destination_segment: 0x2000,
                logical_block_address: 10,
            }
        );
    }

    #[test]
    fn rejects_short_size_field() {
        let mut bytes = packet_bytes(1, 0, 0, 0);
        bytes[0] = 8;
        assert!(DiskAddressPacket::parse(&bytes).is_err());
    }

    #[test]
    fn rejects_truncated_packet() {
        assert!(DiskAddressPacket::parse(&[16u8, 0, 1]).is_err());
    }
}
