use std::sync::atomic::Ordering;

use crate::bios::{
    clear_carry, failure, run_service, success, unsupported, Service, ServiceResult,
    ERR_INVALID_COMMAND,
};
use crate::engine::{get_address, Cpu};
use crate::machine::{self, Vm};
use crate::utils::number::saturate;

/// Equipment word: one diskette drive, 80x25 colour text, one serial
/// port, one parallel port, no coprocessor.
const EQUIPMENT_WORD: u16 = 0x0001 | 0x0020 | 0x0200 | 0x4000;

/// Base memory reported by INT 12h, in KiB.
const BASE_MEMORY_KB: u16 = 640;

/// Serial status: timeout set, nothing connected.
const SERIAL_NO_DEVICE: u8 = 0x80;
/// Printer status: timeout set, nothing connected.
const PRINTER_NO_DEVICE: u8 = 0x01;

/// INT 05h — Print screen. The text screen lives host-side, so this is a
/// recorded no-op.
pub fn int05h(vm: &mut Vm) -> ServiceResult {
    vm.get_data().ui.debug("print screen requested");
    clear_carry(vm)
}

/// INT 11h — Equipment determination
pub fn int11h(vm: &mut Vm) -> ServiceResult {
    vm.set_ax(EQUIPMENT_WORD)?;
    clear_carry(vm)
}

/// INT 12h — Base memory size
pub fn int12h(vm: &mut Vm) -> ServiceResult {
    vm.set_ax(BASE_MEMORY_KB)?;
    clear_carry(vm)
}

/// INT 14h — Serial port services. No device is emulated; writes are
/// echoed to the debug stream and every call reports a timeout status.
pub fn int14h(vm: &mut Vm) -> ServiceResult {
    run_service(vm, SERIAL_SERVICES)
}

const SERIAL_SERVICES: &[(u8, Service)] = &[
    (0x00, serial_initialize),
    (0x01, serial_write),
    (0x02, serial_read),
    (0x03, serial_status),
];

fn serial_initialize(vm: &mut Vm) -> ServiceResult {
    vm.set_ah(SERIAL_NO_DEVICE)?;
    vm.set_al(0)?;
    clear_carry(vm)
}

fn serial_write(vm: &mut Vm) -> ServiceResult {
    let byte = vm.al()?;
    vm.get_data()
        .ui
        .debug(format!("serial out: {:02X} ({:?})", byte, byte as char));
    vm.set_ah(SERIAL_NO_DEVICE)?;
    clear_carry(vm)
}

fn serial_read(vm: &mut Vm) -> ServiceResult {
    vm.set_ah(SERIAL_NO_DEVICE)?;
    vm.set_al(0)?;
    clear_carry(vm)
}

fn serial_status(vm: &mut Vm) -> ServiceResult {
    vm.set_ah(SERIAL_NO_DEVICE)?;
    vm.set_al(0)?;
    clear_carry(vm)
}

/// INT 15h — System services
pub fn int15h(vm: &mut Vm) -> ServiceResult {
    run_service(vm, SYSTEM_SERVICES)
}

const SYSTEM_SERVICES: &[(u8, Service)] = &[
    (0x24, a20_gate),
    (0x88, extended_memory),
    (0x8A, extended_memory_dx_ax),
    (0xE8, memory_map),
];

/// AH=24h A20 gate control, selected by AL.
fn a20_gate(vm: &mut Vm) -> ServiceResult {
    let function = vm.al()?;
    match function {
        0x00 => vm.get_data().a20_enabled.store(false, Ordering::SeqCst),
        0x01 => vm.get_data().a20_enabled.store(true, Ordering::SeqCst),
        0x02 => {
            let enabled = vm.get_data().a20_enabled.load(Ordering::SeqCst);
            vm.set_al(enabled as u8)?;
        }
        0x03 => {
            // Supported through both the keyboard controller and port 92h.
            vm.set_bx(0x0003)?;
        }
        _ => return unsupported(vm),
    }
    success(vm)
}

/// Memory beyond 1 MiB in KiB, clamped to what the register can carry.
fn extended_memory_kb(vm: &Vm) -> u64 {
    vm.get_data().memory_size.saturating_sub(1 << 20) / 1024
}

/// AH=88h extended memory size in AX.
fn extended_memory(vm: &mut Vm) -> ServiceResult {
    let kb: u16 = saturate(extended_memory_kb(vm));
    vm.set_ax(kb)?;
    clear_carry(vm)
}

/// AH=8Ah extended memory size in DX:AX.
fn extended_memory_dx_ax(vm: &mut Vm) -> ServiceResult {
    let kb: u32 = saturate(extended_memory_kb(vm));
    vm.set_ax(kb as u16)?;
    vm.set_dx((kb >> 16) as u16)?;
    clear_carry(vm)
}

/// AH=E8h, AL=01h memory map: a one-entry table describing the configured
/// RAM as usable. EBX carries the continuation value between calls.
fn memory_map(vm: &mut Vm) -> ServiceResult {
    if vm.al()? != 0x01 {
        return unsupported(vm);
    }

    match vm.ebx()? {
        0 => {
            let destination = get_address(vm.es()?, vm.di()?);
            let memory_size = vm.get_data().memory_size;

            // 20-byte entry: base, length, type (1 = usable RAM).
            let mut entry = [0u8; 20];
            entry[0..8].copy_from_slice(&0u64.to_le_bytes());
            entry[8..16].copy_from_slice(&memory_size.to_le_bytes());
            entry[16..20].copy_from_slice(&1u32.to_le_bytes());

            if destination + entry.len() as u64 > memory_size {
                return failure(vm, ERR_INVALID_COMMAND);
            }
            vm.write(destination, &entry)?;
            vm.set_ebx(1)?;
            vm.set_cx(entry.len() as u16)?;
            clear_carry(vm)
        }
        1 => {
            // End of table.
            vm.set_ebx(0)?;
            vm.set_cx(0)?;
            clear_carry(vm)
        }
        _ => failure(vm, ERR_INVALID_COMMAND),
    }
}

/// INT 17h — Printer services. Same treatment as the serial port.
pub fn int17h(vm: &mut Vm) -> ServiceResult {
    run_service(vm, PRINTER_SERVICES)
}

const PRINTER_SERVICES: &[(u8, Service)] = &[
    (0x00, printer_write),
    (0x01, printer_initialize),
    (0x02, printer_status),
];

fn printer_write(vm: &mut Vm) -> ServiceResult {
    let byte = vm.al()?;
    vm.get_data()
        .ui
        .debug(format!("printer out: {:02X} ({:?})", byte, byte as char));
    vm.set_ah(PRINTER_NO_DEVICE)?;
    clear_carry(vm)
}

fn printer_initialize(vm: &mut Vm) -> ServiceResult {
    vm.set_ah(PRINTER_NO_DEVICE)?;
    clear_carry(vm)
}

fn printer_status(vm: &mut Vm) -> ServiceResult {
    vm.set_ah(PRINTER_NO_DEVICE)?;
    clear_carry(vm)
}

/// INT 18h — ROM BASIC. There is none; the run ends here.
pub fn int18h(vm: &mut Vm) -> ServiceResult {
    vm.get_data().ui.debug("no ROM BASIC, stopping");
    log::error!("guest invoked INT 18h: no ROM BASIC");
    vm.get_data().ui.request_stop();
    vm.stop()?;
    clear_carry(vm)
}

/// INT 19h — Bootstrap. Reload sector 0 at 0x7C00 and restart from it.
pub fn int19h(vm: &mut Vm) -> ServiceResult {
    vm.get_data().ui.debug("warm reboot requested");
    if !machine::reload_boot_sector(vm)? {
        vm.get_data_mut().fault = Some(String::from("reboot failed: image has no boot sector"));
        vm.stop()?;
    }
    clear_carry(vm)
}
