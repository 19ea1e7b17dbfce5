use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use unicorn_engine::unicorn_const::uc_error;

use crate::engine::{Cpu, CpuFlag};
use crate::machine::Vm;
use crate::ui::CpuSnapshot;

pub mod disk;
pub mod keyboard;
pub mod system;
pub mod timer;
pub mod video;

#[cfg(test)]
mod tests;

/// BIOS error code for a malformed or failed request.
pub const ERR_INVALID_COMMAND: u8 = 0x01;
/// BIOS error code for an unknown sub-function.
pub const ERR_UNSUPPORTED: u8 = 0x86;

pub type ServiceResult = Result<(), uc_error>;

/// One AH-selected sub-function of an interrupt vector.
pub type Service = fn(&mut Vm) -> ServiceResult;

/// Software interrupts serviced by this BIOS.
#[derive(FromPrimitive, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vector {
    PrintScreen = 0x05,
    Video = 0x10,
    Equipment = 0x11,
    MemorySize = 0x12,
    Disk = 0x13,
    Serial = 0x14,
    System = 0x15,
    Keyboard = 0x16,
    Printer = 0x17,
    RomBasic = 0x18,
    Bootstrap = 0x19,
    Clock = 0x1A,
}

/// Route a trapped `INT n` to its service handler.
///
/// Returns false for vectors this BIOS does not implement; the engine then
/// reports the interrupt as unhandled. A handler error (failed register or
/// memory access) is fatal and stops the engine.
pub fn dispatch(vector: u32, vm: &mut Vm) -> bool {
    let Some(known) = Vector::from_u32(vector) else {
        return false;
    };

    if let Ok(snapshot) = snapshot(vm, vector as u8) {
        vm.get_data().ui.publish_snapshot(snapshot);
    }

    if vm.get_data().break_on.contains(&(vector as u8)) {
        pause_on_break(vm, vector as u8);
    }

    let result = match known {
        Vector::PrintScreen => system::int05h(vm),
        Vector::Video => video::int10h(vm),
        Vector::Equipment => system::int11h(vm),
        Vector::MemorySize => system::int12h(vm),
        Vector::Disk => disk::int13h(vm),
        Vector::Serial => system::int14h(vm),
        Vector::System => system::int15h(vm),
        Vector::Keyboard => keyboard::int16h(vm),
        Vector::Printer => system::int17h(vm),
        Vector::RomBasic => system::int18h(vm),
        Vector::Bootstrap => system::int19h(vm),
        Vector::Clock => timer::int1ah(vm),
    };

    if let Err(e) = result {
        vm.get_data_mut().fault = Some(format!(
            "service handler for INT {:02X}h failed: {:?}",
            vector, e
        ));
        let _ = vm.stop();
    }

    true
}

/// Look up AH in the vector's sub-function table and run the match, or
/// reject the request the uniform way.
pub(crate) fn run_service(vm: &mut Vm, services: &[(u8, Service)]) -> ServiceResult {
    let ah = vm.ah()?;
    match services.iter().find(|(function, _)| *function == ah) {
        Some((_, service)) => service(vm),
        None => unsupported(vm),
    }
}

/// CF=0 without touching AH, for services that return a value in AH.
pub(crate) fn clear_carry(vm: &mut Vm) -> ServiceResult {
    vm.unset_flag(CpuFlag::Carry)
}

/// The common success epilogue: CF=0, AH=0.
pub(crate) fn success(vm: &mut Vm) -> ServiceResult {
    vm.unset_flag(CpuFlag::Carry)?;
    vm.set_ah(0)
}

/// The common failure epilogue: CF=1 and a vector-specific code in AH.
pub(crate) fn failure(vm: &mut Vm, code: u8) -> ServiceResult {
    vm.set_flag(CpuFlag::Carry)?;
    vm.set_ah(code)
}

/// Uniform rejection of an unknown sub-function.
pub(crate) fn unsupported(vm: &mut Vm) -> ServiceResult {
    let ah = vm.ah()?;
    vm.get_data()
        .ui
        .debug(format!("unsupported function AH={:02X}h", ah));
    failure(vm, ERR_UNSUPPORTED)
}

fn snapshot(vm: &Vm, vector: u8) -> Result<CpuSnapshot, uc_error> {
    Ok(CpuSnapshot {
        ax: vm.ax()?,
        bx: vm.bx()?,
        cx: vm.cx()?,
        dx: vm.dx()?,
        si: vm.si()?,
        di: vm.di()?,
        bp: vm.bp()?,
        sp: vm.sp()?,
        cs: vm.cs()?,
        ip: vm.ip()?,
        ds: vm.ds()?,
        es: vm.es()?,
        ss: vm.ss()?,
        flags: vm.flags()?,
        last_vector: vector,
    })
}

/// Break-on-interrupt: park the guest thread until the UI delivers a key
/// (or the run is cancelled).
fn pause_on_break(vm: &mut Vm, vector: u8) {
    let ui = vm.get_data().ui.clone();
    ui.debug(format!(
        "break on INT {:02X}h, press a key to continue",
        vector
    ));
    let _ = ui.input.wait();
}
