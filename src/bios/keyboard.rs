use crate::bios::{clear_carry, run_service, Service, ServiceResult};
use crate::engine::{Cpu, CpuFlag};
use crate::machine::Vm;

/// INT 16h — Keyboard services
pub fn int16h(vm: &mut Vm) -> ServiceResult {
    run_service(vm, SERVICES)
}

const SERVICES: &[(u8, Service)] = &[
    (0x00, read_key),
    (0x01, peek_key),
    (0x02, shift_flags),
    (0x10, read_key),
    (0x11, peek_key),
];

/// AH=00h/10h wait for a keystroke.
///
/// Suspends the guest thread on the input queue. A cancelled queue (user
/// quit) wakes the wait, reports AX=0 and stops the engine.
fn read_key(vm: &mut Vm) -> ServiceResult {
    let input = vm.get_data().ui.input.clone();
    match input.wait() {
        Some(key) => {
            vm.set_ah(key.scancode)?;
            vm.set_al(key.ascii)?;
        }
        None => {
            vm.get_data().ui.debug("keyboard wait cancelled");
            vm.set_ax(0)?;
            vm.stop()?;
        }
    }
    clear_carry(vm)
}

/// AH=01h/11h check for a keystroke without consuming it.
/// ZF=0 means a key is available and AX holds it.
fn peek_key(vm: &mut Vm) -> ServiceResult {
    let input = vm.get_data().ui.input.clone();
    match input.peek() {
        Some(key) => {
            vm.set_ah(key.scancode)?;
            vm.set_al(key.ascii)?;
            vm.unset_flag(CpuFlag::Zero)?;
        }
        None => {
            vm.set_flag(CpuFlag::Zero)?;
        }
    }
    clear_carry(vm)
}

/// AH=02h shift flag bitmap from the UI modifier state.
fn shift_flags(vm: &mut Vm) -> ServiceResult {
    let flags = vm.get_data().ui.input.shift_flags();
    vm.set_al(flags)?;
    clear_carry(vm)
}
