use log::{debug, error};
use unicorn_engine::unicorn_const::{uc_error, Arch, Mode, Permission};
use unicorn_engine::{RegisterX86, Unicorn};

use crate::machine::{Context, Vm};

/// Engine pages are mapped at this granularity.
const PAGE_SIZE: u64 = 0x1000;

/// Flag bit positions in the FLAGS register.
#[derive(Clone, Copy)]
pub enum CpuFlag {
    Carry = 0,
    Parity = 2,
    AuxCarry = 4,
    Zero = 6,
    Sign = 7,
    Trap = 8,
    Interrupt = 9,
    Directional = 10,
    Overflow = 11,
}

/// Linear address of a real-mode `segment:offset` pair.
#[inline(always)]
pub fn get_address(segment: u16, offset: u16) -> u64 {
    segment as u64 * 16 + offset as u64
}

macro_rules! reg16_view {
    ($get:ident, $set:ident, $reg:ident) => {
        fn $get(&self) -> Result<u16, uc_error> {
            Ok(self.reg(RegisterX86::$reg)? as u16)
        }
        fn $set(&mut self, value: u16) -> Result<(), uc_error> {
            self.set_reg(RegisterX86::$reg, value as u64)
        }
    };
}

macro_rules! reg32_view {
    ($get:ident, $set:ident, $reg:ident) => {
        fn $get(&self) -> Result<u32, uc_error> {
            Ok(self.reg(RegisterX86::$reg)? as u32)
        }
        fn $set(&mut self, value: u32) -> Result<(), uc_error> {
            self.set_reg(RegisterX86::$reg, value as u64)
        }
    };
}

macro_rules! reg8_views {
    ($word:ident, $high:ident, $set_high:ident, $low:ident, $set_low:ident, $set_word:ident) => {
        fn $high(&self) -> Result<u8, uc_error> {
            Ok((self.$word()? >> 8) as u8)
        }
        fn $set_high(&mut self, value: u8) -> Result<(), uc_error> {
            let word = self.$word()?;
            self.$set_word((word & 0x00FF) | ((value as u16) << 8))
        }
        fn $low(&self) -> Result<u8, uc_error> {
            Ok(self.$word()? as u8)
        }
        fn $set_low(&mut self, value: u8) -> Result<(), uc_error> {
            let word = self.$word()?;
            self.$set_word((word & 0xFF00) | value as u16)
        }
    };
}

/// Register, flag and memory access as the BIOS services see the CPU.
///
/// Implemented over the raw engine handle so the same view is available
/// inside interrupt hooks and from the machine façade.
pub trait Cpu {
    fn reg(&self, reg: RegisterX86) -> Result<u64, uc_error>;
    fn set_reg(&mut self, reg: RegisterX86, value: u64) -> Result<(), uc_error>;
    fn read(&self, address: u64, size: usize) -> Result<Vec<u8>, uc_error>;
    fn write(&mut self, address: u64, bytes: &[u8]) -> Result<(), uc_error>;
    fn stop(&mut self) -> Result<(), uc_error>;

    reg16_view!(ax, set_ax, AX);
    reg16_view!(bx, set_bx, BX);
    reg16_view!(cx, set_cx, CX);
    reg16_view!(dx, set_dx, DX);
    reg16_view!(si, set_si, SI);
    reg16_view!(di, set_di, DI);
    reg16_view!(bp, set_bp, BP);
    reg16_view!(sp, set_sp, SP);
    reg16_view!(ip, set_ip, IP);
    reg16_view!(cs, set_cs, CS);
    reg16_view!(ds, set_ds, DS);
    reg16_view!(es, set_es, ES);
    reg16_view!(ss, set_ss, SS);

    reg32_view!(eax, set_eax, EAX);
    reg32_view!(ebx, set_ebx, EBX);
    reg32_view!(ecx, set_ecx, ECX);
    reg32_view!(edx, set_edx, EDX);

    reg8_views!(ax, ah, set_ah, al, set_al, set_ax);
    reg8_views!(bx, bh, set_bh, bl, set_bl, set_bx);
    reg8_views!(cx, ch, set_ch, cl, set_cl, set_cx);
    reg8_views!(dx, dh, set_dh, dl, set_dl, set_dx);

    fn flags(&self) -> Result<u16, uc_error> {
        Ok(self.reg(RegisterX86::EFLAGS)? as u16)
    }

    fn check_flag(&self, flag: CpuFlag) -> Result<bool, uc_error> {
        Ok(self.flags()? & (1 << flag as u8) != 0)
    }

    fn set_flag(&mut self, flag: CpuFlag) -> Result<(), uc_error> {
        let flags = self.reg(RegisterX86::EFLAGS)?;
        self.set_reg(RegisterX86::EFLAGS, flags | 1 << flag as u8)
    }

    fn unset_flag(&mut self, flag: CpuFlag) -> Result<(), uc_error> {
        let flags = self.reg(RegisterX86::EFLAGS)?;
        self.set_reg(RegisterX86::EFLAGS, flags & !(1 << flag as u8))
    }

    fn update_flag(&mut self, flag: CpuFlag, active: bool) -> Result<(), uc_error> {
        if active {
            self.set_flag(flag)
        } else {
            self.unset_flag(flag)
        }
    }
}

impl<D> Cpu for Unicorn<'_, D> {
    fn reg(&self, reg: RegisterX86) -> Result<u64, uc_error> {
        self.reg_read(reg)
    }

    fn set_reg(&mut self, reg: RegisterX86, value: u64) -> Result<(), uc_error> {
        self.reg_write(reg, value)
    }

    fn read(&self, address: u64, size: usize) -> Result<Vec<u8>, uc_error> {
        self.mem_read_as_vec(address, size)
    }

    fn write(&mut self, address: u64, bytes: &[u8]) -> Result<(), uc_error> {
        self.mem_write(address, bytes)
    }

    fn stop(&mut self) -> Result<(), uc_error> {
        self.emu_stop()
    }
}

/// Façade over the 16-bit x86 emulation core.
///
/// Owns the mapped guest memory and the hooks: a block hook observes the
/// UI stop flag between basic blocks so a stop request takes effect at an
/// instruction boundary even when the guest never traps.
pub struct Engine {
    uc: Vm,
    memory_size: u64,
}

impl Engine {
    pub fn new(memory_size: u64, context: Context) -> Result<Self, uc_error> {
        let mut uc = Unicorn::new_with_data(Arch::X86, Mode::MODE_16, context)?;
        let mapped = (memory_size + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
        uc.mem_map(0, mapped as usize, Permission::ALL)?;

        // begin > end hooks every address.
        uc.add_block_hook(1, 0, |uc, _address, _size| {
            if uc.get_data().ui.stop_requested() {
                let _ = uc.emu_stop();
            }
        })?;

        Ok(Self { uc, memory_size })
    }

    pub fn memory_size(&self) -> u64 {
        self.memory_size
    }

    pub fn cpu(&mut self) -> &mut Vm {
        &mut self.uc
    }

    /// Register the software-interrupt callback. A `false` return marks the
    /// interrupt as unhandled: the fault is recorded and emulation stops.
    pub fn on_interrupt<F>(&mut self, mut callback: F) -> Result<(), uc_error>
    where
        F: FnMut(u32, &mut Vm) -> bool + 'static,
    {
        self.uc.add_intr_hook(move |uc, vector| {
            if !callback(vector, uc) {
                let at = match (uc.cs(), uc.ip()) {
                    (Ok(cs), Ok(ip)) => crate::utils::hex::seg_off(cs, ip),
                    _ => String::from("????:????"),
                };
                uc.get_data_mut().fault =
                    Some(format!("unhandled interrupt 0x{:02X} at {}", vector, at));
                let _ = uc.emu_stop();
            }
        })?;
        Ok(())
    }

    /// Run the guest from the given entry point. Emulation ends when the
    /// guest halts, a hook stops the engine (user quit, fatal service
    /// error) or the core reports a fault. Returns true on normal
    /// termination, false on an emulation fault.
    pub fn start(&mut self, entry: u64) -> bool {
        let run = self.uc.emu_start(entry, u64::MAX, 0, 0);

        if let Some(fault) = self.uc.get_data().fault.as_ref() {
            error!("{}", fault);
            return false;
        }

        match run {
            Ok(()) => {
                if self.uc.get_data().ui.stop_requested() {
                    debug!("stop requested, guest parked");
                }
                true
            }
            Err(e) => {
                error!("emulation fault: {:?}", e);
                false
            }
        }
    }
}
