use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::info;
use unicorn_engine::unicorn_const::uc_error;
use unicorn_engine::Unicorn;

use crate::bios;
use crate::disk::{BootImage, SECTOR_SIZE};
use crate::engine::{Cpu, Engine};
use crate::ui::Ui;

/// Physical load address of the boot sector.
pub const BOOT_ADDR: u64 = 0x7C00;

/// Everything a BIOS service needs besides the CPU itself: the boot
/// medium, the UI handles and the run configuration. Stored as the engine
/// hook data so handlers receive it alongside the register file.
pub struct Context {
    pub image: Arc<BootImage>,
    pub ui: Ui,
    pub memory_size: u64,
    pub a20_enabled: AtomicBool,
    pub break_on: Vec<u8>,
    pub fault: Option<String>,
}

/// The engine handle as seen from inside an interrupt hook.
pub type Vm = Unicorn<'static, Context>;

/// Construction-time failures. These abort before any guest code runs.
#[derive(Debug)]
pub enum MachineError {
    /// The image does not carry a full first sector to boot from.
    BootSectorMissing { image_len: u64 },
    /// The configured memory cannot hold the boot sector load address.
    MemoryTooSmall { configured: u64, required: u64 },
    Engine(uc_error),
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineError::BootSectorMissing { image_len } => {
                write!(
                    f,
                    "image is {} bytes, smaller than one {} byte boot sector",
                    image_len, SECTOR_SIZE
                )
            }
            MachineError::MemoryTooSmall {
                configured,
                required,
            } => {
                write!(
                    f,
                    "memory size {:#X} cannot hold the boot sector (need at least {:#X})",
                    configured, required
                )
            }
            MachineError::Engine(e) => write!(f, "engine initialisation failed: {:?}", e),
        }
    }
}

impl std::error::Error for MachineError {}

impl From<uc_error> for MachineError {
    fn from(e: uc_error) -> Self {
        MachineError::Engine(e)
    }
}

/// The emulated PC: engine, boot medium and BIOS wiring.
///
/// Move-only by design; duplicating a live machine has no meaningful
/// semantics, so a second instance is built from the same inputs instead.
pub struct Machine {
    engine: Engine,
}

impl Machine {
    /// Build a machine over the given boot image: map memory, load sector 0
    /// at 0x7C00 and register the BIOS dispatcher.
    pub fn new(
        memory_size: u64,
        image: BootImage,
        ui: Ui,
        break_on: Vec<u8>,
    ) -> Result<Self, MachineError> {
        let boot_sector = image.boot_sector();
        if boot_sector.len() < SECTOR_SIZE as usize {
            return Err(MachineError::BootSectorMissing {
                image_len: image.len(),
            });
        }
        let required = BOOT_ADDR + SECTOR_SIZE;
        if memory_size < required {
            return Err(MachineError::MemoryTooSmall {
                configured: memory_size,
                required,
            });
        }

        let context = Context {
            image: Arc::new(image),
            ui,
            memory_size,
            a20_enabled: AtomicBool::new(false),
            break_on,
            fault: None,
        };

        let mut engine = Engine::new(memory_size, context)?;

        let cpu = engine.cpu();
        cpu.write(BOOT_ADDR, &boot_sector)?;
        cpu.set_dl(0x00)?; // boot drive
        cpu.set_sp(BOOT_ADDR as u16)?;

        engine.on_interrupt(bios::dispatch)?;

        Ok(Self { engine })
    }

    /// Run the guest from the boot sector. Returns true when the guest
    /// halts or the user quits, false on an emulation fault.
    pub fn start(&mut self) -> bool {
        info!(
            "starting guest at {:#06X}, {} MiB of memory",
            BOOT_ADDR,
            self.engine.memory_size() / (1024 * 1024)
        );
        self.engine.start(BOOT_ADDR)
    }

    pub fn engine(&mut self) -> &mut Engine {
        &mut self.engine
    }
}

/// Warm reboot: load sector 0 back to 0x7C00 and aim CS:IP at it.
/// Returns false when the image yields no boot sector.
pub fn reload_boot_sector(vm: &mut Vm) -> Result<bool, uc_error> {
    let boot_sector = vm.get_data().image.boot_sector();
    if boot_sector.len() < SECTOR_SIZE as usize {
        return Ok(false);
    }
    vm.write(BOOT_ADDR, &boot_sector)?;
    vm.set_cs(0x0000)?;
    vm.set_ip(BOOT_ADDR as u16)?;
    vm.set_dl(0x00)?;
    Ok(true)
}
