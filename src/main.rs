use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap_derive::Parser;
use log::error;

use crate::disk::BootImage;
use crate::machine::Machine;
use crate::ui::input::spawn_input_thread;
use crate::ui::term::spawn_render_thread;
use crate::ui::Ui;

mod bios;
mod disk;
mod engine;
mod machine;
mod ui;
mod utils;

#[derive(Parser, Debug)]
#[command(about = "Boot a FAT floppy image on an emulated legacy PC BIOS")]
struct Cli {
    /// Path to the boot image (raw floppy, boot sector at offset 0)
    image: PathBuf,

    /// Guest memory size in MiB
    #[arg(long, default_value_t = 64)]
    memory: u64,

    /// Pause when the guest issues this interrupt (hex vector, repeatable)
    #[arg(long = "break-int", value_parser = parse_vector)]
    break_on: Vec<u8>,

    /// Run without the terminal UI; debug output goes to the log only
    #[arg(long)]
    headless: bool,
}

fn parse_vector(s: &str) -> Result<u8, String> {
    u8::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| format!("invalid interrupt vector '{}': {}", s, e))
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Cli::parse();

    let image = match BootImage::open(&args.image) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("cannot open {}: {}", args.image.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let ui = Ui::new();
    let mut machine = match Machine::new(
        args.memory * 1024 * 1024,
        image,
        ui.clone(),
        args.break_on,
    ) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("cannot build machine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let threads = if args.headless {
        Vec::new()
    } else {
        vec![spawn_input_thread(ui.clone()), spawn_render_thread(ui.clone())]
    };

    let clean = machine.start();

    ui.request_stop();
    for thread in threads {
        let _ = thread.join();
    }

    if clean {
        ExitCode::SUCCESS
    } else {
        error!("machine stopped on an emulation fault");
        ExitCode::FAILURE
    }
}
