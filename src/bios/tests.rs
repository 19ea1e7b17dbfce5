use crate::bios;
use crate::disk::tests::boot_sector_bytes;
use crate::disk::BootImage;
use crate::engine::{get_address, Cpu, CpuFlag};
use crate::machine::{Machine, MachineError, Vm, BOOT_ADDR};
use crate::ui::input::KeyStroke;
use crate::ui::Ui;

/// Room for the 1 MiB real-mode address space plus a tail of extended
/// memory so INT 15h has something to report.
const TEST_MEMORY: u64 = 2 << 20;

/// A 1.44MB image: valid BPB in sector 0, every other sector filled with
/// its LBA (mod 256) so reads are easy to check.
fn test_image_bytes() -> Vec<u8> {
    let mut data = boot_sector_bytes(512, 18, 2);
    data.resize(1_474_560, 0);
    for lba in 1..2880 {
        data[lba * 512..(lba + 1) * 512].fill(lba as u8);
    }
    data
}

fn boot_machine() -> Machine {
    Machine::new(
        TEST_MEMORY,
        BootImage::from_bytes(test_image_bytes()),
        Ui::new(),
        Vec::new(),
    )
    .unwrap()
}

fn vm(machine: &mut Machine) -> &mut Vm {
    machine.engine().cpu()
}

fn carry(vm: &mut Vm) -> bool {
    vm.check_flag(CpuFlag::Carry).unwrap()
}

/// Pre-set CF so a passing test proves the handler cleared it explicitly.
fn dirty_carry(vm: &mut Vm) {
    vm.set_flag(CpuFlag::Carry).unwrap();
}

// ========================================================================
// Machine construction and the engine facade
// ========================================================================

#[test]
fn boot_sector_is_loaded_at_7c00() {
    let mut machine = boot_machine();
    let expected = &test_image_bytes()[..512];
    let loaded = vm(&mut machine).read(BOOT_ADDR, 512).unwrap();
    assert_eq!(loaded, expected);
}

#[test]
fn construction_rejects_tiny_memory() {
    let result = Machine::new(
        0x4000,
        BootImage::from_bytes(test_image_bytes()),
        Ui::new(),
        Vec::new(),
    );
    assert!(matches!(result, Err(MachineError::MemoryTooSmall { .. })));
}

#[test]
fn construction_rejects_truncated_image() {
    let result = Machine::new(
        TEST_MEMORY,
        BootImage::from_bytes(vec![0u8; 100]),
        Ui::new(),
        Vec::new(),
    );
    assert!(matches!(result, Err(MachineError::BootSectorMissing { .. })));
}

#[test]
fn linear_addresses_are_segment_times_16_plus_offset() {
    assert_eq!(get_address(0x0000, 0x7C00), 0x7C00);
    assert_eq!(get_address(0x07C0, 0x0000), 0x7C00);
    assert_eq!(get_address(0x1000, 0x0234), 0x10234);
    assert_eq!(get_address(0xFFFF, 0xFFFF), 0x10FFEF);
}

#[test]
fn memory_round_trips_through_the_facade() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    let bytes = [0xDE, 0xAD, 0xBE, 0xEF, 0x42];
    vm.write(0x4_0000, &bytes).unwrap();
    assert_eq!(vm.read(0x4_0000, bytes.len()).unwrap(), bytes);
}

#[test]
fn register_views_compose() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x1234).unwrap();
    assert_eq!(vm.ah().unwrap(), 0x12);
    assert_eq!(vm.al().unwrap(), 0x34);
    vm.set_ah(0xAB).unwrap();
    assert_eq!(vm.ax().unwrap(), 0xAB34);
    vm.set_dl(0x80).unwrap();
    assert_eq!(vm.dx().unwrap() & 0x00FF, 0x0080);
}

#[test]
fn start_runs_the_boot_sector_and_services_interrupts() {
    // Boot sector: JMP +0x3C over the BPB, then INT 12h; HLT.
    let mut data = test_image_bytes();
    data[0x3E] = 0xCD; // INT
    data[0x3F] = 0x12; //   12h
    data[0x40] = 0xF4; // HLT
    let mut machine = Machine::new(
        TEST_MEMORY,
        BootImage::from_bytes(data),
        Ui::new(),
        Vec::new(),
    )
    .unwrap();

    assert!(machine.start());
    assert_eq!(vm(&mut machine).ax().unwrap(), 640);
}

#[test]
fn unrecognised_vector_is_not_serviced() {
    let mut machine = boot_machine();
    assert!(!bios::dispatch(0x21, vm(&mut machine)));
    assert!(!bios::dispatch(0xFF, vm(&mut machine)));
}

// ========================================================================
// INT 13h — disk services
// ========================================================================

#[test]
fn chs_read_lands_at_es_bx() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x0201).unwrap(); // AH=02 read, AL=1 sector
    vm.set_cx(0x0002).unwrap(); // cylinder 0, sector 2
    vm.set_dx(0x0000).unwrap(); // head 0, drive 0
    vm.set_es(0x1000).unwrap();
    vm.set_bx(0x0000).unwrap();
    dirty_carry(vm);

    assert!(bios::dispatch(0x13, vm));

    assert!(!carry(vm));
    assert_eq!(vm.ah().unwrap(), 0);
    assert_eq!(vm.al().unwrap(), 1);
    let written = vm.read(0x10000, 512).unwrap();
    assert_eq!(written, &test_image_bytes()[512..1024]);
}

#[test]
fn chs_read_crosses_heads_and_cylinders() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    // C=1 H=1 S=3 on an 80/2/18 floppy: LBA = (1*2+1)*18 + 2 = 56
    vm.set_ax(0x0202).unwrap();
    vm.set_cx(0x0103).unwrap();
    vm.set_dx(0x0100).unwrap();
    vm.set_es(0x2000).unwrap();
    vm.set_bx(0x0100).unwrap();

    assert!(bios::dispatch(0x13, vm));

    assert!(!carry(vm));
    assert_eq!(vm.al().unwrap(), 2);
    let written = vm.read(0x20100, 1024).unwrap();
    assert_eq!(written, &test_image_bytes()[56 * 512..58 * 512]);
}

#[test]
fn read_from_other_drives_fails_without_touching_memory() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    let canary = [0x77u8; 512];
    vm.write(0x10000, &canary).unwrap();

    vm.set_ax(0x0201).unwrap();
    vm.set_cx(0x0002).unwrap();
    vm.set_dx(0x0080).unwrap(); // DL=0x80, first hard disk
    vm.set_es(0x1000).unwrap();
    vm.set_bx(0x0000).unwrap();

    assert!(bios::dispatch(0x13, vm));

    assert!(carry(vm));
    assert_eq!(vm.ah().unwrap(), 0x01);
    assert_eq!(vm.al().unwrap(), 0);
    assert_eq!(vm.read(0x10000, 512).unwrap(), canary);
}

#[test]
fn zero_sector_read_is_rejected() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x0200).unwrap();
    vm.set_cx(0x0001).unwrap();
    vm.set_dx(0x0000).unwrap();

    assert!(bios::dispatch(0x13, vm));

    assert!(carry(vm));
    assert_eq!(vm.ah().unwrap(), 0x01);
    assert_eq!(vm.al().unwrap(), 0);
}

#[test]
fn out_of_range_read_is_a_guest_visible_failure() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x0201).unwrap();
    vm.set_cx(0xFF01).unwrap(); // cylinder 255, way past an 80-track floppy
    vm.set_dx(0x0000).unwrap();

    assert!(bios::dispatch(0x13, vm));

    assert!(carry(vm));
    assert_eq!(vm.ah().unwrap(), 0x01);
}

#[test]
fn reset_succeeds_and_leaves_memory_alone() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    let before = vm.read(BOOT_ADDR, 512).unwrap();
    vm.set_ax(0x0000).unwrap();
    vm.set_dx(0x0000).unwrap();
    dirty_carry(vm);

    assert!(bios::dispatch(0x13, vm));

    assert!(!carry(vm));
    assert_eq!(vm.ah().unwrap(), 0);
    assert_eq!(vm.read(BOOT_ADDR, 512).unwrap(), before);
}

#[test]
fn extension_check_reports_packet_access() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x4100).unwrap();
    vm.set_bx(0x55AA).unwrap();
    vm.set_dx(0x0000).unwrap();

    assert!(bios::dispatch(0x13, vm));

    assert!(!carry(vm));
    assert_eq!(vm.ah().unwrap(), 0);
    assert_eq!(vm.bx().unwrap(), 0xAA55);
    assert_eq!(vm.cx().unwrap(), 0x0007);
}

#[test]
fn extended_read_follows_the_packet() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);

    // DAP at 0000:0500: 2 sectors from LBA 10 to 2000:0000
    let mut packet = [0u8; 16];
    packet[0] = 16;
    packet[2..4].copy_from_slice(&2u16.to_le_bytes());
    packet[4..6].copy_from_slice(&0u16.to_le_bytes());
    packet[6..8].copy_from_slice(&0x2000u16.to_le_bytes());
    packet[8..16].copy_from_slice(&10u64.to_le_bytes());
    vm.write(0x0500, &packet).unwrap();

    vm.set_ax(0x4200).unwrap();
    vm.set_dx(0x0000).unwrap();
    vm.set_ds(0x0000).unwrap();
    vm.set_si(0x0500).unwrap();
    dirty_carry(vm);

    assert!(bios::dispatch(0x13, vm));

    assert!(!carry(vm));
    assert_eq!(vm.ah().unwrap(), 0);
    let written = vm.read(0x20000, 1024).unwrap();
    assert_eq!(written, &test_image_bytes()[5120..6144]);
}

#[test]
fn extended_read_rejects_a_bad_packet() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);

    let mut packet = [0u8; 16];
    packet[0] = 8; // undersized DAP
    vm.write(0x0500, &packet).unwrap();

    vm.set_ax(0x4200).unwrap();
    vm.set_dx(0x0000).unwrap();
    vm.set_ds(0x0000).unwrap();
    vm.set_si(0x0500).unwrap();

    assert!(bios::dispatch(0x13, vm));

    assert!(carry(vm));
    assert_eq!(vm.ah().unwrap(), 0x01);
}

#[test]
fn unknown_disk_function_is_unsupported() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x7700).unwrap();

    assert!(bios::dispatch(0x13, vm));

    assert!(carry(vm));
    assert_eq!(vm.ah().unwrap(), 0x86);
}

// ========================================================================
// INT 10h — video services
// ========================================================================

#[test]
fn teletype_writes_the_cell_and_advances_the_cursor() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x0E58).unwrap(); // AH=0E, AL='X'
    dirty_carry(vm);

    assert!(bios::dispatch(0x10, vm));

    assert!(!carry(vm));
    let screen = vm.get_data().ui.screen.lock().unwrap();
    assert_eq!(screen.cell_at(0, 0, 0).glyph, b'X');
    assert_eq!(screen.cursor(0), (0, 1));
}

#[test]
fn teletype_interprets_carriage_return_and_line_feed() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    for &glyph in b"AB\r\nC" {
        vm.set_ax(0x0E00 | glyph as u16).unwrap();
        assert!(bios::dispatch(0x10, vm));
    }

    let screen = vm.get_data().ui.screen.lock().unwrap();
    assert_eq!(screen.cell_at(0, 0, 0).glyph, b'A');
    assert_eq!(screen.cell_at(0, 0, 1).glyph, b'B');
    assert_eq!(screen.cell_at(0, 1, 0).glyph, b'C');
    assert_eq!(screen.cursor(0), (1, 1));
}

#[test]
fn cursor_position_round_trips() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x0200).unwrap();
    vm.set_bx(0x0000).unwrap();
    vm.set_dx(0x0A28).unwrap(); // row 10, col 40
    assert!(bios::dispatch(0x10, vm));

    vm.set_ax(0x0300).unwrap();
    vm.set_dx(0x0000).unwrap();
    assert!(bios::dispatch(0x10, vm));

    assert_eq!(vm.dh().unwrap(), 10);
    assert_eq!(vm.dl().unwrap(), 40);
}

#[test]
fn scroll_with_zero_lines_clears_the_window() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x0E41).unwrap(); // put an 'A' on the screen first
    assert!(bios::dispatch(0x10, vm));

    vm.set_ax(0x0600).unwrap(); // AH=06, AL=0: blank the window
    vm.set_bx(0x1700).unwrap(); // BH=0x17 fill attribute
    vm.set_cx(0x0000).unwrap();
    vm.set_dx(0x184F).unwrap(); // full 80x25
    assert!(bios::dispatch(0x10, vm));

    let screen = vm.get_data().ui.screen.lock().unwrap();
    let cell = screen.cell_at(0, 0, 0);
    assert_eq!(cell.glyph, b' ');
    assert_eq!(cell.attribute, 0x17);
}

#[test]
fn write_string_advances_only_when_asked() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.write(0x0600, b"HI").unwrap();

    vm.set_ax(0x1300).unwrap(); // AL bit0=0: cursor stays
    vm.set_bx(0x0007).unwrap(); // page 0, attribute 0x07
    vm.set_cx(2).unwrap();
    vm.set_dx(0x0500).unwrap(); // row 5, col 0
    vm.set_es(0x0000).unwrap();
    vm.set_bp(0x0600).unwrap();
    assert!(bios::dispatch(0x10, vm));

    let screen = vm.get_data().ui.screen.lock().unwrap();
    assert_eq!(screen.cell_at(0, 5, 0).glyph, b'H');
    assert_eq!(screen.cell_at(0, 5, 1).glyph, b'I');
    assert_eq!(screen.cursor(0), (0, 0));
}

#[test]
fn get_video_mode_reports_text_mode() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x0F00).unwrap();
    assert!(bios::dispatch(0x10, vm));

    assert_eq!(vm.al().unwrap(), 0x03);
    assert_eq!(vm.ah().unwrap(), 80);
    assert_eq!(vm.bh().unwrap(), 0);
}

#[test]
fn vesa_calls_fail_gracefully() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x4F00).unwrap();
    assert!(bios::dispatch(0x10, vm));

    assert!(!carry(vm));
    assert_eq!(vm.al().unwrap(), 0x4F);
    assert_eq!(vm.ah().unwrap(), 0x01);
}

#[test]
fn unknown_video_function_is_unsupported() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0xC300).unwrap();
    assert!(bios::dispatch(0x10, vm));

    assert!(carry(vm));
    assert_eq!(vm.ah().unwrap(), 0x86);
}

// ========================================================================
// INT 11h / INT 12h — equipment and memory
// ========================================================================

#[test]
fn equipment_word_reports_floppy_and_colour_text() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    dirty_carry(vm);
    assert!(bios::dispatch(0x11, vm));

    assert!(!carry(vm));
    let ax = vm.ax().unwrap();
    assert_eq!(ax & 0x0001, 0x0001, "diskette bit");
    assert_eq!((ax >> 4) & 0x03, 0b10, "80x25 colour text");
    assert_eq!((ax >> 9) & 0x07, 1, "one serial port");
    assert_eq!((ax >> 14) & 0x03, 1, "one parallel port");
    assert_eq!(ax & 0x0002, 0, "no coprocessor");
}

#[test]
fn base_memory_is_640k() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    dirty_carry(vm);
    assert!(bios::dispatch(0x12, vm));

    assert!(!carry(vm));
    assert_eq!(vm.ax().unwrap(), 640);
}

// ========================================================================
// INT 15h — system services
// ========================================================================

#[test]
fn a20_gate_state_round_trips() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);

    vm.set_ax(0x2401).unwrap(); // enable
    assert!(bios::dispatch(0x15, vm));
    assert!(!carry(vm));
    assert_eq!(vm.ah().unwrap(), 0);

    vm.set_ax(0x2402).unwrap(); // status
    assert!(bios::dispatch(0x15, vm));
    assert_eq!(vm.al().unwrap(), 1);

    vm.set_ax(0x2400).unwrap(); // disable
    assert!(bios::dispatch(0x15, vm));
    vm.set_ax(0x2402).unwrap();
    assert!(bios::dispatch(0x15, vm));
    assert_eq!(vm.al().unwrap(), 0);
}

#[test]
fn extended_memory_is_what_lies_beyond_1mib() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x8800).unwrap();
    dirty_carry(vm);
    assert!(bios::dispatch(0x15, vm));

    assert!(!carry(vm));
    assert_eq!(vm.ax().unwrap() as u64, (TEST_MEMORY - (1 << 20)) / 1024);
}

#[test]
fn memory_map_iterates_one_usable_region() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);

    vm.set_ax(0xE801).unwrap();
    vm.set_ebx(0).unwrap();
    vm.set_es(0x0060).unwrap();
    vm.set_di(0x0000).unwrap();
    assert!(bios::dispatch(0x15, vm));

    assert!(!carry(vm));
    assert_eq!(vm.ebx().unwrap(), 1);
    assert_eq!(vm.cx().unwrap(), 20);
    let entry = vm.read(0x0600, 20).unwrap();
    assert_eq!(u64::from_le_bytes(entry[0..8].try_into().unwrap()), 0);
    assert_eq!(
        u64::from_le_bytes(entry[8..16].try_into().unwrap()),
        TEST_MEMORY
    );
    assert_eq!(u32::from_le_bytes(entry[16..20].try_into().unwrap()), 1);

    // Continuation 1 ends the table.
    vm.set_ax(0xE801).unwrap();
    assert!(bios::dispatch(0x15, vm));
    assert!(!carry(vm));
    assert_eq!(vm.ebx().unwrap(), 0);

    // Anything else is out of range.
    vm.set_ax(0xE801).unwrap();
    vm.set_ebx(7).unwrap();
    assert!(bios::dispatch(0x15, vm));
    assert!(carry(vm));
}

#[test]
fn unknown_system_function_is_unsupported() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0xC000).unwrap();
    assert!(bios::dispatch(0x15, vm));

    assert!(carry(vm));
    assert_eq!(vm.ah().unwrap(), 0x86);
}

// ========================================================================
// INT 16h — keyboard services
// ========================================================================

#[test]
fn blocked_read_returns_the_queued_key() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.get_data().ui.input.push(KeyStroke {
        scancode: 0x1E,
        ascii: b'a',
    });

    vm.set_ax(0x0000).unwrap();
    assert!(bios::dispatch(0x16, vm));

    assert_eq!(vm.ah().unwrap(), 0x1E);
    assert_eq!(vm.al().unwrap(), b'a');
}

#[test]
fn peek_reports_without_consuming() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);

    vm.set_ax(0x0100).unwrap();
    assert!(bios::dispatch(0x16, vm));
    assert!(vm.check_flag(CpuFlag::Zero).unwrap(), "empty queue sets ZF");

    vm.get_data().ui.input.push(KeyStroke {
        scancode: 0x1C,
        ascii: 0x0D,
    });
    vm.set_ax(0x0100).unwrap();
    assert!(bios::dispatch(0x16, vm));
    assert!(!vm.check_flag(CpuFlag::Zero).unwrap());
    assert_eq!(vm.ax().unwrap(), 0x1C0D);

    // Still there for the blocking read.
    vm.set_ax(0x0000).unwrap();
    assert!(bios::dispatch(0x16, vm));
    assert_eq!(vm.ax().unwrap(), 0x1C0D);
}

#[test]
fn cancelled_wait_returns_null_key() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.get_data().ui.input.cancel();

    vm.set_ax(0x00FF).unwrap();
    assert!(bios::dispatch(0x16, vm));

    assert_eq!(vm.ax().unwrap(), 0);
}

#[test]
fn shift_flags_come_from_the_ui() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.get_data().ui.input.set_shift_flags(0x06); // ctrl+shift

    vm.set_ax(0x0200).unwrap();
    assert!(bios::dispatch(0x16, vm));

    assert_eq!(vm.al().unwrap(), 0x06);
}

// ========================================================================
// INT 05h / 14h / 17h / 18h / 19h / 1Ah
// ========================================================================

#[test]
fn print_screen_is_a_recorded_no_op() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    dirty_carry(vm);
    assert!(bios::dispatch(0x05, vm));
    assert!(!carry(vm));
}

#[test]
fn serial_and_printer_report_no_device() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);

    vm.set_ax(0x0141).unwrap(); // serial write 'A'
    assert!(bios::dispatch(0x14, vm));
    assert!(!carry(vm));
    assert_eq!(vm.ah().unwrap(), 0x80);

    vm.set_ax(0x0241).unwrap(); // printer status
    assert!(bios::dispatch(0x17, vm));
    assert!(!carry(vm));
    assert_eq!(vm.ah().unwrap(), 0x01);
}

#[test]
fn rom_basic_stops_the_machine() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    assert!(bios::dispatch(0x18, vm));
    assert!(vm.get_data().ui.stop_requested());
}

#[test]
fn warm_reboot_reloads_the_boot_sector() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    let pristine = vm.read(BOOT_ADDR, 512).unwrap();

    vm.write(BOOT_ADDR, &[0xFFu8; 512]).unwrap();
    assert!(bios::dispatch(0x19, vm));

    assert_eq!(vm.read(BOOT_ADDR, 512).unwrap(), pristine);
    assert_eq!(vm.cs().unwrap(), 0x0000);
    assert_eq!(vm.ip().unwrap(), BOOT_ADDR as u16);
    assert_eq!(vm.dl().unwrap(), 0x00);
}

#[test]
fn rtc_time_is_bcd_encoded() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x0200).unwrap();
    dirty_carry(vm);
    assert!(bios::dispatch(0x1A, vm));

    assert!(!carry(vm));
    let is_bcd = |v: u8| (v & 0x0F) <= 9 && (v >> 4) <= 9;
    assert!(is_bcd(vm.ch().unwrap()), "hours");
    assert!(is_bcd(vm.cl().unwrap()), "minutes");
    assert!(is_bcd(vm.dh().unwrap()), "seconds");
    assert!(vm.ch().unwrap() <= 0x23);
    assert!(vm.cl().unwrap() <= 0x59);
}

#[test]
fn tick_count_fits_a_day() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x0000).unwrap();
    assert!(bios::dispatch(0x1A, vm));

    let ticks = ((vm.cx().unwrap() as u32) << 16) | vm.dx().unwrap() as u32;
    assert!(ticks < 1_573_040, "at most 24h worth of 18.2 Hz ticks");
    assert_eq!(vm.al().unwrap(), 0);
}

#[test]
fn unknown_clock_function_is_unsupported() {
    let mut machine = boot_machine();
    let vm = vm(&mut machine);
    vm.set_ax(0x0B00).unwrap();
    assert!(bios::dispatch(0x1A, vm));

    assert!(carry(vm));
    assert_eq!(vm.ah().unwrap(), 0x86);
}
