use crate::bios::{clear_carry, run_service, Service, ServiceResult};
use crate::engine::{get_address, Cpu};
use crate::machine::Vm;
use crate::ui::{COLUMNS, ROWS};

/// INT 10h — Video services
pub fn int10h(vm: &mut Vm) -> ServiceResult {
    run_service(vm, SERVICES)
}

const SERVICES: &[(u8, Service)] = &[
    (0x00, set_video_mode),
    (0x01, set_cursor_shape),
    (0x02, set_cursor_pos),
    (0x03, get_cursor_pos),
    (0x05, select_active_page),
    (0x06, scroll_up),
    (0x07, scroll_down),
    (0x08, read_char_attr),
    (0x09, write_char_attr),
    (0x0A, write_char_only),
    (0x0E, teletype_output),
    (0x0F, get_video_mode),
    (0x12, alternate_select),
    (0x13, write_string),
    (0x4F, vesa),
];

fn set_video_mode(vm: &mut Vm) -> ServiceResult {
    let al = vm.al()?;
    let mode = al & 0x7F;
    let clear = al & 0x80 == 0; // bit 7 = don't clear screen
    vm.get_data()
        .ui
        .debug(format!("set video mode {:02X}h", mode));
    let screen = vm.get_data().ui.screen.clone();
    screen.lock().unwrap().set_mode(mode, clear);
    clear_carry(vm)
}

fn set_cursor_shape(vm: &mut Vm) -> ServiceResult {
    let start = vm.ch()?;
    let end = vm.cl()?;
    let screen = vm.get_data().ui.screen.clone();
    screen.lock().unwrap().set_shape(start, end);
    clear_carry(vm)
}

fn set_cursor_pos(vm: &mut Vm) -> ServiceResult {
    let page = vm.bh()?;
    let row = vm.dh()?;
    let col = vm.dl()?;
    let screen = vm.get_data().ui.screen.clone();
    screen.lock().unwrap().set_cursor(page, row, col);
    clear_carry(vm)
}

fn get_cursor_pos(vm: &mut Vm) -> ServiceResult {
    let page = vm.bh()?;
    let screen = vm.get_data().ui.screen.clone();
    let (row, col, shape) = {
        let screen = screen.lock().unwrap();
        let (row, col) = screen.cursor(page);
        (row, col, screen.shape())
    };
    vm.set_dh(row)?;
    vm.set_dl(col)?;
    vm.set_ch(shape.0)?;
    vm.set_cl(shape.1)?;
    clear_carry(vm)
}

fn select_active_page(vm: &mut Vm) -> ServiceResult {
    let page = vm.al()?;
    let screen = vm.get_data().ui.screen.clone();
    screen.lock().unwrap().set_active_page(page);
    clear_carry(vm)
}

fn scroll_up(vm: &mut Vm) -> ServiceResult {
    scroll_window(vm, 1)
}

fn scroll_down(vm: &mut Vm) -> ServiceResult {
    scroll_window(vm, -1)
}

/// Shared body of AH=06h/07h. AL=0 blanks the whole window.
fn scroll_window(vm: &mut Vm, direction: i16) -> ServiceResult {
    let lines = vm.al()?;
    let attribute = vm.bh()?;
    let top = vm.ch()?;
    let left = vm.cl()?;
    let bottom = vm.dh()?;
    let right = vm.dl()?;

    let lines = if lines == 0 {
        bottom.saturating_sub(top) as i16 + 1
    } else {
        lines as i16
    };

    let screen = vm.get_data().ui.screen.clone();
    {
        let mut screen = screen.lock().unwrap();
        let page = screen.active_page();
        screen.scroll(page, top, left, bottom, right, attribute, lines * direction);
    }
    clear_carry(vm)
}

fn read_char_attr(vm: &mut Vm) -> ServiceResult {
    let page = vm.bh()?;
    let screen = vm.get_data().ui.screen.clone();
    let cell = {
        let screen = screen.lock().unwrap();
        let (row, col) = screen.cursor(page);
        screen.cell_at(page, row, col)
    };
    vm.set_al(cell.glyph)?;
    vm.set_ah(cell.attribute)?;
    clear_carry(vm)
}

fn write_char_attr(vm: &mut Vm) -> ServiceResult {
    let glyph = vm.al()?;
    let page = vm.bh()?;
    let attribute = vm.bl()?;
    let count = vm.cx()?;
    let screen = vm.get_data().ui.screen.clone();
    {
        let mut screen = screen.lock().unwrap();
        let (mut row, mut col) = screen.cursor(page);
        // Repeats do not move the cursor; they spill onto following rows.
        for _ in 0..count {
            screen.put(page, row, col, glyph, attribute);
            if !advance(&mut row, &mut col) {
                break;
            }
        }
    }
    clear_carry(vm)
}

fn write_char_only(vm: &mut Vm) -> ServiceResult {
    let glyph = vm.al()?;
    let page = vm.bh()?;
    let count = vm.cx()?;
    let screen = vm.get_data().ui.screen.clone();
    {
        let mut screen = screen.lock().unwrap();
        let (mut row, mut col) = screen.cursor(page);
        for _ in 0..count {
            screen.put_glyph(page, row, col, glyph);
            if !advance(&mut row, &mut col) {
                break;
            }
        }
    }
    clear_carry(vm)
}

/// Step one cell forward within the page, without scrolling.
fn advance(row: &mut u8, col: &mut u8) -> bool {
    *col = col.saturating_add(1);
    if *col >= COLUMNS as u8 {
        *col = 0;
        *row = row.saturating_add(1);
    }
    (*row as usize) < ROWS
}

fn teletype_output(vm: &mut Vm) -> ServiceResult {
    let glyph = vm.al()?;
    let screen = vm.get_data().ui.screen.clone();
    {
        let mut screen = screen.lock().unwrap();
        let page = screen.active_page();
        screen.teletype(page, glyph);
    }
    clear_carry(vm)
}

fn get_video_mode(vm: &mut Vm) -> ServiceResult {
    let screen = vm.get_data().ui.screen.clone();
    let (mode, page) = {
        let screen = screen.lock().unwrap();
        (screen.mode(), screen.active_page())
    };
    vm.set_al(mode)?;
    vm.set_ah(COLUMNS as u8)?;
    vm.set_bh(page)?;
    clear_carry(vm)
}

/// AH=12h alternate select. Only BL=10h (get EGA info) returns data.
fn alternate_select(vm: &mut Vm) -> ServiceResult {
    if vm.bl()? == 0x10 {
        vm.set_bh(0x00)?; // colour mode
        vm.set_bl(0x03)?; // 256K of EGA memory
        vm.set_cx(0x0000)?; // feature bits
    }
    clear_carry(vm)
}

/// AH=13h write string from ES:BP.
/// AL bit 0 moves the cursor after writing, bit 1 selects interleaved
/// character/attribute pairs.
fn write_string(vm: &mut Vm) -> ServiceResult {
    let mode = vm.al()?;
    let page = vm.bh()?;
    let attribute = vm.bl()?;
    let length = vm.cx()? as usize;
    let row = vm.dh()?;
    let col = vm.dl()?;

    let update_cursor = mode & 0x01 != 0;
    let interleaved = mode & 0x02 != 0;

    let source = get_address(vm.es()?, vm.bp()?);
    let span = if interleaved { length * 2 } else { length };
    let bytes = vm.read(source, span)?;

    let screen = vm.get_data().ui.screen.clone();
    {
        let mut screen = screen.lock().unwrap();
        let saved = screen.cursor(page);
        screen.set_cursor(page, row, col);

        let mut offset = 0;
        for _ in 0..length {
            let glyph = bytes[offset];
            let attribute = if interleaved {
                offset += 2;
                bytes[offset - 1]
            } else {
                offset += 1;
                attribute
            };

            match glyph {
                0x0D | 0x0A | 0x08 | 0x07 => screen.teletype(page, glyph),
                _ => {
                    let (r, c) = screen.cursor(page);
                    screen.put(page, r, c, glyph, attribute);
                    screen.advance_cursor(page);
                }
            }
        }

        if !update_cursor {
            screen.set_cursor(page, saved.0, saved.1);
        }
    }
    clear_carry(vm)
}

/// AH=4Fh VESA BIOS extensions: answered with the VBE "call failed"
/// status instead of crashing. Full VBE is out of scope.
fn vesa(vm: &mut Vm) -> ServiceResult {
    let al = vm.al()?;
    vm.get_data()
        .ui
        .debug(format!("VESA function {:02X}h not supported", al));
    vm.set_al(0x4F)?;
    vm.set_ah(0x01)?;
    clear_carry(vm)
}
