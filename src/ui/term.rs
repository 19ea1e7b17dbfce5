use std::io::{Stdout, Write};
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::style::{Color, Colors, Print, ResetColor, SetColors};
use crossterm::{cursor, terminal, QueueableCommand};

use crate::ui::{Cell, Ui, COLUMNS, ROWS};

/// VGA colour index to ANSI 16-colour index (the two palettes disagree on
/// the ordering of blue/red and cyan/yellow).
const VGA_TO_ANSI: [u8; 16] = [0, 4, 2, 6, 1, 5, 3, 7, 8, 12, 10, 14, 9, 13, 11, 15];

/// Start the render thread: draws the text screen, a register status line
/// and the debug tail until the stop flag is set.
pub fn spawn_render_thread(ui: Ui) -> JoinHandle<()> {
    std::thread::spawn(move || {
        if let Err(e) = run(&ui) {
            log::error!("render thread error: {}", e);
            ui.request_stop();
        }
    })
}

fn run(ui: &Ui) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    terminal::enable_raw_mode()?;
    stdout.queue(terminal::EnterAlternateScreen)?;
    stdout.queue(cursor::Hide)?;
    stdout.flush()?;

    let result = render_loop(ui, &mut stdout);

    let _ = stdout.queue(cursor::Show);
    let _ = stdout.queue(ResetColor);
    let _ = stdout.queue(terminal::LeaveAlternateScreen);
    let _ = stdout.flush();
    let _ = terminal::disable_raw_mode();
    result
}

fn render_loop(ui: &Ui, stdout: &mut Stdout) -> std::io::Result<()> {
    let mut last_status = String::new();
    while !ui.stop_requested() {
        let dirty = ui.screen.lock().unwrap().take_dirty();
        let status = status_line(ui);
        if dirty || status != last_status {
            draw(ui, stdout, &status)?;
            last_status = status;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    Ok(())
}

fn draw(ui: &Ui, stdout: &mut Stdout, status: &str) -> std::io::Result<()> {
    // Snapshot the visible page under the lock, render outside it.
    let (cells, cursor_pos) = {
        let screen = ui.screen.lock().unwrap();
        let page = screen.active_page();
        let mut cells = Vec::with_capacity(ROWS * COLUMNS);
        for row in 0..ROWS as u8 {
            for col in 0..COLUMNS as u8 {
                cells.push(screen.cell_at(page, row, col));
            }
        }
        (cells, screen.cursor(page))
    };

    for row in 0..ROWS {
        stdout.queue(cursor::MoveTo(0, row as u16))?;
        for col in 0..COLUMNS {
            let cell = cells[row * COLUMNS + col];
            stdout.queue(SetColors(cell_colors(cell)))?;
            stdout.queue(Print(glyph_char(cell.glyph)))?;
        }
    }

    stdout.queue(ResetColor)?;
    stdout.queue(cursor::MoveTo(0, ROWS as u16))?;
    stdout.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
    stdout.queue(Print(status))?;

    for (i, line) in ui.debug_tail(3).iter().enumerate() {
        stdout.queue(cursor::MoveTo(0, (ROWS + 1 + i) as u16))?;
        stdout.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
        let mut line = line.clone();
        line.truncate(COLUMNS);
        stdout.queue(Print(line))?;
    }

    stdout.queue(cursor::MoveTo(cursor_pos.1 as u16, cursor_pos.0 as u16))?;
    stdout.flush()
}

fn status_line(ui: &Ui) -> String {
    let s = ui.snapshot();
    format!(
        "AX={:04X} BX={:04X} CX={:04X} DX={:04X} SI={:04X} DI={:04X} BP={:04X} SP={:04X} \
         DS={:04X} ES={:04X} SS={:04X} CS:IP={:04X}:{:04X} F={:04X} INT {:02X} | Ctrl+Q quits",
        s.ax,
        s.bx,
        s.cx,
        s.dx,
        s.si,
        s.di,
        s.bp,
        s.sp,
        s.ds,
        s.es,
        s.ss,
        s.cs,
        s.ip,
        s.flags,
        s.last_vector
    )
}

fn cell_colors(cell: Cell) -> Colors {
    let fg = VGA_TO_ANSI[(cell.attribute & 0x0F) as usize];
    let bg = VGA_TO_ANSI[((cell.attribute >> 4) & 0x07) as usize];
    Colors::new(Color::AnsiValue(fg), Color::AnsiValue(bg))
}

/// Printable ASCII passes through; everything else renders as a dot so the
/// layout of CP437-art screens stays readable.
fn glyph_char(glyph: u8) -> char {
    match glyph {
        0x20..=0x7E => glyph as char,
        0x00 => ' ',
        _ => '.',
    }
}
