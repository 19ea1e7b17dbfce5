use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::ui::input::InputQueue;

pub mod input;
pub mod term;

pub const COLUMNS: usize = 80;
pub const ROWS: usize = 25;
pub const PAGES: usize = 8;

const DEBUG_SCROLLBACK: usize = 256;

/// One character cell of the emulated text screen.
#[derive(Clone, Copy)]
pub struct Cell {
    pub glyph: u8,
    pub attribute: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            glyph: b' ',
            attribute: 0x07,
        }
    }
}

/// 80x25 text screen state mutated by the INT 10h services and rendered by
/// the terminal thread. Cursor positions are tracked per display page.
pub struct Screen {
    mode: u8,
    active_page: u8,
    cursor: [(u8, u8); PAGES], // (row, col)
    shape: (u8, u8),           // (start scanline, end scanline)
    cells: Vec<Cell>,
    dirty: bool,
}

impl Screen {
    pub fn new() -> Self {
        Self {
            mode: 0x03,
            active_page: 0,
            cursor: [(0, 0); PAGES],
            shape: (0x06, 0x07),
            cells: vec![Cell::default(); PAGES * ROWS * COLUMNS],
            dirty: true,
        }
    }

    /// Cell index, or None when the position lies off screen (the guest
    /// may park the cursor outside the visible area).
    fn index(page: u8, row: u8, col: u8) -> Option<usize> {
        if row as usize >= ROWS || col as usize >= COLUMNS {
            return None;
        }
        Some(
            (page as usize & (PAGES - 1)) * ROWS * COLUMNS
                + row as usize * COLUMNS
                + col as usize,
        )
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    /// Record a mode change. Only 80x25 text is rendered; other modes are
    /// accepted and remembered so the guest sees them back from AH=0Fh.
    pub fn set_mode(&mut self, mode: u8, clear: bool) {
        self.mode = mode;
        if clear {
            self.clear(0x07);
        }
        self.cursor = [(0, 0); PAGES];
        self.dirty = true;
    }

    pub fn shape(&self) -> (u8, u8) {
        self.shape
    }

    pub fn set_shape(&mut self, start: u8, end: u8) {
        self.shape = (start, end);
    }

    pub fn active_page(&self) -> u8 {
        self.active_page
    }

    pub fn set_active_page(&mut self, page: u8) {
        self.active_page = page & (PAGES as u8 - 1);
        self.dirty = true;
    }

    pub fn cursor(&self, page: u8) -> (u8, u8) {
        self.cursor[page as usize & (PAGES - 1)]
    }

    pub fn set_cursor(&mut self, page: u8, row: u8, col: u8) {
        self.cursor[page as usize & (PAGES - 1)] = (row, col);
        self.dirty = true;
    }

    pub fn cell_at(&self, page: u8, row: u8, col: u8) -> Cell {
        match Self::index(page, row, col) {
            Some(index) => self.cells[index],
            None => Cell::default(),
        }
    }

    pub fn put(&mut self, page: u8, row: u8, col: u8, glyph: u8, attribute: u8) {
        if let Some(index) = Self::index(page, row, col) {
            self.cells[index] = Cell { glyph, attribute };
            self.dirty = true;
        }
    }

    /// Write a glyph keeping the existing attribute of the cell.
    pub fn put_glyph(&mut self, page: u8, row: u8, col: u8, glyph: u8) {
        if let Some(index) = Self::index(page, row, col) {
            self.cells[index].glyph = glyph;
            self.dirty = true;
        }
    }

    pub fn clear(&mut self, attribute: u8) {
        for cell in &mut self.cells {
            *cell = Cell {
                glyph: b' ',
                attribute,
            };
        }
        self.dirty = true;
    }

    /// Scroll a window of the given page. Positive `lines` scrolls up,
    /// negative scrolls down; vacated rows are filled with `attribute`.
    pub fn scroll(
        &mut self,
        page: u8,
        top: u8,
        left: u8,
        bottom: u8,
        right: u8,
        attribute: u8,
        lines: i16,
    ) {
        let bottom = bottom.min(ROWS as u8 - 1);
        let right = right.min(COLUMNS as u8 - 1);
        if top > bottom || left > right || lines == 0 {
            return;
        }
        let lines = lines.clamp(-(ROWS as i16), ROWS as i16);

        if lines > 0 {
            let n = lines as u8;
            for row in top..=bottom {
                for col in left..=right {
                    if row + n <= bottom {
                        let src = self.cell_at(page, row + n, col);
                        self.put(page, row, col, src.glyph, src.attribute);
                    } else {
                        self.put(page, row, col, b' ', attribute);
                    }
                }
            }
        } else {
            let n = (-lines) as u8;
            for row in (top..=bottom).rev() {
                for col in left..=right {
                    if row >= top + n {
                        let src = self.cell_at(page, row - n, col);
                        self.put(page, row, col, src.glyph, src.attribute);
                    } else {
                        self.put(page, row, col, b' ', attribute);
                    }
                }
            }
        }
        self.dirty = true;
    }

    /// Teletype output: CR, LF, BS and BEL are interpreted, anything else
    /// is written at the cursor, which then advances with wrap and scroll.
    pub fn teletype(&mut self, page: u8, glyph: u8) {
        let (mut row, mut col) = self.cursor(page);

        match glyph {
            0x0D => col = 0,
            0x0A => row = row.saturating_add(1),
            0x08 => col = col.saturating_sub(1),
            0x07 => {} // bell
            _ => {
                let attribute = self.cell_at(page, row, col).attribute;
                self.put(page, row, col, glyph, attribute);
                col = col.saturating_add(1);
            }
        }

        if col >= COLUMNS as u8 {
            col = 0;
            row = row.saturating_add(1);
        }
        if row >= ROWS as u8 {
            self.scroll(page, 0, 0, ROWS as u8 - 1, COLUMNS as u8 - 1, 0x07, 1);
            row = ROWS as u8 - 1;
        }
        self.set_cursor(page, row, col);
    }

    /// Advance the cursor one cell with the same wrap/scroll rules as
    /// teletype output.
    pub fn advance_cursor(&mut self, page: u8) {
        let (mut row, mut col) = self.cursor(page);
        col = col.saturating_add(1);
        if col >= COLUMNS as u8 {
            col = 0;
            row = row.saturating_add(1);
        }
        if row >= ROWS as u8 {
            self.scroll(page, 0, 0, ROWS as u8 - 1, COLUMNS as u8 - 1, 0x07, 1);
            row = ROWS as u8 - 1;
        }
        self.set_cursor(page, row, col);
    }

    /// Clears and returns the dirty flag; the render thread uses this to
    /// skip redraws of an unchanged screen.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// Register values published by the dispatcher for the debug view.
/// Reads may tear relative to the running guest; the view is diagnostic.
#[derive(Clone, Copy, Default)]
pub struct CpuSnapshot {
    pub ax: u16,
    pub bx: u16,
    pub cx: u16,
    pub dx: u16,
    pub si: u16,
    pub di: u16,
    pub bp: u16,
    pub sp: u16,
    pub cs: u16,
    pub ip: u16,
    pub ds: u16,
    pub es: u16,
    pub ss: u16,
    pub flags: u16,
    pub last_vector: u8,
}

/// Handles shared between the guest thread and the UI threads: the text
/// screen, the key-event queue, the debug scrollback and the stop flag.
#[derive(Clone)]
pub struct Ui {
    pub screen: Arc<Mutex<Screen>>,
    pub input: Arc<InputQueue>,
    debug: Arc<Mutex<VecDeque<String>>>,
    snapshot: Arc<Mutex<CpuSnapshot>>,
    stop: Arc<AtomicBool>,
}

impl Ui {
    pub fn new() -> Self {
        Self {
            screen: Arc::new(Mutex::new(Screen::new())),
            input: Arc::new(InputQueue::new()),
            debug: Arc::new(Mutex::new(VecDeque::new())),
            snapshot: Arc::new(Mutex::new(CpuSnapshot::default())),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Enqueue a line on the debug stream.
    pub fn debug(&self, line: impl Into<String>) {
        let line = line.into();
        log::debug!("{}", line);
        let mut scrollback = self.debug.lock().unwrap();
        if scrollback.len() == DEBUG_SCROLLBACK {
            scrollback.pop_front();
        }
        scrollback.push_back(line);
    }

    pub fn debug_tail(&self, count: usize) -> Vec<String> {
        let scrollback = self.debug.lock().unwrap();
        scrollback
            .iter()
            .rev()
            .take(count)
            .rev()
            .cloned()
            .collect()
    }

    pub fn publish_snapshot(&self, snapshot: CpuSnapshot) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        *self.snapshot.lock().unwrap()
    }

    /// Ask the guest to stop at the next instruction boundary and wake any
    /// blocked keyboard wait.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.input.cancel();
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

impl Default for Ui {
    fn default() -> Self {
        Self::new()
    }
}
