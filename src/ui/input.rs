use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::ui::Ui;

/// Matches the 16-entry ring of a real keyboard controller.
const CAPACITY: usize = 16;

/// One keystroke as INT 16h returns it: AH=scancode, AL=ASCII.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyStroke {
    pub scancode: u8,
    pub ascii: u8,
}

/// Bounded single-producer/single-consumer key queue.
///
/// The UI thread enqueues, the guest thread dequeues from inside the
/// INT 16h services. Cancellation wakes a blocked consumer, which then
/// reports "no key" and lets the engine stop.
pub struct InputQueue {
    queue: Mutex<VecDeque<KeyStroke>>,
    available: Condvar,
    cancelled: AtomicBool,
    shift_flags: AtomicU8,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            cancelled: AtomicBool::new(false),
            shift_flags: AtomicU8::new(0),
        }
    }

    /// Enqueue a keystroke. Returns false (and drops the key) when the
    /// buffer is full, like a saturated keyboard controller.
    pub fn push(&self, key: KeyStroke) -> bool {
        let mut queue = self.queue.lock().unwrap();
        if queue.len() == CAPACITY {
            return false;
        }
        queue.push_back(key);
        self.available.notify_one();
        true
    }

    /// Block until a keystroke arrives or the queue is cancelled.
    pub fn wait(&self) -> Option<KeyStroke> {
        let mut queue = self.queue.lock().unwrap();
        loop {
            if let Some(key) = queue.pop_front() {
                return Some(key);
            }
            if self.cancelled.load(Ordering::SeqCst) {
                return None;
            }
            queue = self.available.wait(queue).unwrap();
        }
    }

    /// Look at the next keystroke without consuming it.
    pub fn peek(&self) -> Option<KeyStroke> {
        self.queue.lock().unwrap().front().copied()
    }

    /// Wake any blocked consumer permanently.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.available.notify_all();
    }

    pub fn set_shift_flags(&self, flags: u8) {
        self.shift_flags.store(flags, Ordering::SeqCst);
    }

    /// Modifier bitmap as INT 16h AH=02h reports it.
    pub fn shift_flags(&self) -> u8 {
        self.shift_flags.load(Ordering::SeqCst)
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the terminal input thread: polls crossterm events, translates
/// them to scancode/ASCII pairs and feeds the input queue. Ctrl+Q stops
/// the emulator.
pub fn spawn_input_thread(ui: Ui) -> JoinHandle<()> {
    std::thread::spawn(move || {
        log::debug!("input thread started");
        loop {
            if ui.stop_requested() {
                break;
            }

            match event::poll(Duration::from_millis(100)) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    log::debug!("input poll error: {:?}", e);
                    std::thread::sleep(Duration::from_millis(10));
                    continue;
                }
            }

            let ev = match event::read() {
                Ok(ev) => ev,
                Err(e) => {
                    log::debug!("input read error: {:?}", e);
                    continue;
                }
            };

            let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = ev
            else {
                continue;
            };
            if kind != KeyEventKind::Press {
                continue;
            }

            ui.input.set_shift_flags(shift_flags(modifiers));

            if code == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
                ui.request_stop();
                break;
            }

            if let Some(key) = keycode_to_keystroke(code, modifiers) {
                if !ui.input.push(key) {
                    log::debug!("input queue full, dropped sc={:02X}", key.scancode);
                }
            }
        }
        log::debug!("input thread stopped");
    })
}

/// Map crossterm modifiers to the BIOS shift-flag bitmap
/// (bit 0/1 shift, bit 2 ctrl, bit 3 alt).
fn shift_flags(modifiers: KeyModifiers) -> u8 {
    let mut flags = 0;
    if modifiers.contains(KeyModifiers::SHIFT) {
        flags |= 0x02;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        flags |= 0x04;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        flags |= 0x08;
    }
    flags
}

/// Translate a crossterm key event into the (scancode, ASCII) pair the
/// guest reads through INT 16h.
fn keycode_to_keystroke(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyStroke> {
    let (scancode, ascii) = match code {
        KeyCode::Char(ch) => {
            let scancode = char_to_scancode(ch)?;
            let ascii = if modifiers.contains(KeyModifiers::CONTROL) {
                if ch.is_ascii_alphabetic() {
                    (ch.to_ascii_uppercase() as u8) & 0x1F
                } else {
                    0
                }
            } else if ch.is_ascii() {
                ch as u8
            } else {
                0
            };
            (scancode, ascii)
        }
        KeyCode::Enter => (0x1C, 0x0D),
        KeyCode::Backspace => (0x0E, 0x08),
        KeyCode::Tab => (0x0F, 0x09),
        KeyCode::Esc => (0x01, 0x1B),
        KeyCode::Up => (0x48, 0x00),
        KeyCode::Down => (0x50, 0x00),
        KeyCode::Left => (0x4B, 0x00),
        KeyCode::Right => (0x4D, 0x00),
        KeyCode::Home => (0x47, 0x00),
        KeyCode::End => (0x4F, 0x00),
        KeyCode::PageUp => (0x49, 0x00),
        KeyCode::PageDown => (0x51, 0x00),
        KeyCode::Insert => (0x52, 0x00),
        KeyCode::Delete => (0x53, 0x00),
        KeyCode::F(n @ 1..=10) => (0x3A + n as u8, 0x00),
        KeyCode::F(11) => (0x57, 0x00),
        KeyCode::F(12) => (0x58, 0x00),
        _ => return None,
    };
    Some(KeyStroke { scancode, ascii })
}

/// PC AT make code for a printable character. Shifted symbols share the
/// scancode of their unshifted key.
fn char_to_scancode(ch: char) -> Option<u8> {
    let scancode = match ch.to_ascii_lowercase() {
        '1' | '!' => 0x02,
        '2' | '@' => 0x03,
        '3' | '#' => 0x04,
        '4' | '$' => 0x05,
        '5' | '%' => 0x06,
        '6' | '^' => 0x07,
        '7' | '&' => 0x08,
        '8' | '*' => 0x09,
        '9' | '(' => 0x0A,
        '0' | ')' => 0x0B,
        '-' | '_' => 0x0C,
        '=' | '+' => 0x0D,
        'q' => 0x10,
        'w' => 0x11,
        'e' => 0x12,
        'r' => 0x13,
        't' => 0x14,
        'y' => 0x15,
        'u' => 0x16,
        'i' => 0x17,
        'o' => 0x18,
        'p' => 0x19,
        '[' | '{' => 0x1A,
        ']' | '}' => 0x1B,
        'a' => 0x1E,
        's' => 0x1F,
        'd' => 0x20,
        'f' => 0x21,
        'g' => 0x22,
        'h' => 0x23,
        'j' => 0x24,
        'k' => 0x25,
        'l' => 0x26,
        ';' | ':' => 0x27,
        '\'' | '"' => 0x28,
        '`' | '~' => 0x29,
        '\\' | '|' => 0x2B,
        'z' => 0x2C,
        'x' => 0x2D,
        'c' => 0x2E,
        'v' => 0x2F,
        'b' => 0x30,
        'n' => 0x31,
        'm' => 0x32,
        ',' | '<' => 0x33,
        '.' | '>' => 0x34,
        '/' | '?' => 0x35,
        ' ' => 0x39,
        _ => return None,
    };
    Some(scancode)
}
