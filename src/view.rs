//! Presentation helpers for front ends. Nothing here mutates a
//! [`Calculator`]; the view reads its state after every dispatch.

use crate::calculator::{Action, Calculator};
use crate::registry::{self, BUTTONS_LAYOUT};

pub const DEFAULT_FONT_SIZE: f64 = 32.0;
pub const MIN_FONT_SIZE: f64 = 21.0;
pub const SYMBOL_WIDTH: f64 = 28.0;
pub const COMPRESSION_RATIO: f64 = 1.05;

const CELL_WIDTH: usize = 5;

/// Font size in pixels that fits `text_len` symbols into a display
/// `width` pixels wide.
pub fn fit_font_size(text_len: usize, width: f64) -> f64 {
    let capacity = (width / SYMBOL_WIDTH).ceil().max(0.0) as usize;
    let excess = text_len.saturating_sub(capacity);
    if excess == 0 {
        return DEFAULT_FONT_SIZE;
    }
    (DEFAULT_FONT_SIZE - excess as f64 * COMPRESSION_RATIO).max(MIN_FONT_SIZE)
}

/// Resolves a key event to an action. Keys pressed with Ctrl or Alt are
/// left to the host.
pub fn resolve_key(key: &str) -> Option<Action> {
    if key.starts_with("Ctrl+") || key.starts_with("Alt+") {
        return None;
    }
    registry::find_by_shortcut(key).map(|operation| operation.action)
}

/// Draws the button grid. Controls disabled by the calculator's error
/// state are drawn in brackets.
pub fn render_buttons(calculator: &Calculator) -> String {
    let mut out = String::new();
    for row in BUTTONS_LAYOUT.iter() {
        for (idx, id) in row.iter().enumerate() {
            let cell = match registry::find_by_id(id) {
                Some(operation) if calculator.is_enabled(operation.action) => {
                    operation.label.to_string()
                }
                Some(operation) => format!("[{}]", operation.label),
                None => String::new(),
            };
            if idx > 0 {
                out.push(' ');
            }
            let padding = CELL_WIDTH.saturating_sub(cell.chars().count());
            out.push_str(&" ".repeat(padding));
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out
}

/// The display line, right aligned to `columns` characters.
pub fn render_display(calculator: &Calculator, columns: usize) -> String {
    let display = calculator.display();
    let padding = columns.saturating_sub(display.chars().count());
    format!("{}{}", " ".repeat(padding), display)
}
