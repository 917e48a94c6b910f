//! Read-only grid data consumed by the output engine.
//!
//! The real grid lives above this crate; the engine only ever reads cells,
//! per-line wrap flags, and the selection. This module carries the minimum
//! shape needed to drive rendering: a flat cell array per screen, panes
//! positioning screens inside the terminal, and the per-pane style state the
//! default-colour resolver folds in.

use std::cell::Cell;

use crate::cell::{CellFlags, DEFAULT_CELL, GridCell};

/// One logical screen: a grid of cells plus line metadata.
#[derive(Debug, Clone)]
pub struct Screen {
    cols: u32,
    rows: u32,
    cells: Vec<GridCell>,
    wrapped: Vec<bool>,
    /// Style applied to selected cells at draw time.
    pub sel_style: GridCell,
    /// Cursor style requested by the application (0 = default).
    pub cursor_style: u32,
    /// Cursor colour requested by the application (empty = default).
    pub cursor_colour: String,
}

impl Screen {
    pub fn new(cols: u32, rows: u32) -> Self {
        let mut sel_style = DEFAULT_CELL;
        sel_style.attr = CellFlags::REVERSE;
        Self {
            cols,
            rows,
            cells: vec![DEFAULT_CELL; (cols * rows) as usize],
            wrapped: vec![false; rows as usize],
            sel_style,
            cursor_style: 0,
            cursor_colour: String::new(),
        }
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// The cell at `(x, y)`; out-of-range reads return a blank.
    pub fn cell(&self, x: u32, y: u32) -> GridCell {
        if x < self.cols && y < self.rows {
            self.cells[(y * self.cols + x) as usize]
        } else {
            DEFAULT_CELL
        }
    }

    pub fn set_cell(&mut self, x: u32, y: u32, gc: GridCell) {
        if x < self.cols && y < self.rows {
            self.cells[(y * self.cols + x) as usize] = gc;
        }
    }

    /// Whether the line flowed into the next without an explicit newline.
    pub fn line_wrapped(&self, y: u32) -> bool {
        self.wrapped.get(y as usize).copied().unwrap_or(false)
    }

    pub fn set_line_wrapped(&mut self, y: u32, wrapped: bool) {
        if let Some(slot) = self.wrapped.get_mut(y as usize) {
            *slot = wrapped;
        }
    }

    /// Number of cells in use on a line: everything up to the last
    /// non-blank cell. Lets the painter skip a blank tail.
    pub fn line_used(&self, y: u32) -> u32 {
        if y >= self.rows {
            return 0;
        }
        let row = &self.cells[(y * self.cols) as usize..((y + 1) * self.cols) as usize];
        row.iter()
            .rposition(|gc| *gc != DEFAULT_CELL)
            .map_or(0, |i| i as u32 + 1)
    }

    /// Mix a selected cell with the selection style: colours and attributes
    /// come from the style, content and charset from the cell.
    pub fn selection_cell(&self, gc: &GridCell) -> GridCell {
        let mut mixed = self.sel_style;
        mixed.ch = gc.ch;
        mixed.attr &= !(CellFlags::CHARSET | CellFlags::PADDING);
        mixed.attr |= gc.attr & (CellFlags::CHARSET | CellFlags::PADDING);
        mixed
    }
}

/// A rectangular view of one screen positioned inside the terminal.
#[derive(Debug)]
pub struct Pane {
    pub id: u32,
    /// Window this pane belongs to; clients showing another window skip it.
    pub window_id: u32,
    /// Offset of the pane inside the window.
    pub xoff: u32,
    pub yoff: u32,
    pub screen: Screen,
    /// Explicit pane style, when set by the user.
    pub colgc: Option<GridCell>,
    /// Whether this is the window's active pane.
    pub active: bool,
    options: WindowOptions,
    cached_style: Cell<GridCell>,
    cached_active_style: Cell<GridCell>,
    style_changed: Cell<bool>,
}

/// The window option values the style resolver reads.
#[derive(Debug, Clone, Copy)]
pub struct WindowOptions {
    pub style: GridCell,
    pub active_style: GridCell,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            style: DEFAULT_CELL,
            active_style: DEFAULT_CELL,
        }
    }
}

impl Pane {
    pub fn new(id: u32, window_id: u32, screen: Screen) -> Self {
        let options = WindowOptions::default();
        Self {
            id,
            window_id,
            xoff: 0,
            yoff: 0,
            screen,
            colgc: None,
            active: false,
            options,
            cached_style: Cell::new(options.style),
            cached_active_style: Cell::new(options.active_style),
            style_changed: Cell::new(false),
        }
    }

    pub fn sx(&self) -> u32 {
        self.screen.cols()
    }

    pub fn sy(&self) -> u32 {
        self.screen.rows()
    }

    /// Replace the window options and flag the caches stale.
    pub fn set_options(&mut self, options: WindowOptions) {
        self.options = options;
        self.style_changed.set(true);
    }

    /// The resolved window style for this pane, refreshed from the options
    /// after a style change.
    pub fn style(&self) -> GridCell {
        if self.style_changed.get() {
            self.cached_style.set(self.options.style);
            self.cached_active_style.set(self.options.active_style);
            self.style_changed.set(false);
        }
        if self.active {
            self.cached_active_style.get()
        } else {
            self.cached_style.get()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Pane, Screen, WindowOptions};
    use crate::cell::{CellFlags, GridCell};

    #[test]
    fn out_of_range_cells_are_blank() {
        let s = Screen::new(4, 2);
        assert_eq!(s.cell(10, 10), GridCell::default());
    }

    #[test]
    fn line_used_tracks_last_content() {
        let mut s = Screen::new(8, 2);
        assert_eq!(s.line_used(0), 0);
        s.set_cell(2, 0, GridCell::new('x'));
        assert_eq!(s.line_used(0), 3);
    }

    #[test]
    fn selection_cell_keeps_content() {
        let s = Screen::new(4, 1);
        let mut gc = GridCell::new('q');
        gc.attr = CellFlags::CHARSET | CellFlags::BRIGHT;
        let mixed = s.selection_cell(&gc);
        assert_eq!(mixed.ch, 'q');
        assert!(mixed.attr.contains(CellFlags::CHARSET));
        assert!(mixed.attr.contains(CellFlags::REVERSE));
        assert!(!mixed.attr.contains(CellFlags::BRIGHT));
    }

    #[test]
    fn style_cache_refreshes_on_change() {
        let mut pane = Pane::new(1, 1, Screen::new(4, 2));
        let mut options = WindowOptions::default();
        options.style.fg = 3;
        pane.set_options(options);
        assert_eq!(pane.style().fg, 3);

        pane.active = true;
        let mut options = WindowOptions::default();
        options.active_style.fg = 5;
        pane.set_options(options);
        assert_eq!(pane.style().fg, 5);
    }
}
