//! Shadow-consistency properties.
//!
//! The emitted byte stream is replayed into a small reference terminal
//! built on the `vte` parser; after every operation the reference state
//! must agree with the engine's shadow. This is the invariant the whole
//! engine rests on: the shadow only earns its byte savings if it never
//! diverges from the real terminal.

use muxtty::caps::TermCaps;
use muxtty::cell::{CellFlags, GridCell};
use muxtty::colour::{COLOUR_FLAG_256, join_rgb};
use muxtty::screen::{Pane, Screen};
use muxtty::tty::Tty;

use vte::ansi::{Attr, Color, Handler, NamedColor, Processor};

/// A reference terminal: cursor, scroll region, and SGR state driven by
/// parsed escape sequences.
struct ModelTerm {
    cols: u32,
    rows: u32,
    col: u32,
    row: u32,
    wrap_pending: bool,
    rupper: u32,
    rlower: u32,
    attr: CellFlags,
    fg: u32,
    bg: u32,
}

impl ModelTerm {
    fn new(cols: u32, rows: u32) -> Self {
        Self {
            cols,
            rows,
            col: 0,
            row: 0,
            wrap_pending: false,
            rupper: 0,
            rlower: rows - 1,
            attr: CellFlags::empty(),
            fg: 8,
            bg: 8,
        }
    }

    /// Cursor as the engine shadows it: a pending wrap reads as one past
    /// the right edge.
    fn cursor(&self) -> (u32, u32) {
        if self.wrap_pending {
            (self.cols, self.row)
        } else {
            (self.col, self.row)
        }
    }

    fn region(&self) -> (u32, u32) {
        (self.rupper, self.rlower)
    }

    fn sgr(&self) -> (CellFlags, u32, u32) {
        (self.attr, self.fg, self.bg)
    }
}

fn colour_value(color: Color) -> u32 {
    match color {
        Color::Named(named) => match named {
            NamedColor::Black => 0,
            NamedColor::Red => 1,
            NamedColor::Green => 2,
            NamedColor::Yellow => 3,
            NamedColor::Blue => 4,
            NamedColor::Magenta => 5,
            NamedColor::Cyan => 6,
            NamedColor::White => 7,
            NamedColor::BrightBlack => 90,
            NamedColor::BrightRed => 91,
            NamedColor::BrightGreen => 92,
            NamedColor::BrightYellow => 93,
            NamedColor::BrightBlue => 94,
            NamedColor::BrightMagenta => 95,
            NamedColor::BrightCyan => 96,
            NamedColor::BrightWhite => 97,
            _ => 8,
        },
        Color::Indexed(idx) => COLOUR_FLAG_256 | u32::from(idx),
        Color::Spec(rgb) => join_rgb(rgb.r, rgb.g, rgb.b),
    }
}

impl Handler for ModelTerm {
    fn input(&mut self, _c: char) {
        if self.wrap_pending {
            self.col = 0;
            if self.row != self.rlower {
                self.row = (self.row + 1).min(self.rows - 1);
            }
            self.wrap_pending = false;
        }
        if self.col == self.cols - 1 {
            self.wrap_pending = true;
        } else {
            self.col += 1;
        }
    }

    fn goto(&mut self, line: i32, col: usize) {
        self.row = (line.max(0) as u32).min(self.rows - 1);
        self.col = (col as u32).min(self.cols - 1);
        self.wrap_pending = false;
    }

    fn goto_line(&mut self, line: i32) {
        self.row = (line.max(0) as u32).min(self.rows - 1);
        self.wrap_pending = false;
    }

    fn goto_col(&mut self, col: usize) {
        self.col = (col as u32).min(self.cols - 1);
        self.wrap_pending = false;
    }

    fn move_up(&mut self, n: usize) {
        let n = n as u32;
        let floor = if self.row >= self.rupper { self.rupper } else { 0 };
        self.row = self.row.saturating_sub(n).max(floor);
        self.wrap_pending = false;
    }

    fn move_down(&mut self, n: usize) {
        let n = n as u32;
        let ceil = if self.row <= self.rlower {
            self.rlower
        } else {
            self.rows - 1
        };
        self.row = (self.row + n).min(ceil);
        self.wrap_pending = false;
    }

    fn move_forward(&mut self, n: usize) {
        self.col = (self.col + n as u32).min(self.cols - 1);
        self.wrap_pending = false;
    }

    fn move_backward(&mut self, n: usize) {
        self.col = self.col.saturating_sub(n as u32);
        self.wrap_pending = false;
    }

    fn carriage_return(&mut self) {
        self.col = 0;
        self.wrap_pending = false;
    }

    fn linefeed(&mut self) {
        if self.row != self.rlower {
            self.row = (self.row + 1).min(self.rows - 1);
        }
    }

    fn backspace(&mut self) {
        self.col = self.col.saturating_sub(1);
        self.wrap_pending = false;
    }

    fn set_scrolling_region(&mut self, top: usize, bottom: Option<usize>) {
        self.rupper = (top as u32).saturating_sub(1);
        self.rlower = bottom.map_or(self.rows, |b| b as u32).saturating_sub(1);
        self.row = 0;
        self.col = 0;
        self.wrap_pending = false;
    }

    fn terminal_attribute(&mut self, attr: Attr) {
        match attr {
            Attr::Reset => {
                self.attr = CellFlags::empty();
                self.fg = 8;
                self.bg = 8;
            }
            Attr::Bold => self.attr.insert(CellFlags::BRIGHT),
            Attr::Dim => self.attr.insert(CellFlags::DIM),
            Attr::Italic => self.attr.insert(CellFlags::ITALIC),
            Attr::Underline => self.attr.insert(CellFlags::UNDERLINE),
            Attr::BlinkSlow | Attr::BlinkFast => self.attr.insert(CellFlags::BLINK),
            Attr::Reverse => self.attr.insert(CellFlags::REVERSE),
            Attr::Hidden => self.attr.insert(CellFlags::HIDDEN),
            Attr::Foreground(color) => self.fg = colour_value(color),
            Attr::Background(color) => self.bg = colour_value(color),
            _ => {}
        }
    }
}

struct Harness {
    tty: Tty,
    model: ModelTerm,
    parser: Processor,
}

impl Harness {
    fn new(term: &str, cols: u32, rows: u32) -> Self {
        let caps = TermCaps::for_term(term).unwrap();
        Self {
            tty: Tty::detached(caps, cols, rows),
            model: ModelTerm::new(cols, rows),
            parser: Processor::new(),
        }
    }

    fn replay(&mut self) {
        let bytes = self.tty.take_output();
        self.parser.advance(&mut self.model, &bytes);
    }

    fn assert_cursor_agrees(&mut self, what: &str) {
        self.replay();
        assert_eq!(
            Some(self.model.cursor()),
            self.tty.cursor(),
            "cursor shadow diverged after {what}"
        );
    }
}

const WALK: &[(u32, u32)] = &[
    (0, 0),
    (79, 0),
    (10, 5),
    (11, 5),
    (10, 5),
    (0, 5),
    (0, 6),
    (40, 12),
    (40, 20),
    (0, 0),
    (39, 12),
    (79, 23),
    (0, 23),
    (5, 23),
    (5, 3),
    (3, 3),
    (78, 3),
    (78, 4),
    (2, 4),
];

#[test]
fn cursor_shadow_matches_reference_on_xterm() {
    let mut h = Harness::new("xterm-256color", 80, 24);
    for &(x, y) in WALK {
        h.tty.cursor_to(x, y);
        h.assert_cursor_agrees(&format!("cursor_to({x}, {y})"));
    }
}

#[test]
fn cursor_shadow_matches_reference_on_vt100() {
    // Almost no movement capabilities: everything must still line up.
    let mut h = Harness::new("vt100", 80, 24);
    for &(x, y) in WALK {
        h.tty.cursor_to(x, y);
        h.assert_cursor_agrees(&format!("cursor_to({x}, {y})"));
    }
}

#[test]
fn cursor_shadow_matches_reference_with_scroll_region() {
    let mut h = Harness::new("xterm-256color", 80, 24);
    h.tty.region_set(5, 15);
    h.assert_cursor_agrees("region_set(5, 15)");
    assert_eq!(h.model.region(), h.tty.region().unwrap());

    // Moves that skirt and cross the region margins.
    for &(x, y) in &[
        (0u32, 5u32),
        (0, 15),
        (0, 16),
        (0, 3),
        (10, 10),
        (10, 4),
        (10, 20),
        (10, 15),
        (10, 16),
        (0, 0),
    ] {
        h.tty.cursor_to(x, y);
        h.assert_cursor_agrees(&format!("cursor_to({x}, {y}) within region"));
    }

    h.tty.region_set(0, 23);
    h.assert_cursor_agrees("region_set(0, 23)");
    assert_eq!(h.model.region(), h.tty.region().unwrap());
}

#[test]
fn cursor_shadow_matches_reference_through_cell_output() {
    let mut h = Harness::new("xterm-256color", 80, 24);
    let pane = Pane::new(1, 1, Screen::new(80, 24));
    h.tty.cursor_to(70, 10);
    h.assert_cursor_agrees("positioning");

    for ch in "abcdefghij".chars() {
        h.tty.cell_put(&GridCell::new(ch), &pane);
    }
    // Ten cells from column 70: the last one parks a pending wrap.
    h.replay();
    assert_eq!(h.tty.cursor(), Some((80, 10)));
    assert_eq!(h.model.cursor(), (80, 10));

    // One more cell wraps onto the next row.
    h.tty.cell_put(&GridCell::new('k'), &pane);
    h.replay();
    assert_eq!(h.tty.cursor(), Some((1, 11)));
    assert_eq!(h.model.cursor(), (1, 11));
}

#[test]
fn region_shadow_idempotence_is_byte_visible() {
    let mut h = Harness::new("xterm-256color", 80, 24);
    h.tty.region_set(2, 20);
    assert!(!h.tty.output().is_empty());
    h.replay();
    h.tty.region_set(2, 20);
    assert!(h.tty.output().is_empty(), "second region_set emitted bytes");
}

#[test]
fn cursor_idempotence_is_byte_visible() {
    let mut h = Harness::new("xterm-256color", 80, 24);
    h.tty.cursor_to(17, 9);
    h.replay();
    h.tty.cursor_to(17, 9);
    assert!(h.tty.output().is_empty(), "second cursor_to emitted bytes");
}

#[test]
fn attribute_shadow_matches_reference() {
    let mut h = Harness::new("xterm-256color", 80, 24);
    let pane = Pane::new(1, 1, Screen::new(80, 24));

    let mut bold_red = GridCell::default();
    bold_red.attr = CellFlags::BRIGHT;
    bold_red.fg = 1;

    let mut palette = GridCell::default();
    palette.fg = COLOUR_FLAG_256 | 196;
    palette.bg = COLOUR_FLAG_256 | 17;

    let mut fancy = GridCell::default();
    fancy.attr = CellFlags::UNDERLINE | CellFlags::ITALIC;
    fancy.fg = 4;
    fancy.bg = 7;

    let mut rgb = GridCell::default();
    rgb.fg = join_rgb(0xff, 0x88, 0x00);

    for (name, cell) in [
        ("bold red", bold_red),
        ("palette", palette),
        ("fancy", fancy),
        ("default", GridCell::default()),
        ("rgb", rgb),
        ("default again", GridCell::default()),
    ] {
        h.tty.attributes(&cell, &pane);
        h.replay();
        let shadow = h.tty.shadow_cell();
        assert_eq!(
            h.model.sgr(),
            (shadow.attr, shadow.fg, shadow.bg),
            "SGR state diverged after {name}"
        );
    }
}

#[test]
fn attribute_shadow_matches_reference_on_8_colours() {
    // The same cells pushed through an 8-colour terminal: everything the
    // model sees must still match the (downgraded) shadow.
    let mut h = Harness::new("xterm", 80, 24);
    let pane = Pane::new(1, 1, Screen::new(80, 24));

    let mut palette = GridCell::default();
    palette.fg = COLOUR_FLAG_256 | 196;

    let mut rgb = GridCell::default();
    rgb.fg = join_rgb(0, 0, 0xff);
    rgb.bg = COLOUR_FLAG_256 | 250;

    for (name, cell) in [
        ("palette", palette),
        ("rgb", rgb),
        ("default", GridCell::default()),
    ] {
        h.tty.attributes(&cell, &pane);
        h.replay();
        let shadow = h.tty.shadow_cell();
        assert_eq!(
            h.model.sgr(),
            (shadow.attr, shadow.fg, shadow.bg),
            "SGR state diverged after {name}"
        );
    }
}
