//! Grid cell types.
//!
//! A `GridCell` is one character position as handed to the output engine by
//! the grid layer: a codepoint plus an attribute bitset and two encoded
//! colours. Cells are 16 bytes and `Copy`; the engine passes them around by
//! value and keeps one as the shadow of the terminal's active attributes.

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

use crate::colour;

bitflags! {
    /// Per-cell attribute flags (SGR and internal).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellFlags: u16 {
        /// Bold / bright. Also set by colour downgrade when a bright colour
        /// is folded onto a base colour.
        const BRIGHT   = 1 << 0;
        const DIM      = 1 << 1;
        const ITALIC   = 1 << 2;
        const UNDERLINE = 1 << 3;
        const BLINK    = 1 << 4;
        const REVERSE  = 1 << 5;
        const HIDDEN   = 1 << 6;
        /// DEC line-drawing character set.
        const CHARSET  = 1 << 7;
        /// Spacer cell following a wide character; never emitted.
        const PADDING  = 1 << 8;
        /// Cell is inside the active selection; styled at draw time.
        const SELECTED = 1 << 9;
    }
}

impl Default for CellFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Attribute bits that correspond to SGR state on the terminal.
///
/// `PADDING` and `SELECTED` are bookkeeping for the grid and painter; they
/// never reach the attribute engine's shadow comparison.
pub const SGR_ATTRS: CellFlags = CellFlags::BRIGHT
    .union(CellFlags::DIM)
    .union(CellFlags::ITALIC)
    .union(CellFlags::UNDERLINE)
    .union(CellFlags::BLINK)
    .union(CellFlags::REVERSE)
    .union(CellFlags::HIDDEN)
    .union(CellFlags::CHARSET);

/// One character position in a pane's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    /// The codepoint stored in this cell.
    pub ch: char,
    /// SGR attribute flags.
    pub attr: CellFlags,
    /// Foreground colour (see [`crate::colour`] for the encoding).
    pub fg: u32,
    /// Background colour.
    pub bg: u32,
}

const _: () = assert!(size_of::<GridCell>() == 16);

/// A blank cell with default colours and no attributes.
pub const DEFAULT_CELL: GridCell = GridCell {
    ch: ' ',
    attr: CellFlags::empty(),
    fg: colour::COLOUR_DEFAULT,
    bg: colour::COLOUR_DEFAULT,
};

impl Default for GridCell {
    fn default() -> Self {
        DEFAULT_CELL
    }
}

impl GridCell {
    /// A cell holding `ch` with default style.
    pub fn new(ch: char) -> Self {
        Self { ch, ..DEFAULT_CELL }
    }

    /// Display width of this cell: 0 for padding cells, otherwise 1 or 2.
    pub fn width(&self) -> u32 {
        if self.attr.contains(CellFlags::PADDING) {
            return 0;
        }
        UnicodeWidthChar::width(self.ch).unwrap_or(1).max(1) as u32
    }

    /// UTF-8 byte length of the stored codepoint.
    pub fn size(&self) -> usize {
        self.ch.len_utf8()
    }

    /// Whether the cell holds a single printable ASCII byte.
    pub fn is_ascii_printable(&self) -> bool {
        self.ch.is_ascii() && (self.ch as u32) >= 0x20 && (self.ch as u32) != 0x7f
    }
}
