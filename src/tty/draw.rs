//! Cell emission and line painting.
//!
//! The lowest layer of content output: single styled cells with column
//! accounting in the shadow, and whole pane lines with the trailing blank
//! columns erased or space-painted as background-colour-erase allows.
//! Natural cursor wrap is part of the contract — when the previous line
//! wrapped, the cursor is exactly where the next line starts and a
//! positioning sequence would break the terminal's own wrap bookkeeping.

use super::{Tty, TtyFlags};
use crate::acs;
use crate::caps::{Cap, TermFeatures};
use crate::cell::{CellFlags, DEFAULT_CELL, GridCell};
use crate::colour::COLOUR_DEFAULT;
use crate::screen::{Pane, Screen};

impl Tty {
    /// Emit one byte with ACS translation and column accounting.
    pub(crate) fn putc(&mut self, ch: u8) {
        let mut translated = false;
        if self.cell.attr.contains(CellFlags::CHARSET) {
            if self.flags.contains(TtyFlags::UTF8) {
                if let Some(glyph) = acs::unicode(ch) {
                    self.sink.append(glyph.as_bytes());
                    translated = true;
                }
            } else if let Some(mapped) = self.acs_byte(ch) {
                self.sink.append(&[mapped]);
                translated = true;
            }
        }
        if !translated {
            self.sink.append(&[ch]);
        }
        if (0x20..0x7f).contains(&ch) {
            self.advance(1);
        }
    }

    /// Emit raw bytes occupying `width` columns.
    pub(crate) fn putn(&mut self, bytes: &[u8], width: u32) {
        self.sink.append(bytes);
        self.advance(width);
    }

    pub(crate) fn repeat_space(&mut self, n: u32) {
        for _ in 0..n {
            self.putc(b' ');
        }
    }

    /// Account for printed columns, modelling the terminal's own wrap: a
    /// write with the cursor parked past the edge lands at column one of
    /// the next row, unless the wrap scrolled at the region bottom.
    fn advance(&mut self, width: u32) {
        let Some((cx, cy)) = self.cursor else { return };
        let rlower = self.region.map_or(self.sy - 1, |r| r.1);
        if cx >= self.sx {
            let ncy = if cy == rlower { cy } else { cy + 1 };
            self.cursor = Some((width.min(self.sx), ncy));
        } else {
            self.cursor = Some(((cx + width).min(self.sx), cy));
        }
    }

    /// Write one styled cell at the current position.
    pub fn cell_put(&mut self, gc: &GridCell, pane: &Pane) {
        // The bottom-right cell makes early-wrap terminals scroll.
        if self.term.features().contains(TermFeatures::EARLY_WRAP) {
            if let Some((cx, cy)) = self.cursor {
                if cx == self.sx - 1 && cy == self.sy - 1 {
                    return;
                }
            }
        }
        // Wide-character spacers were painted by their base cell.
        if gc.attr.contains(CellFlags::PADDING) {
            return;
        }

        self.attributes(gc, pane);

        if gc.size() == 1 && (gc.ch as u32) < 0x7f {
            self.putc(gc.ch as u8);
            return;
        }
        // Without UTF-8 there is nothing sensible to send; keep the
        // columns accounted for.
        if !self.flags.contains(TtyFlags::UTF8) {
            for _ in 0..gc.width() {
                self.putc(b'_');
            }
            return;
        }
        let width = gc.width();
        let mut buf = [0u8; 4];
        let s = gc.ch.encode_utf8(&mut buf);
        self.putn(s.as_bytes(), width);
    }

    /// Draw one line of a screen at terminal offset `(ox, oy)`.
    ///
    /// The cursor is hidden for the duration. Positioning is skipped when
    /// the previous line wrapped naturally and the cursor is already parked
    /// past the edge — moving it would lose the terminal's wrap state.
    pub fn draw_line(&mut self, pane: &Pane, screen: &Screen, py: u32, ox: u32, oy: u32) {
        let nx = screen.cols();
        let sx = nx.min(screen.line_used(py)).min(self.sx);

        let saved_nocursor = self.flags.contains(TtyFlags::NOCURSOR);
        let mode = self.mode;
        self.flags.insert(TtyFlags::NOCURSOR);
        self.update_mode(mode, None);

        let wrap_continues = py != 0
            && ox == 0
            && screen.line_wrapped(py - 1)
            && self.cursor.is_some_and(|(cx, _)| cx >= self.sx)
            && nx >= self.sx;
        if !wrap_continues {
            self.cursor_to(ox, oy + py);
        }

        for i in 0..sx {
            let mut gc = screen.cell(i, py);
            if gc.attr.contains(CellFlags::SELECTED) {
                gc = screen.selection_cell(&gc);
            }
            self.cell_put(&gc, pane);
        }

        if sx < nx {
            self.attributes(&DEFAULT_CELL, pane);
            self.cursor_to(ox + sx, oy + py);
            // Erase the tail only when it cannot splash a neighbour and
            // the erase paints honestly.
            if ox + nx >= self.sx
                && self.term.has(Cap::El)
                && !self.fake_bce(pane, COLOUR_DEFAULT)
            {
                self.emit(Cap::El);
            } else {
                self.repeat_space(nx - sx);
            }
        }

        self.flags.set(TtyFlags::NOCURSOR, saved_nocursor);
        self.update_mode(mode, None);
    }

    /// Redraw one row of a pane.
    pub fn draw_pane(&mut self, pane: &Pane, py: u32, xoff: u32, yoff: u32) {
        self.draw_line(pane, &pane.screen, py, xoff, yoff);
    }
}
