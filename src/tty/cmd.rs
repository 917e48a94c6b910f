//! Screen command dispatch.
//!
//! One handler per logical screen operation. Every handler follows the
//! same pattern: check that the terminal primitive is applicable (full
//! pane width, honest background-colour erase, capability present), set
//! attributes, place the cursor, and emit — or fall back to redrawing the
//! affected lines. A handler never fails; a missing capability just means
//! the more expensive path.

use std::cell::Cell;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::{Tty, TtyFlags};
use crate::caps::{Cap, TermFeatures};
use crate::cell::{DEFAULT_CELL, GridCell};
use crate::colour::COLOUR_DEFAULT;
use crate::screen::Pane;

/// The screen operations the engine realizes on a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtyCmd {
    AlignmentTest,
    Cell,
    ClearCharacter,
    ClearEndOfLine,
    ClearEndOfScreen,
    ClearLine,
    ClearScreen,
    ClearStartOfLine,
    ClearStartOfScreen,
    DeleteCharacter,
    DeleteLine,
    InsertCharacter,
    InsertLine,
    LineFeed,
    RawString,
    ReverseIndex,
    SetSelection,
    Utf8Character,
}

/// Everything a command handler needs to know about one operation.
pub struct TtyCtx<'a> {
    pub pane: &'a Pane,
    /// Pane offset inside this client's terminal; set per client.
    pub xoff: u32,
    pub yoff: u32,
    /// Cursor position the operation happened at, pane-relative.
    pub ocx: u32,
    pub ocy: u32,
    /// Scroll region the operation happened under, pane-relative.
    pub orupper: u32,
    pub orlower: u32,
    /// Count for repeatable operations; for line feeds, nonzero marks a
    /// natural wrap.
    pub num: u32,
    /// Raw payload for string-carrying operations.
    pub ptr: Option<&'a [u8]>,
    pub cell: Option<&'a GridCell>,
    /// The previous tail cell, needed to re-enter the last column.
    pub last_cell: Option<&'a GridCell>,
    redraw: Cell<bool>,
}

impl<'a> TtyCtx<'a> {
    pub fn new(pane: &'a Pane) -> Self {
        Self {
            pane,
            xoff: pane.xoff,
            yoff: pane.yoff,
            ocx: 0,
            ocy: 0,
            orupper: 0,
            orlower: pane.sy().saturating_sub(1),
            num: 0,
            ptr: None,
            cell: None,
            last_cell: None,
            redraw: Cell::new(false),
        }
    }

    /// Whether a handler decided the pane needs a full redraw by the
    /// layer above instead of incremental updates.
    pub fn needs_full_redraw(&self) -> bool {
        self.redraw.get()
    }

    pub(crate) fn defer_full_redraw(&self) {
        self.redraw.set(true);
    }

    fn bg(&self) -> u32 {
        self.cell.map_or(COLOUR_DEFAULT, |gc| gc.bg)
    }

    fn defaults(&self) -> GridCell {
        let mut gc = DEFAULT_CELL;
        gc.bg = self.bg();
        gc
    }
}

impl Tty {
    /// Realize one screen operation on this terminal.
    pub fn write(&mut self, cmd: TtyCmd, ctx: &TtyCtx<'_>) {
        if !self.flags.contains(TtyFlags::STARTED) || self.flags.contains(TtyFlags::FREEZE) {
            return;
        }
        match cmd {
            TtyCmd::AlignmentTest => self.cmd_alignment_test(ctx),
            TtyCmd::Cell => self.cmd_cell(ctx),
            TtyCmd::ClearCharacter => self.cmd_clear_character(ctx),
            TtyCmd::ClearEndOfLine => self.cmd_clear_end_of_line(ctx),
            TtyCmd::ClearEndOfScreen => self.cmd_clear_end_of_screen(ctx),
            TtyCmd::ClearLine => self.cmd_clear_line(ctx),
            TtyCmd::ClearScreen => self.cmd_clear_screen(ctx),
            TtyCmd::ClearStartOfLine => self.cmd_clear_start_of_line(ctx),
            TtyCmd::ClearStartOfScreen => self.cmd_clear_start_of_screen(ctx),
            TtyCmd::DeleteCharacter => self.cmd_delete_character(ctx),
            TtyCmd::DeleteLine => self.cmd_delete_line(ctx),
            TtyCmd::InsertCharacter => self.cmd_insert_character(ctx),
            TtyCmd::InsertLine => self.cmd_insert_line(ctx),
            TtyCmd::LineFeed => self.cmd_linefeed(ctx),
            TtyCmd::RawString => self.cmd_raw_string(ctx),
            TtyCmd::ReverseIndex => self.cmd_reverse_index(ctx),
            TtyCmd::SetSelection => self.cmd_set_selection(ctx),
            TtyCmd::Utf8Character => self.cmd_utf8_character(ctx),
        }
    }

    /// Whether the pane spans the terminal's full width, making
    /// line-oriented primitives safe.
    fn pane_full_width(&self, ctx: &TtyCtx<'_>) -> bool {
        ctx.xoff == 0 && ctx.pane.sx() >= self.sx
    }

    fn cursor_pane(&mut self, ctx: &TtyCtx<'_>, cx: u32, cy: u32) {
        self.cursor_to(ctx.xoff + cx, ctx.yoff + cy);
    }

    fn region_pane(&mut self, ctx: &TtyCtx<'_>, rupper: u32, rlower: u32) {
        self.region_set(ctx.yoff + rupper, ctx.yoff + rlower);
    }

    /// Redraw the lines an operation touched, or hand the whole pane back
    /// to the caller when that would cover most of it anyway.
    pub(crate) fn redraw_region(&mut self, ctx: &TtyCtx<'_>) {
        let rows = ctx.pane.sy();
        if ctx.orlower.saturating_sub(ctx.orupper) >= rows / 2 {
            ctx.defer_full_redraw();
            return;
        }
        if ctx.ocy < ctx.orupper || ctx.ocy > ctx.orlower {
            for py in ctx.ocy..rows {
                self.draw_pane(ctx.pane, py, ctx.xoff, ctx.yoff);
            }
        } else {
            for py in ctx.orupper..=ctx.orlower {
                self.draw_pane(ctx.pane, py, ctx.xoff, ctx.yoff);
            }
        }
    }

    fn cmd_insert_character(&mut self, ctx: &TtyCtx<'_>) {
        if !self.pane_full_width(ctx)
            || self.fake_bce(ctx.pane, ctx.bg())
            || (!self.term.has(Cap::Ich) && !self.term.has(Cap::Ich1))
        {
            self.draw_pane(ctx.pane, ctx.ocy, ctx.xoff, ctx.yoff);
            return;
        }
        self.attributes(&ctx.defaults(), ctx.pane);
        self.cursor_pane(ctx, ctx.ocx, ctx.ocy);
        self.emit_repeat(Cap::Ich, Cap::Ich1, ctx.num);
    }

    fn cmd_delete_character(&mut self, ctx: &TtyCtx<'_>) {
        if !self.pane_full_width(ctx)
            || self.fake_bce(ctx.pane, ctx.bg())
            || (!self.term.has(Cap::Dch) && !self.term.has(Cap::Dch1))
        {
            self.draw_pane(ctx.pane, ctx.ocy, ctx.xoff, ctx.yoff);
            return;
        }
        self.attributes(&ctx.defaults(), ctx.pane);
        self.cursor_pane(ctx, ctx.ocx, ctx.ocy);
        self.emit_repeat(Cap::Dch, Cap::Dch1, ctx.num);
    }

    fn cmd_clear_character(&mut self, ctx: &TtyCtx<'_>) {
        self.attributes(&ctx.defaults(), ctx.pane);
        self.cursor_pane(ctx, ctx.ocx, ctx.ocy);
        if self.term.has(Cap::Ech) && !self.fake_bce(ctx.pane, ctx.bg()) {
            self.emit1(Cap::Ech, ctx.num);
        } else {
            self.repeat_space(ctx.num);
        }
    }

    fn cmd_insert_line(&mut self, ctx: &TtyCtx<'_>) {
        if !self.pane_full_width(ctx)
            || self.fake_bce(ctx.pane, ctx.bg())
            || !self.term.has(Cap::Csr)
            || (!self.term.has(Cap::Il) && !self.term.has(Cap::Il1))
        {
            self.redraw_region(ctx);
            return;
        }
        self.attributes(&ctx.defaults(), ctx.pane);
        self.region_pane(ctx, ctx.orupper, ctx.orlower);
        self.cursor_pane(ctx, 0, ctx.ocy);
        self.emit_repeat(Cap::Il, Cap::Il1, ctx.num);
    }

    fn cmd_delete_line(&mut self, ctx: &TtyCtx<'_>) {
        if !self.pane_full_width(ctx)
            || self.fake_bce(ctx.pane, ctx.bg())
            || !self.term.has(Cap::Csr)
            || (!self.term.has(Cap::Dl) && !self.term.has(Cap::Dl1))
        {
            self.redraw_region(ctx);
            return;
        }
        self.attributes(&ctx.defaults(), ctx.pane);
        self.region_pane(ctx, ctx.orupper, ctx.orlower);
        self.cursor_pane(ctx, 0, ctx.ocy);
        self.emit_repeat(Cap::Dl, Cap::Dl1, ctx.num);
    }

    fn cmd_clear_line(&mut self, ctx: &TtyCtx<'_>) {
        self.attributes(&ctx.defaults(), ctx.pane);
        self.cursor_pane(ctx, 0, ctx.ocy);
        if self.pane_full_width(ctx)
            && self.term.has(Cap::El)
            && !self.fake_bce(ctx.pane, ctx.bg())
        {
            self.emit(Cap::El);
        } else {
            self.repeat_space(ctx.pane.sx());
        }
    }

    fn cmd_clear_end_of_line(&mut self, ctx: &TtyCtx<'_>) {
        self.attributes(&ctx.defaults(), ctx.pane);
        self.cursor_pane(ctx, ctx.ocx, ctx.ocy);
        if self.pane_full_width(ctx)
            && self.term.has(Cap::El)
            && !self.fake_bce(ctx.pane, ctx.bg())
        {
            self.emit(Cap::El);
        } else {
            self.repeat_space(ctx.pane.sx().saturating_sub(ctx.ocx));
        }
    }

    fn cmd_clear_start_of_line(&mut self, ctx: &TtyCtx<'_>) {
        self.attributes(&ctx.defaults(), ctx.pane);
        if ctx.xoff == 0 && self.term.has(Cap::El1) && !self.fake_bce(ctx.pane, ctx.bg()) {
            self.cursor_pane(ctx, ctx.ocx, ctx.ocy);
            self.emit(Cap::El1);
        } else {
            self.cursor_pane(ctx, 0, ctx.ocy);
            self.repeat_space(ctx.ocx + 1);
        }
    }

    fn cmd_reverse_index(&mut self, ctx: &TtyCtx<'_>) {
        if ctx.ocy != ctx.orupper {
            return;
        }
        if !self.pane_full_width(ctx)
            || self.fake_bce(ctx.pane, ctx.bg())
            || !self.term.has(Cap::Csr)
            || !self.term.has(Cap::Ri)
        {
            self.redraw_region(ctx);
            return;
        }
        self.attributes(&ctx.defaults(), ctx.pane);
        self.region_pane(ctx, ctx.orupper, ctx.orlower);
        self.cursor_pane(ctx, ctx.ocx, ctx.orupper);
        self.emit(Cap::Ri);
    }

    fn cmd_linefeed(&mut self, ctx: &TtyCtx<'_>) {
        if ctx.ocy != ctx.orlower {
            return;
        }
        if !self.pane_full_width(ctx)
            || self.fake_bce(ctx.pane, ctx.bg())
            || !self.term.has(Cap::Csr)
        {
            self.redraw_region(ctx);
            return;
        }
        // A natural wrap scrolls by itself; only early-wrap terminals need
        // the explicit line feed repeated.
        if ctx.num != 0 && !self.term.features().contains(TermFeatures::EARLY_WRAP) {
            return;
        }
        self.attributes(&ctx.defaults(), ctx.pane);
        self.region_pane(ctx, ctx.orupper, ctx.orlower);
        self.cursor_pane(ctx, ctx.ocx, ctx.ocy);
        self.putc(b'\n');
    }

    fn cmd_clear_end_of_screen(&mut self, ctx: &TtyCtx<'_>) {
        let sx = ctx.pane.sx();
        let sy = ctx.pane.sy();
        self.attributes(&ctx.defaults(), ctx.pane);
        self.region_pane(ctx, 0, sy.saturating_sub(1));
        if self.pane_full_width(ctx)
            && self.term.has(Cap::El)
            && !self.fake_bce(ctx.pane, ctx.bg())
        {
            self.cursor_pane(ctx, ctx.ocx, ctx.ocy);
            self.emit(Cap::El);
            for py in ctx.ocy + 1..sy {
                self.cursor_pane(ctx, 0, py);
                self.emit(Cap::El);
            }
        } else {
            self.cursor_pane(ctx, ctx.ocx, ctx.ocy);
            self.repeat_space(sx.saturating_sub(ctx.ocx));
            for py in ctx.ocy + 1..sy {
                self.cursor_pane(ctx, 0, py);
                self.repeat_space(sx);
            }
        }
    }

    fn cmd_clear_start_of_screen(&mut self, ctx: &TtyCtx<'_>) {
        let sx = ctx.pane.sx();
        self.attributes(&ctx.defaults(), ctx.pane);
        self.region_pane(ctx, 0, ctx.pane.sy().saturating_sub(1));
        if self.pane_full_width(ctx)
            && self.term.has(Cap::El)
            && !self.fake_bce(ctx.pane, ctx.bg())
        {
            for py in 0..ctx.ocy {
                self.cursor_pane(ctx, 0, py);
                self.emit(Cap::El);
            }
        } else {
            for py in 0..ctx.ocy {
                self.cursor_pane(ctx, 0, py);
                self.repeat_space(sx);
            }
        }
        self.cursor_pane(ctx, 0, ctx.ocy);
        self.repeat_space(ctx.ocx + 1);
    }

    fn cmd_clear_screen(&mut self, ctx: &TtyCtx<'_>) {
        let sx = ctx.pane.sx();
        let sy = ctx.pane.sy();
        self.attributes(&ctx.defaults(), ctx.pane);
        self.region_pane(ctx, 0, sy.saturating_sub(1));
        if self.pane_full_width(ctx)
            && self.term.has(Cap::El)
            && !self.fake_bce(ctx.pane, ctx.bg())
        {
            for py in 0..sy {
                self.cursor_pane(ctx, 0, py);
                self.emit(Cap::El);
            }
        } else {
            for py in 0..sy {
                self.cursor_pane(ctx, 0, py);
                self.repeat_space(sx);
            }
        }
    }

    fn cmd_alignment_test(&mut self, ctx: &TtyCtx<'_>) {
        let sx = ctx.pane.sx();
        let sy = ctx.pane.sy();
        self.attributes(&DEFAULT_CELL, ctx.pane);
        self.region_pane(ctx, 0, sy.saturating_sub(1));
        for py in 0..sy {
            self.cursor_pane(ctx, 0, py);
            for _ in 0..sx {
                self.putc(b'E');
            }
        }
    }

    fn cmd_cell(&mut self, ctx: &TtyCtx<'_>) {
        let Some(cell) = ctx.cell else { return };
        let psx = ctx.pane.sx();

        // Off the right edge at the region bottom: writing will wrap and
        // must scroll the pane's region, not the whole terminal.
        if ctx.xoff + ctx.ocx > self.sx - 1
            && ctx.ocy == ctx.orlower
            && self.pane_full_width(ctx)
        {
            self.region_pane(ctx, ctx.orupper, ctx.orlower);
        }

        let width = cell.width();
        if ctx.ocx > psx.saturating_sub(width) {
            // The cell belongs in the final columns of the row.
            if ctx.xoff != 0 || psx != self.sx {
                // The pane does not span the terminal, so the line feed
                // has already happened; just move below.
                self.cursor_pane(ctx, 0, ctx.ocy + 1);
            } else if self.cursor.is_some_and(|(cx, _)| cx < self.sx) {
                // Rewind and replay the previous tail cell so this write
                // lands in the last position and wraps naturally.
                if let Some(last) = ctx.last_cell {
                    let cx = psx - last.width();
                    self.cursor_pane(ctx, cx, ctx.ocy);
                    let last = *last;
                    self.cell_put(&last, ctx.pane);
                }
            }
        } else {
            self.cursor_pane(ctx, ctx.ocx, ctx.ocy);
        }
        let cell = *cell;
        self.cell_put(&cell, ctx.pane);
    }

    fn cmd_utf8_character(&mut self, ctx: &TtyCtx<'_>) {
        // Multi-byte output straddling cells leaves no safe incremental
        // path; repaint the line.
        self.draw_pane(ctx.pane, ctx.ocy, ctx.xoff, ctx.yoff);
    }

    fn cmd_raw_string(&mut self, ctx: &TtyCtx<'_>) {
        if let Some(bytes) = ctx.ptr {
            self.put_bytes(bytes);
        }
        // The terminal is wherever those bytes left it.
        self.invalidate();
    }

    fn cmd_set_selection(&mut self, ctx: &TtyCtx<'_>) {
        let Some(payload) = ctx.ptr else { return };
        if !self.term.has(Cap::Ms) {
            return;
        }
        let encoded = BASE64.encode(payload);
        self.emit_str2(Cap::Ms, "", &encoded);
    }
}
