//! Cursor movement and scroll region programming.
//!
//! Every move is costed against the shadow: same position emits nothing, a
//! neighbouring cell gets a one-byte step, and absolute addressing is the
//! last resort. CUU/CUD are clamped by the active scroll region on real
//! terminals, so any vertical move that would cross a margin goes through
//! VPA instead.

use super::Tty;
use crate::caps::Cap;

impl Tty {
    /// Move the terminal cursor to `(cx, cy)` with the cheapest sequence
    /// available, updating the shadow.
    pub fn cursor_to(&mut self, cx: u32, cy: u32) {
        let cx = cx.min(self.sx.saturating_sub(1));

        let Some((ox, oy)) = self.cursor else {
            self.cursor_absolute(cx, cy);
            return;
        };
        if ox == cx && oy == cy {
            return;
        }
        // A pending wrap leaves the real position ambiguous.
        if ox > self.sx - 1 {
            self.cursor_absolute(cx, cy);
            return;
        }

        let (rupper, rlower) = self.region.unwrap_or((0, self.sy - 1));

        if cx == 0 && cy == 0 && self.term.has(Cap::Home) {
            self.emit(Cap::Home);
            self.cursor = Some((0, 0));
            return;
        }

        // Start of the next row: CR/LF, unless the line feed would scroll.
        if cx == 0 && cy == oy + 1 && oy != rlower {
            self.puts("\r\n");
            self.cursor = Some((cx, cy));
            return;
        }

        if cy == oy {
            if self.cursor_same_row(cx, ox) {
                self.cursor = Some((cx, cy));
                return;
            }
        } else if cx == ox && self.cursor_same_column(cy, oy, rupper, rlower) {
            self.cursor = Some((cx, cy));
            return;
        }

        self.cursor_absolute(cx, cy);
    }

    /// Column-only movement. Returns false when no suitable capability
    /// exists and the caller must go absolute.
    fn cursor_same_row(&mut self, cx: u32, ox: u32) -> bool {
        if cx == 0 {
            self.puts("\r");
            return true;
        }
        if cx + 1 == ox && self.term.has(Cap::Cub1) {
            self.emit(Cap::Cub1);
            return true;
        }
        if cx == ox + 1 && self.term.has(Cap::Cuf1) {
            self.emit(Cap::Cuf1);
            return true;
        }

        // Positive means moving left.
        let left = i64::from(ox) - i64::from(cx);
        if left.unsigned_abs() > u64::from(cx) && self.term.has(Cap::Hpa) {
            self.emit1(Cap::Hpa, cx);
            return true;
        }
        if left > 0 && self.term.has(Cap::Cub) {
            if left == 2 && self.term.has(Cap::Cub1) {
                self.emit(Cap::Cub1);
                self.emit(Cap::Cub1);
            } else {
                self.emit1(Cap::Cub, left as u32);
            }
            return true;
        }
        if left < 0 && self.term.has(Cap::Cuf) {
            self.emit1(Cap::Cuf, (-left) as u32);
            return true;
        }
        false
    }

    /// Row-only movement, honouring the scroll region clamp.
    fn cursor_same_column(&mut self, cy: u32, oy: u32, rupper: u32, rlower: u32) -> bool {
        if cy + 1 == oy && oy != rupper && self.term.has(Cap::Cuu1) {
            self.emit(Cap::Cuu1);
            return true;
        }
        if cy == oy + 1 && oy != rlower && self.term.has(Cap::Cud1) {
            self.emit(Cap::Cud1);
            return true;
        }

        // Positive means moving up.
        let up = i64::from(oy) - i64::from(cy);
        let crosses =
            (cy < rupper && oy >= rupper) || (cy > rlower && oy <= rlower);
        if (up.unsigned_abs() > u64::from(cy) || crosses) && self.term.has(Cap::Vpa) {
            self.emit1(Cap::Vpa, cy);
            return true;
        }
        if up > 0 && !crosses && self.term.has(Cap::Cuu) {
            self.emit1(Cap::Cuu, up as u32);
            return true;
        }
        if up < 0 && !crosses && self.term.has(Cap::Cud) {
            self.emit1(Cap::Cud, (-up) as u32);
            return true;
        }
        false
    }

    fn cursor_absolute(&mut self, cx: u32, cy: u32) {
        self.emit2(Cap::Cup, cy, cx);
        self.cursor = Some((cx, cy));
    }

    /// Program the scroll region, if it differs from the shadow and the
    /// terminal can. CSR reparks the cursor, so the shadow is resynced to
    /// the origin afterwards.
    pub fn region_set(&mut self, rupper: u32, rlower: u32) {
        if self.region == Some((rupper, rlower)) {
            return;
        }
        if !self.term.has(Cap::Csr) {
            return;
        }
        // A pending wrap leaves the cursor ambiguous; resolve it first.
        if let Some((ox, oy)) = self.cursor {
            if ox >= self.sx {
                self.cursor_to(0, oy);
            }
        }
        self.emit2(Cap::Csr, rupper, rlower);
        self.region = Some((rupper, rlower));
        self.cursor = None;
        self.cursor_to(0, 0);
    }
}
