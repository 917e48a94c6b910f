//! Attribute and colour reconciliation.
//!
//! The shadow cell holds exactly what the terminal is decorating output
//! with. Reconciliation starts from the desired cell, folds in the pane's
//! default styles, projects colours down to the terminal's depth, and then
//! emits the difference. There is no portable way to clear a single
//! attribute, so any bit going away means SGR0 and a rebuild; colours are
//! emitted before attribute sets because the default-colour path can itself
//! reset everything.

use super::Tty;
use crate::caps::Cap;
use crate::cell::{CellFlags, GridCell, SGR_ATTRS};
use crate::colour::{self, COLOUR_DEFAULT, COLOUR_FLAG_256, COLOUR_FLAG_RGB};
use crate::screen::Pane;
use crate::style;

impl Tty {
    /// Bring the terminal's active attributes and colours in line with
    /// `desired`, emitting as little as possible.
    pub fn attributes(&mut self, desired: &GridCell, pane: &Pane) {
        let mut gc = *desired;
        gc.attr &= SGR_ATTRS;

        style::default_colours(&mut gc, pane);

        // Without a background capability, reverse video is the only way
        // to show a non-default background.
        if !self.term.has(Cap::Setab) {
            if gc.attr.contains(CellFlags::REVERSE) {
                if gc.fg != 7 && gc.fg != COLOUR_DEFAULT {
                    gc.attr.remove(CellFlags::REVERSE);
                }
            } else if gc.bg != 0 && gc.bg != COLOUR_DEFAULT {
                gc.attr.insert(CellFlags::REVERSE);
            }
        }

        let colours = self.term.colours();
        let rgb_ok = self.term.flag(Cap::Tc);
        colour::check_fg(&mut gc, colours, rgb_ok);
        colour::check_bg(&mut gc, colours, rgb_ok);

        if gc.attr == self.cell.attr && gc.fg == self.cell.fg && gc.bg == self.cell.bg {
            return;
        }

        // Any attribute bit going away means starting over from SGR0.
        if !(self.cell.attr & !gc.attr).is_empty() {
            self.reset();
        }

        self.colours(&gc);

        let added = gc.attr & !self.cell.attr;
        if added.contains(CellFlags::BRIGHT) {
            self.emit(Cap::Bold);
        }
        if added.contains(CellFlags::DIM) {
            self.emit(Cap::Dim);
        }
        if added.contains(CellFlags::ITALIC) {
            // Inner multiplexers advertise sitm but render it as standout;
            // prefer the honest fallback there.
            if self.term.has(Cap::Sitm) && !self.termname().starts_with("screen") {
                self.emit(Cap::Sitm);
            } else {
                self.emit(Cap::Smso);
            }
        }
        if added.contains(CellFlags::UNDERLINE) {
            self.emit(Cap::Smul);
        }
        if added.contains(CellFlags::BLINK) {
            self.emit(Cap::Blink);
        }
        if added.contains(CellFlags::REVERSE) && !self.emit(Cap::Rev) {
            self.emit(Cap::Smso);
        }
        if added.contains(CellFlags::HIDDEN) {
            self.emit(Cap::Invis);
        }
        if added.contains(CellFlags::CHARSET) && self.use_acs() {
            self.emit(Cap::Smacs);
        }
        self.cell.attr = gc.attr;
    }

    /// Emit foreground/background changes against the shadow.
    fn colours(&mut self, gc: &GridCell) {
        let fg_changed = gc.fg != self.cell.fg;
        let bg_changed = gc.bg != self.cell.bg;
        if !fg_changed && !bg_changed {
            return;
        }

        if gc.fg == COLOUR_DEFAULT || gc.bg == COLOUR_DEFAULT {
            let have_ax = self.term.flag(Cap::Ax);
            if !have_ax && self.term.has(Cap::Op) {
                // No individual default reset: op via SGR0 resets both.
                self.reset();
            } else {
                if fg_changed && gc.fg == COLOUR_DEFAULT {
                    if have_ax {
                        self.puts("\x1b[39m");
                    } else {
                        self.emit1(Cap::Setaf, 7);
                    }
                    self.cell.fg = COLOUR_DEFAULT;
                }
                if bg_changed && gc.bg == COLOUR_DEFAULT {
                    if have_ax {
                        self.puts("\x1b[49m");
                    } else {
                        self.emit1(Cap::Setab, 0);
                    }
                    self.cell.bg = COLOUR_DEFAULT;
                }
            }
        }

        if gc.fg != COLOUR_DEFAULT && gc.fg != self.cell.fg {
            self.colour_fg(gc.fg);
            self.cell.fg = gc.fg;
        }
        if gc.bg != COLOUR_DEFAULT && gc.bg != self.cell.bg {
            self.colour_bg(gc.bg);
            self.cell.bg = gc.bg;
        }
    }

    fn colour_fg(&mut self, c: u32) {
        if c & COLOUR_FLAG_RGB != 0 {
            let (r, g, b) = colour::split_rgb(c);
            self.puts(&format!("\x1b[38;2;{r};{g};{b}m"));
        } else if c & COLOUR_FLAG_256 != 0 {
            if self.term.colours() >= 256 && self.term.has(Cap::Setaf) {
                self.emit1(Cap::Setaf, c & 0xff);
            } else {
                self.puts(&format!("\x1b[38;5;{}m", c & 0xff));
            }
        } else if (90..=97).contains(&c) {
            self.puts(&format!("\x1b[{c}m"));
        } else {
            self.emit1(Cap::Setaf, c);
        }
    }

    fn colour_bg(&mut self, c: u32) {
        if c & COLOUR_FLAG_RGB != 0 {
            let (r, g, b) = colour::split_rgb(c);
            self.puts(&format!("\x1b[48;2;{r};{g};{b}m"));
        } else if c & COLOUR_FLAG_256 != 0 {
            if self.term.colours() >= 256 && self.term.has(Cap::Setab) {
                self.emit1(Cap::Setab, c & 0xff);
            } else {
                self.puts(&format!("\x1b[48;5;{}m", c & 0xff));
            }
        } else if (90..=97).contains(&c) {
            self.puts(&format!("\x1b[{}m", c + 10));
        } else {
            self.emit1(Cap::Setab, c);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::caps::{Cap, TermCaps, TermFeatures};
    use crate::cell::{CellFlags, GridCell};
    use crate::colour::{COLOUR_FLAG_256, join_rgb};
    use crate::screen::{Pane, Screen};
    use crate::tty::Tty;

    fn pane() -> Pane {
        Pane::new(1, 1, Screen::new(80, 24))
    }

    fn tty(term: &str) -> Tty {
        Tty::detached(TermCaps::for_term(term).unwrap(), 80, 24)
    }

    #[test]
    fn no_change_emits_nothing() {
        let mut tty = tty("xterm");
        tty.attributes(&GridCell::default(), &pane());
        assert!(tty.output().is_empty());
    }

    #[test]
    fn setting_bold_and_colour() {
        let mut tty = tty("xterm");
        let mut gc = GridCell::default();
        gc.attr = CellFlags::BRIGHT;
        gc.fg = 1;
        tty.attributes(&gc, &pane());
        assert_eq!(tty.take_output(), b"\x1b[31m\x1b[1m");
        // Same cell again: silent.
        tty.attributes(&gc, &pane());
        assert!(tty.output().is_empty());
    }

    #[test]
    fn attribute_drop_goes_through_sgr0() {
        let mut tty = tty("xterm");
        let mut gc = GridCell::default();
        gc.attr = CellFlags::BRIGHT | CellFlags::UNDERLINE;
        tty.attributes(&gc, &pane());
        tty.take_output();

        gc.attr = CellFlags::BRIGHT;
        tty.attributes(&gc, &pane());
        assert_eq!(tty.take_output(), b"\x1b(B\x1b[m\x1b[1m");
    }

    #[test]
    fn default_colours_use_ax() {
        let mut tty = tty("xterm");
        let mut gc = GridCell::default();
        gc.fg = 2;
        gc.bg = 4;
        tty.attributes(&gc, &pane());
        tty.take_output();

        tty.attributes(&GridCell::default(), &pane());
        assert_eq!(tty.take_output(), b"\x1b[39m\x1b[49m");
    }

    #[test]
    fn default_colours_without_ax_reset() {
        let mut caps = TermCaps::for_term("xterm").unwrap();
        caps.set_flag(Cap::Ax, false);
        let mut tty = Tty::detached(caps, 80, 24);
        let mut gc = GridCell::default();
        gc.fg = 2;
        tty.attributes(&gc, &pane());
        tty.take_output();

        // op exists, so going back to default resets everything.
        tty.attributes(&GridCell::default(), &pane());
        assert_eq!(tty.take_output(), b"\x1b(B\x1b[m");
    }

    #[test]
    fn palette_256_uses_conditional_setaf() {
        let mut tty = tty("xterm-256color");
        let mut gc = GridCell::default();
        gc.fg = COLOUR_FLAG_256 | 196;
        tty.attributes(&gc, &pane());
        assert_eq!(tty.take_output(), b"\x1b[38;5;196m");
    }

    #[test]
    fn palette_256_downgrades_to_bold_red_on_xterm() {
        // 8-colour terminal: 196 folds to bright red, i.e. red plus bold.
        let mut tty = tty("xterm");
        let mut gc = GridCell::default();
        gc.fg = COLOUR_FLAG_256 | 196;
        tty.attributes(&gc, &pane());
        assert_eq!(tty.take_output(), b"\x1b[31m\x1b[1m");
    }

    #[test]
    fn rgb_direct_when_supported() {
        let mut caps = TermCaps::for_term("xterm-256color").unwrap();
        caps.apply_features(TermFeatures::RGB);
        let mut tty = Tty::detached(caps, 80, 24);
        let mut gc = GridCell::default();
        gc.fg = join_rgb(1, 2, 3);
        gc.bg = join_rgb(9, 8, 7);
        tty.attributes(&gc, &pane());
        assert_eq!(tty.take_output(), b"\x1b[38;2;1;2;3m\x1b[48;2;9;8;7m");
    }

    #[test]
    fn aixterm_bright_backgrounds_add_ten() {
        let mut caps = TermCaps::for_term("xterm").unwrap();
        caps.set_number(Cap::Colors, 16);
        let mut tty = Tty::detached(caps, 80, 24);
        let mut gc = GridCell::default();
        gc.fg = 92;
        gc.bg = 95;
        tty.attributes(&gc, &pane());
        assert_eq!(tty.take_output(), b"\x1b[92m\x1b[105m");
    }

    #[test]
    fn reverse_stands_in_for_missing_setab() {
        let mut tty = tty("vt100");
        let mut gc = GridCell::default();
        gc.bg = 4;
        tty.attributes(&gc, &pane());
        // vt100 has no colours at all: only the synthesized reverse shows.
        assert_eq!(tty.take_output(), b"\x1b[7m");
        assert!(tty.shadow_cell().attr.contains(CellFlags::REVERSE));

        // Default background drops the reverse again.
        tty.attributes(&GridCell::default(), &pane());
        assert_eq!(tty.take_output(), b"\x1b[m\x0f");
    }

    #[test]
    fn reverse_dropped_when_fg_would_vanish() {
        let mut tty = tty("vt100");
        let mut gc = GridCell::default();
        gc.attr = CellFlags::REVERSE;
        gc.fg = 2;
        tty.attributes(&gc, &pane());
        assert!(!tty.shadow_cell().attr.contains(CellFlags::REVERSE));
    }

    #[test]
    fn charset_enters_acs() {
        let mut tty = tty("xterm");
        let mut gc = GridCell::default();
        gc.attr = CellFlags::CHARSET;
        tty.attributes(&gc, &pane());
        assert_eq!(tty.take_output(), b"\x1b(0");

        // Leaving the charset resets through RMACS + SGR0.
        tty.attributes(&GridCell::default(), &pane());
        assert_eq!(tty.take_output(), b"\x1b(B\x1b(B\x1b[m");
    }

    #[test]
    fn charset_ignored_in_utf8_mode() {
        let mut tty = tty("xterm");
        tty.set_utf8(true);
        let mut gc = GridCell::default();
        gc.attr = CellFlags::CHARSET;
        tty.attributes(&gc, &pane());
        assert!(tty.output().is_empty());
        assert!(tty.shadow_cell().attr.contains(CellFlags::CHARSET));
    }

    #[test]
    fn bookkeeping_bits_do_not_reach_the_shadow() {
        let mut tty = tty("xterm");
        let mut gc = GridCell::default();
        gc.attr = CellFlags::SELECTED | CellFlags::PADDING;
        tty.attributes(&gc, &pane());
        assert!(tty.output().is_empty());
        assert!(tty.shadow_cell().attr.is_empty());
    }
}
