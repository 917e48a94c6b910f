//! Colour encoding and depth downgrade.
//!
//! Cells carry colours as a tagged `u32`: untagged values are the classic
//! palette (0–7), 8 for "default", or aixterm bright (90–97); bit 24 tags a
//! 256-colour palette index in the low byte; bit 25 tags 24-bit RGB in the
//! low three bytes. Before emission every colour is projected down to what
//! the terminal actually supports, so the attribute engine only ever sees
//! values it can express.

use crate::cell::{CellFlags, GridCell};

/// The "default colour" sentinel in the classic space.
pub const COLOUR_DEFAULT: u32 = 8;

/// Tag bit: low byte is a 256-colour palette index.
pub const COLOUR_FLAG_256: u32 = 0x0100_0000;

/// Tag bit: low three bytes are 8-bit R, G, B channels.
pub const COLOUR_FLAG_RGB: u32 = 0x0200_0000;

/// Pack RGB channels into a tagged colour value.
pub fn join_rgb(r: u8, g: u8, b: u8) -> u32 {
    COLOUR_FLAG_RGB | u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b)
}

/// Unpack the channels of an RGB-tagged colour.
pub fn split_rgb(c: u32) -> (u8, u8, u8) {
    ((c >> 16) as u8, (c >> 8) as u8, c as u8)
}

// Channel values of the 6x6x6 cube levels used by 256-colour terminals.
const Q2C: [u8; 6] = [0x00, 0x5f, 0x87, 0xaf, 0xd7, 0xff];

// The 16 classic colours as rendered by stock xterm. Used as the target
// space when folding the 256-colour palette down to 16.
const BASE16: [(u8, u8, u8); 16] = [
    (0x00, 0x00, 0x00),
    (0x80, 0x00, 0x00),
    (0x00, 0x80, 0x00),
    (0x80, 0x80, 0x00),
    (0x00, 0x00, 0x80),
    (0x80, 0x00, 0x80),
    (0x00, 0x80, 0x80),
    (0xc0, 0xc0, 0xc0),
    (0x80, 0x80, 0x80),
    (0xff, 0x00, 0x00),
    (0x00, 0xff, 0x00),
    (0xff, 0xff, 0x00),
    (0x00, 0x00, 0xff),
    (0xff, 0x00, 0xff),
    (0x00, 0xff, 0xff),
    (0xff, 0xff, 0xff),
];

fn dist(a: (u8, u8, u8), b: (u8, u8, u8)) -> u32 {
    let dr = i32::from(a.0) - i32::from(b.0);
    let dg = i32::from(a.1) - i32::from(b.1);
    let db = i32::from(a.2) - i32::from(b.2);
    (dr * dr + dg * dg + db * db) as u32
}

// Nearest cube level for one channel.
fn to_6cube(v: u8) -> u8 {
    if v < 48 {
        0
    } else if v < 114 {
        1
    } else {
        (v - 35) / 40
    }
}

/// Map an arbitrary RGB colour onto the 256-colour palette.
///
/// Candidate one is the nearest point in the 6x6x6 cube, candidate two the
/// nearest step of the greyscale ramp; whichever is closer wins. Returns a
/// 256-tagged value.
pub fn find_rgb(r: u8, g: u8, b: u8) -> u32 {
    let qr = to_6cube(r);
    let qg = to_6cube(g);
    let qb = to_6cube(b);
    let (cr, cg, cb) = (Q2C[qr as usize], Q2C[qg as usize], Q2C[qb as usize]);

    if cr == r && cg == g && cb == b {
        return COLOUR_FLAG_256
            | (16 + 36 * u32::from(qr) + 6 * u32::from(qg) + u32::from(qb));
    }

    // Greyscale ramp runs 232..=255 with values 8, 18, ... 238.
    let grey_avg = (u32::from(r) + u32::from(g) + u32::from(b)) / 3;
    let grey_idx = if grey_avg > 238 { 23 } else { (grey_avg.saturating_sub(3)) / 10 };
    let grey = (8 + 10 * grey_idx) as u8;

    let idx = if dist((r, g, b), (grey, grey, grey)) < dist((r, g, b), (cr, cg, cb)) {
        232 + grey_idx
    } else {
        16 + 36 * u32::from(qr) + 6 * u32::from(qg) + u32::from(qb)
    };
    COLOUR_FLAG_256 | idx
}

/// RGB channels of a 256-colour palette index (xterm rendering).
pub fn c256_rgb(idx: u8) -> (u8, u8, u8) {
    match idx {
        0..=15 => BASE16[idx as usize],
        16..=231 => {
            let c = idx - 16;
            (
                Q2C[(c / 36) as usize],
                Q2C[(c / 6 % 6) as usize],
                Q2C[(c % 6) as usize],
            )
        }
        232..=255 => {
            let v = 8 + 10 * (idx - 232);
            (v, v, v)
        }
    }
}

/// Fold a 256-colour palette index down to the 16-colour space.
pub fn c256_to_16(idx: u8) -> u8 {
    if idx < 16 {
        return idx;
    }
    let rgb = c256_rgb(idx);
    let mut best = 0;
    let mut best_dist = u32::MAX;
    for (i, &candidate) in BASE16.iter().enumerate() {
        let d = dist(rgb, candidate);
        if d < best_dist {
            best = i as u8;
            best_dist = d;
        }
    }
    best
}

/// Project a cell's foreground onto a terminal with `colours` palette
/// entries (`rgb_ok` when it takes 24-bit SGR directly).
///
/// Bright halves that the terminal cannot address directly become either an
/// aixterm colour (16 or more palette entries) or the base colour plus the
/// BRIGHT attribute. Idempotent: projecting an already-projected value is a
/// no-op.
pub fn check_fg(gc: &mut GridCell, colours: u32, rgb_ok: bool) {
    if gc.fg & COLOUR_FLAG_RGB != 0 {
        if rgb_ok {
            return;
        }
        let (r, g, b) = split_rgb(gc.fg);
        gc.fg = find_rgb(r, g, b);
    }

    if gc.fg & COLOUR_FLAG_256 != 0 {
        if colours >= 256 {
            return;
        }
        let c = c256_to_16((gc.fg & 0xff) as u8);
        if c >= 8 {
            if colours >= 16 {
                gc.fg = u32::from(c) - 8 + 90;
            } else {
                gc.fg = u32::from(c & 7);
                gc.attr.insert(CellFlags::BRIGHT);
            }
        } else {
            gc.fg = u32::from(c);
        }
    }

    // Aixterm bright foreground on a terminal without the upper palette.
    if (90..=97).contains(&gc.fg) && colours < 16 {
        gc.fg -= 90;
        gc.attr.insert(CellFlags::BRIGHT);
    }
}

/// Project a cell's background, like [`check_fg`].
///
/// Backgrounds never gain the BRIGHT attribute: SGR bold brightens the
/// foreground only, so a bright background on a dim terminal falls back to
/// its base colour.
pub fn check_bg(gc: &mut GridCell, colours: u32, rgb_ok: bool) {
    if gc.bg & COLOUR_FLAG_RGB != 0 {
        if rgb_ok {
            return;
        }
        let (r, g, b) = split_rgb(gc.bg);
        gc.bg = find_rgb(r, g, b);
    }

    if gc.bg & COLOUR_FLAG_256 != 0 {
        if colours >= 256 {
            return;
        }
        let c = c256_to_16((gc.bg & 0xff) as u8);
        if c >= 8 {
            if colours >= 16 {
                gc.bg = u32::from(c) - 8 + 90;
            } else {
                gc.bg = u32::from(c & 7);
            }
        } else {
            gc.bg = u32::from(c);
        }
    }

    if (90..=97).contains(&gc.bg) && colours < 16 {
        gc.bg -= 90;
    }
}

#[cfg(test)]
mod tests {
    use super::{
        COLOUR_FLAG_256, COLOUR_FLAG_RGB, c256_rgb, c256_to_16, check_bg, check_fg, find_rgb,
        join_rgb, split_rgb,
    };
    use crate::cell::{CellFlags, GridCell};

    #[test]
    fn rgb_round_trip() {
        let c = join_rgb(0x12, 0x34, 0x56);
        assert_ne!(c & COLOUR_FLAG_RGB, 0);
        assert_eq!(split_rgb(c), (0x12, 0x34, 0x56));
    }

    #[test]
    fn find_rgb_exact_cube_corner() {
        // Pure red sits exactly on cube index 196.
        assert_eq!(find_rgb(0xff, 0, 0), COLOUR_FLAG_256 | 196);
        // Pure white is cube index 231.
        assert_eq!(find_rgb(0xff, 0xff, 0xff), COLOUR_FLAG_256 | 231);
    }

    #[test]
    fn find_rgb_prefers_grey_ramp_for_greys() {
        let c = find_rgb(0x12, 0x12, 0x12) & 0xff;
        assert!((232..=255).contains(&c), "got {c}");
    }

    #[test]
    fn cube_rgb_matches_construction() {
        // 196 = cube (5, 0, 0).
        assert_eq!(c256_rgb(196), (0xff, 0, 0));
        assert_eq!(c256_rgb(232), (8, 8, 8));
        assert_eq!(c256_rgb(255), (238, 238, 238));
    }

    #[test]
    fn fold_256_to_16_identity_below_16() {
        for i in 0..16 {
            assert_eq!(c256_to_16(i), i);
        }
    }

    #[test]
    fn fold_256_to_16_bright_red() {
        assert_eq!(c256_to_16(196), 9);
        assert_eq!(c256_to_16(21), 12); // pure blue
        assert_eq!(c256_to_16(231), 15); // cube white
    }

    #[test]
    fn check_fg_downgrades_256_to_bright_on_8_colours() {
        let mut gc = GridCell::default();
        gc.fg = COLOUR_FLAG_256 | 196;
        check_fg(&mut gc, 8, false);
        assert_eq!(gc.fg, 1);
        assert!(gc.attr.contains(CellFlags::BRIGHT));
    }

    #[test]
    fn check_fg_downgrades_256_to_aixterm_on_16_colours() {
        let mut gc = GridCell::default();
        gc.fg = COLOUR_FLAG_256 | 196;
        check_fg(&mut gc, 16, false);
        assert_eq!(gc.fg, 91);
        assert!(!gc.attr.contains(CellFlags::BRIGHT));
    }

    #[test]
    fn check_fg_rgb_chain_to_8() {
        let mut gc = GridCell::default();
        gc.fg = join_rgb(0xff, 0, 0);
        check_fg(&mut gc, 8, false);
        assert_eq!(gc.fg, 1);
        assert!(gc.attr.contains(CellFlags::BRIGHT));
    }

    #[test]
    fn check_fg_keeps_rgb_when_supported() {
        let mut gc = GridCell::default();
        gc.fg = join_rgb(1, 2, 3);
        check_fg(&mut gc, 256, true);
        assert_eq!(gc.fg, join_rgb(1, 2, 3));
    }

    #[test]
    fn check_fg_is_a_projection() {
        for colours in [8u32, 16, 256] {
            let mut gc = GridCell::default();
            gc.fg = COLOUR_FLAG_256 | 202;
            check_fg(&mut gc, colours, false);
            let once = (gc.fg, gc.attr);
            check_fg(&mut gc, colours, false);
            assert_eq!((gc.fg, gc.attr), once, "colours={colours}");
        }
    }

    #[test]
    fn check_bg_never_sets_bright() {
        let mut gc = GridCell::default();
        gc.bg = COLOUR_FLAG_256 | 196;
        check_bg(&mut gc, 8, false);
        assert_eq!(gc.bg, 1);
        assert!(gc.attr.is_empty());
    }

    #[test]
    fn check_bg_aixterm_on_16_colours() {
        let mut gc = GridCell::default();
        gc.bg = COLOUR_FLAG_256 | 196;
        check_bg(&mut gc, 16, false);
        assert_eq!(gc.bg, 91);
    }

    #[test]
    fn check_bg_folds_aixterm_on_8_colours() {
        let mut gc = GridCell::default();
        gc.bg = 94;
        check_bg(&mut gc, 8, false);
        assert_eq!(gc.bg, 4);
    }

    #[test]
    fn check_fg_default_untouched() {
        let mut gc = GridCell::default();
        check_fg(&mut gc, 8, false);
        check_bg(&mut gc, 8, false);
        assert_eq!(gc, GridCell::default());
    }
}
