//! Terminal mode bits and mode-transition sequences.
//!
//! Mouse reporting has ordering constraints some terminals care about: on
//! the way up, SGR encoding (1006) must be enabled before the tracking mode
//! so the last enable to win is the preferred decoder; on the way down the
//! tracking mode goes first and SGR last. Keeping the transition in one
//! function makes the ordering a single point of truth.

use bitflags::bitflags;

bitflags! {
    /// Shadowed terminal mode bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TtyModes: u32 {
        /// DECTCEM — cursor visible.
        const CURSOR         = 1;
        /// ATT610 — cursor blinking.
        const BLINKING       = 1 << 1;
        /// DECKPAM — application keypad.
        const KEYPAD         = 1 << 2;
        /// Mode 2004 — bracketed paste.
        const BRACKET_PASTE  = 1 << 3;
        /// Mode 1000 — report clicks.
        const MOUSE_STANDARD = 1 << 4;
        /// Mode 1002 — report clicks and drag.
        const MOUSE_BUTTON   = 1 << 5;
        /// Mode 1003 — report all motion.
        const MOUSE_ANY      = 1 << 6;
        /// Mode 1006 — SGR mouse encoding.
        const MOUSE_SGR      = 1 << 7;
        /// Mode 1004 — focus in/out events.
        const FOCUS          = 1 << 8;

        const ALL_MOUSE = Self::MOUSE_STANDARD.bits()
                        | Self::MOUSE_BUTTON.bits()
                        | Self::MOUSE_ANY.bits();
    }
}

impl Default for TtyModes {
    fn default() -> Self {
        Self::CURSOR
    }
}

const TRACKING: [(TtyModes, u32); 3] = [
    (TtyModes::MOUSE_STANDARD, 1000),
    (TtyModes::MOUSE_BUTTON, 1002),
    (TtyModes::MOUSE_ANY, 1003),
];

/// Append the byte sequences carrying the terminal from the `prev` mouse
/// state to `next`. Returns the mouse bits (including SGR) actually active
/// afterwards.
pub fn mouse_transition(prev: TtyModes, next: TtyModes, out: &mut Vec<u8>) -> TtyModes {
    let prev_m = prev & TtyModes::ALL_MOUSE;
    let next_m = next & TtyModes::ALL_MOUSE;
    if prev_m == next_m {
        return prev & (TtyModes::ALL_MOUSE | TtyModes::MOUSE_SGR);
    }

    if next_m.is_empty() {
        for (bit, num) in TRACKING {
            if prev_m.contains(bit) {
                out.extend_from_slice(format!("\x1b[?{num}l").as_bytes());
            }
        }
        out.extend_from_slice(b"\x1b[?1006l");
        return TtyModes::empty();
    }

    // SGR first so it survives terminals where the last enable wins, and
    // make sure the legacy UTF-8 encoding is off.
    out.extend_from_slice(b"\x1b[?1006h");
    out.extend_from_slice(b"\x1b[?1005l");
    for (bit, num) in TRACKING {
        if prev_m.contains(bit) && !next_m.contains(bit) {
            out.extend_from_slice(format!("\x1b[?{num}l").as_bytes());
        }
    }
    for (bit, num) in TRACKING {
        if next_m.contains(bit) && !prev_m.contains(bit) {
            out.extend_from_slice(format!("\x1b[?{num}h").as_bytes());
        }
    }
    next_m | TtyModes::MOUSE_SGR
}

#[cfg(test)]
mod tests {
    use super::{TtyModes, mouse_transition};

    fn bytes(prev: TtyModes, next: TtyModes) -> (Vec<u8>, TtyModes) {
        let mut out = Vec::new();
        let active = mouse_transition(prev, next, &mut out);
        (out, active)
    }

    #[test]
    fn enable_emits_sgr_first() {
        let (out, active) = bytes(TtyModes::empty(), TtyModes::MOUSE_BUTTON);
        assert_eq!(out, b"\x1b[?1006h\x1b[?1005l\x1b[?1002h");
        assert_eq!(active, TtyModes::MOUSE_BUTTON | TtyModes::MOUSE_SGR);
    }

    #[test]
    fn disable_emits_sgr_last() {
        let (out, active) = bytes(
            TtyModes::MOUSE_ANY | TtyModes::MOUSE_SGR,
            TtyModes::empty(),
        );
        assert_eq!(out, b"\x1b[?1003l\x1b[?1006l");
        assert!(active.is_empty());
    }

    #[test]
    fn switching_tracking_disables_old_mode() {
        let (out, active) = bytes(
            TtyModes::MOUSE_STANDARD | TtyModes::MOUSE_SGR,
            TtyModes::MOUSE_ANY,
        );
        assert_eq!(
            out,
            b"\x1b[?1006h\x1b[?1005l\x1b[?1000l\x1b[?1003h"
        );
        assert_eq!(active, TtyModes::MOUSE_ANY | TtyModes::MOUSE_SGR);
    }

    #[test]
    fn no_change_is_silent() {
        let (out, active) = bytes(
            TtyModes::MOUSE_BUTTON | TtyModes::MOUSE_SGR,
            TtyModes::MOUSE_BUTTON,
        );
        assert!(out.is_empty());
        assert_eq!(active, TtyModes::MOUSE_BUTTON | TtyModes::MOUSE_SGR);
    }
}
