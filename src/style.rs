//! Default-colour resolution.
//!
//! Cells reach the engine with fg or bg set to the default sentinel; what
//! "default" looks like depends on the pane. An explicit pane style wins,
//! then the window's active-pane style for the active pane, then the plain
//! window style. Applied by the attribute engine before any downgrade so
//! the substituted colours go through the same projection as explicit ones.

use crate::cell::GridCell;
use crate::colour::COLOUR_DEFAULT;
use crate::screen::Pane;

/// Fold the pane's style options into a cell's default fg/bg.
pub fn default_colours(gc: &mut GridCell, pane: &Pane) {
    if gc.fg != COLOUR_DEFAULT && gc.bg != COLOUR_DEFAULT {
        return;
    }

    if gc.fg == COLOUR_DEFAULT {
        if let Some(colgc) = pane.colgc {
            if colgc.fg != COLOUR_DEFAULT {
                gc.fg = colgc.fg;
            }
        }
        if gc.fg == COLOUR_DEFAULT {
            gc.fg = pane.style().fg;
        }
    }

    if gc.bg == COLOUR_DEFAULT {
        if let Some(colgc) = pane.colgc {
            if colgc.bg != COLOUR_DEFAULT {
                gc.bg = colgc.bg;
            }
        }
        if gc.bg == COLOUR_DEFAULT {
            gc.bg = pane.style().bg;
        }
    }
}
