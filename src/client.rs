//! Multi-client command fan-out.
//!
//! Several clients can look at the same window through terminals of
//! different types and sizes. A pane update is written once per ready
//! client, with the pane's offsets adjusted for that client's layout
//! before the handler runs.

use bitflags::bitflags;

use crate::screen::Pane;
use crate::tty::Tty;
use crate::tty::cmd::{TtyCmd, TtyCtx};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClientFlags: u32 {
        /// Attached to a session.
        const ATTACHED   = 1;
        /// Output suspended (^Z or detached terminal).
        const SUSPENDED  = 1 << 1;
        /// Updates frozen, e.g. during a redraw the client asked to defer.
        const FROZEN     = 1 << 2;
        /// The status line sits above the window, shifting every pane down.
        const STATUS_TOP = 1 << 3;
    }
}

/// One attached client: a terminal plus its view state.
pub struct Client {
    pub tty: Tty,
    pub flags: ClientFlags,
    /// The window this client currently displays.
    pub current_window: u32,
}

impl Client {
    pub fn new(tty: Tty, current_window: u32) -> Self {
        Self {
            tty,
            flags: ClientFlags::ATTACHED,
            current_window,
        }
    }

    /// Whether pane updates should reach this client at all.
    fn is_ready(&self, pane: &Pane) -> bool {
        self.flags.contains(ClientFlags::ATTACHED)
            && !self
                .flags
                .intersects(ClientFlags::SUSPENDED | ClientFlags::FROZEN)
            && self.current_window == pane.window_id
    }
}

/// Write one screen operation to every client showing the pane.
///
/// The context's offsets are recomputed per client: panes shift down one
/// row on clients that keep their status line on top.
pub fn write_command(clients: &mut [Client], cmd: TtyCmd, ctx: &mut TtyCtx<'_>) {
    for client in clients {
        if !client.is_ready(ctx.pane) {
            continue;
        }
        ctx.xoff = ctx.pane.xoff;
        ctx.yoff = ctx.pane.yoff
            + u32::from(client.flags.contains(ClientFlags::STATUS_TOP));
        client.tty.write(cmd, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::{Client, ClientFlags, write_command};
    use crate::caps::TermCaps;
    use crate::cell::GridCell;
    use crate::screen::{Pane, Screen};
    use crate::tty::Tty;
    use crate::tty::cmd::{TtyCmd, TtyCtx};

    fn client(window: u32) -> Client {
        let tty = Tty::detached(TermCaps::for_term("xterm").unwrap(), 80, 24);
        Client::new(tty, window)
    }

    #[test]
    fn ready_clients_receive_the_command() {
        let mut clients = vec![client(1), client(1)];
        let pane = Pane::new(7, 1, Screen::new(80, 24));
        let cell = GridCell::new('x');
        let mut ctx = TtyCtx::new(&pane);
        ctx.cell = Some(&cell);
        write_command(&mut clients, TtyCmd::Cell, &mut ctx);
        assert_eq!(clients[0].tty.take_output(), b"\x1b[1;1Hx");
        assert_eq!(clients[1].tty.take_output(), b"\x1b[1;1Hx");
    }

    #[test]
    fn other_window_and_suspended_clients_are_skipped() {
        let mut clients = vec![client(1), client(2), client(1)];
        clients[2].flags.insert(ClientFlags::SUSPENDED);
        let pane = Pane::new(7, 1, Screen::new(80, 24));
        let cell = GridCell::new('x');
        let mut ctx = TtyCtx::new(&pane);
        ctx.cell = Some(&cell);
        write_command(&mut clients, TtyCmd::Cell, &mut ctx);
        assert!(!clients[0].tty.output().is_empty());
        assert!(clients[1].tty.output().is_empty());
        assert!(clients[2].tty.output().is_empty());
    }

    #[test]
    fn status_line_on_top_shifts_panes_down() {
        let mut clients = vec![client(1)];
        clients[0].flags.insert(ClientFlags::STATUS_TOP);
        let pane = Pane::new(7, 1, Screen::new(80, 23));
        let cell = GridCell::new('x');
        let mut ctx = TtyCtx::new(&pane);
        ctx.cell = Some(&cell);
        write_command(&mut clients, TtyCmd::Cell, &mut ctx);
        assert_eq!(clients[0].tty.take_output(), b"\x1b[2;1Hx");
    }
}
