//! The terminal instance: shadow state, lifecycle, and mode control.
//!
//! A [`Tty`] owns one output descriptor and a model of what the terminal
//! currently shows: cursor position, scroll region, active cell attributes,
//! and mode bits. Every emission updates the shadow; every decision reads
//! it back, which is what lets the engine skip redundant bytes. Cursor and
//! region shadows are `Option` — `None` means the terminal state is unknown
//! and the next movement must be absolute.

pub mod attr;
pub mod cmd;
pub mod cursor;
pub mod draw;
pub mod mode;

use std::io;
use std::os::fd::RawFd;

use bitflags::bitflags;
use log::{debug, warn};

use crate::TtyError;
use crate::acs::AcsMap;
use crate::caps::{Cap, TermCaps, TermFeatures};
use crate::cell::{CellFlags, DEFAULT_CELL, GridCell};
use crate::colour::COLOUR_DEFAULT;
use crate::output::{self, OutputSink};
use crate::screen::{Pane, Screen};
use crate::style;
use self::mode::TtyModes;

bitflags! {
    /// Lifecycle and behaviour flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TtyFlags: u32 {
        /// Capability table resolved.
        const OPENED   = 1;
        /// Start sequence emitted; the terminal is ours.
        const STARTED  = 1 << 1;
        /// The terminal takes UTF-8; line drawing uses Unicode glyphs.
        const UTF8     = 1 << 2;
        /// Cursor visibility is frozen off (bulk painting in progress).
        const NOCURSOR = 1 << 3;
        /// Output suspended by the owner.
        const FREEZE   = 1 << 4;
        /// Focus reporting requested by configuration.
        const FOCUS    = 1 << 5;
        /// A synchronized-update burst is open.
        const SYNCING  = 1 << 6;
    }
}

/// One attached terminal and its shadow state.
pub struct Tty {
    termname: String,
    term: TermCaps,
    acs: AcsMap,
    fd: Option<RawFd>,
    pub(crate) sink: OutputSink,

    pub(crate) sx: u32,
    pub(crate) sy: u32,
    /// Shadow cursor; `None` when the terminal cursor position is unknown.
    /// The column may sit at `sx` when a wrap is pending.
    pub(crate) cursor: Option<(u32, u32)>,
    /// Shadow scroll region; `None` when unknown.
    pub(crate) region: Option<(u32, u32)>,
    /// Shadow of the attributes the terminal is decorating output with.
    pub(crate) cell: GridCell,
    pub(crate) mode: TtyModes,
    pub(crate) flags: TtyFlags,
    ccolour: String,
    cstyle: u32,
    tio: Option<libc::termios>,
}

impl Tty {
    /// Create a terminal bound to a descriptor.
    ///
    /// Fails with [`TtyError::NotATty`] when `fd` is not a terminal. The
    /// descriptor is owned from here on and closed by [`close`](Self::close).
    pub fn init(fd: RawFd, termname: &str) -> Result<Self, TtyError> {
        if unsafe { libc::isatty(fd) } == 0 {
            return Err(TtyError::NotATty);
        }
        debug!("tty init: fd {fd}, term {termname}");
        Ok(Self::build(Some(fd), termname))
    }

    /// Create a terminal not bound to a descriptor, rendering into the
    /// output buffer only. Used when the bytes are consumed elsewhere, and
    /// throughout the test suite.
    pub fn detached(term: TermCaps, sx: u32, sy: u32) -> Self {
        let mut tty = Self::build(None, term.name());
        tty.acs = term
            .raw_string(Cap::Acsc)
            .map_or_else(AcsMap::empty, AcsMap::from_acsc);
        tty.term = term;
        tty.sx = sx;
        tty.sy = sy;
        tty.flags |= TtyFlags::OPENED | TtyFlags::STARTED;
        tty
    }

    fn build(fd: Option<RawFd>, termname: &str) -> Self {
        Self {
            termname: termname.to_string(),
            term: TermCaps::empty(termname),
            acs: AcsMap::empty(),
            fd,
            sink: OutputSink::new(),
            sx: 80,
            sy: 24,
            cursor: None,
            region: None,
            cell: DEFAULT_CELL,
            mode: TtyModes::default(),
            flags: TtyFlags::empty(),
            ccolour: String::new(),
            cstyle: 0,
            tio: None,
        }
    }

    /// Resolve the capability table and bring the terminal up.
    ///
    /// `features` carries user-asserted overrides on top of the builtin
    /// description. On failure the terminal is closed and the error
    /// surfaced for the caller to report.
    pub fn open(&mut self, features: TermFeatures) -> Result<(), TtyError> {
        match TermCaps::for_term(&self.termname) {
            Ok(mut term) => {
                term.apply_features(features);
                self.acs = term
                    .raw_string(Cap::Acsc)
                    .map_or_else(AcsMap::empty, AcsMap::from_acsc);
                debug!(
                    "tty open: {} ({} colours)",
                    term.name(),
                    term.colours()
                );
                self.term = term;
                self.flags |= TtyFlags::OPENED;
                self.resize();
                self.start();
                Ok(())
            }
            Err(err) => {
                self.close();
                Err(err)
            }
        }
    }

    /// Emit the start sequence and mark the terminal started.
    pub fn start(&mut self) {
        if self.flags.contains(TtyFlags::STARTED) {
            return;
        }
        if let Some(fd) = self.fd {
            self.enter_raw(fd);
        }

        self.emit(Cap::Smcup);
        self.emit(Cap::Sgr0);
        self.cell = DEFAULT_CELL;
        self.emit(Cap::Rmkx);
        if self.use_acs() {
            self.emit(Cap::Enacs);
        }
        self.emit(Cap::Clear);
        self.emit(Cap::Cnorm);
        // Any mouse state left behind by a previous owner is stale.
        self.puts("\x1b[?1000l\x1b[?1002l\x1b[?1003l\x1b[?1006l\x1b[?1005l");

        self.mode = TtyModes::CURSOR;
        if self.flags.contains(TtyFlags::FOCUS) {
            self.puts("\x1b[?1004h");
            self.mode |= TtyModes::FOCUS;
        }
        self.cursor = None;
        self.region = None;
        self.flags |= TtyFlags::STARTED;
        debug!("tty started: {}x{}", self.sx, self.sy);
    }

    /// Restore the terminal for whoever owns it next.
    ///
    /// Teardown bytes bypass the output buffer: the event loop may be gone,
    /// so this is a bounded best-effort write. ioctl failures on a dying
    /// terminal are tolerated.
    pub fn stop(&mut self) {
        if !self.flags.contains(TtyFlags::STARTED) {
            return;
        }
        self.flags.remove(TtyFlags::STARTED);
        let Some(fd) = self.fd else { return };

        if let Some(tio) = self.tio {
            if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tio) } != 0 {
                warn!("tcsetattr failed on stop");
            }
        }

        let mut out = Vec::new();
        push_cap(&mut out, self.term.string2(Cap::Csr, 0, self.sy.saturating_sub(1)));
        if self.use_acs() {
            push_cap(&mut out, self.term.string(Cap::Rmacs));
        }
        push_cap(&mut out, self.term.string(Cap::Sgr0));
        push_cap(&mut out, self.term.string(Cap::Rmkx));
        push_cap(&mut out, self.term.string(Cap::Clear));
        if self.cstyle != 0 {
            if self.term.has(Cap::Se) {
                push_cap(&mut out, self.term.string(Cap::Se));
            } else {
                push_cap(&mut out, self.term.string1(Cap::Ss, 0));
            }
        }
        out.extend_from_slice(b"\x1b[?2004l");
        out.push(b'\r');
        push_cap(&mut out, self.term.string(Cap::Cnorm));
        if self.mode.intersects(TtyModes::ALL_MOUSE) {
            out.extend_from_slice(b"\x1b[?1000l\x1b[?1002l\x1b[?1003l\x1b[?1006l");
        }
        if self.mode.contains(TtyModes::FOCUS) {
            out.extend_from_slice(b"\x1b[?1004l");
        }
        push_cap(&mut out, self.term.string(Cap::Rmcup));

        output::raw_write(fd, &out);
        debug!("tty stopped");
    }

    /// Tear the terminal down and release the descriptor.
    pub fn close(&mut self) {
        self.stop();
        self.flags.remove(TtyFlags::OPENED);
        self.sink.discard();
        if let Some(fd) = self.fd.take() {
            unsafe {
                libc::close(fd);
            }
        }
    }

    /// Re-query the window size and resynchronize the shadow.
    pub fn resize(&mut self) {
        let (sx, sy) = self.fd.map_or((self.sx, self.sy), query_winsize);
        self.set_size(sx, sy);
    }

    /// Apply a size, sentinel the shadows, and resync cursor and region if
    /// the terminal is live.
    pub fn set_size(&mut self, sx: u32, sy: u32) {
        self.sx = sx.max(1);
        self.sy = sy.max(1);
        self.cursor = None;
        self.region = None;
        if self.flags.contains(TtyFlags::STARTED) {
            self.cursor_to(0, 0);
            self.region_set(0, self.sy - 1);
        }
        debug!("tty size now {}x{}", self.sx, self.sy);
    }

    fn enter_raw(&mut self, fd: RawFd) {
        let mut tio = unsafe { std::mem::zeroed::<libc::termios>() };
        if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
            warn!("tcgetattr failed; line discipline not saved");
            return;
        }
        self.tio = Some(tio);
        let mut raw = tio;
        unsafe {
            libc::cfmakeraw(&mut raw);
            if libc::tcsetattr(fd, libc::TCSANOW, &raw) != 0 {
                warn!("tcsetattr failed on start");
            }
            let fl = libc::fcntl(fd, libc::F_GETFL);
            if fl >= 0 {
                libc::fcntl(fd, libc::F_SETFL, fl | libc::O_NONBLOCK);
            }
        }
    }

    // ─── Shadow accessors ───────────────────────────────────────────────

    pub fn termname(&self) -> &str {
        &self.termname
    }

    pub fn term(&self) -> &TermCaps {
        &self.term
    }

    pub fn size(&self) -> (u32, u32) {
        (self.sx, self.sy)
    }

    pub fn cursor(&self) -> Option<(u32, u32)> {
        self.cursor
    }

    pub fn region(&self) -> Option<(u32, u32)> {
        self.region
    }

    pub fn shadow_cell(&self) -> &GridCell {
        &self.cell
    }

    pub fn mode(&self) -> TtyModes {
        self.mode
    }

    pub fn flags(&self) -> TtyFlags {
        self.flags
    }

    pub fn set_utf8(&mut self, on: bool) {
        self.flags.set(TtyFlags::UTF8, on);
    }

    /// Bytes queued for the terminal but not yet flushed.
    pub fn output(&self) -> &[u8] {
        self.sink.as_bytes()
    }

    /// Drain the queued bytes. The test suite and buffer-rendering callers
    /// consume output this way; descriptor-bound terminals use
    /// [`flush`](Self::flush).
    pub fn take_output(&mut self) -> Vec<u8> {
        self.sink.take()
    }

    /// Flush queued bytes to the descriptor; driven by the event loop.
    pub fn flush(&mut self) -> io::Result<()> {
        match self.fd {
            Some(fd) => self.sink.flush_to(fd),
            None => Ok(()),
        }
    }

    /// Whether the alternate character set is usable: the terminal maps it
    /// and we are not in UTF-8 mode (where line glyphs are sent directly).
    pub(crate) fn use_acs(&self) -> bool {
        self.term.has(Cap::Acsc) && !self.flags.contains(TtyFlags::UTF8)
    }

    pub(crate) fn acs_byte(&self, ch: u8) -> Option<u8> {
        self.acs.get(ch)
    }

    /// Bulk-erase primitives paint the wrong colour when the effective
    /// background is not default and the terminal lacks background colour
    /// erase; such erases must be synthesized with spaces.
    pub(crate) fn fake_bce(&self, pane: &Pane, bg: u32) -> bool {
        if self.term.flag(Cap::Bce) {
            return false;
        }
        let mut gc = DEFAULT_CELL;
        gc.bg = bg;
        style::default_colours(&mut gc, pane);
        gc.bg != COLOUR_DEFAULT
    }

    // ─── Mode control ───────────────────────────────────────────────────

    /// Reconcile the terminal's mode bits with `mode`, emitting only what
    /// changed. `screen` supplies the application's cursor style and colour
    /// wishes to sync alongside.
    pub fn update_mode(&mut self, mode: TtyModes, screen: Option<&Screen>) {
        let mut mode = mode;
        if self.flags.contains(TtyFlags::NOCURSOR) {
            mode.remove(TtyModes::CURSOR);
        }
        let changed = mode ^ self.mode;

        if changed.contains(TtyModes::CURSOR) {
            if mode.contains(TtyModes::CURSOR) {
                self.emit(Cap::Cnorm);
            } else {
                self.emit(Cap::Civis);
            }
        }
        if changed.contains(TtyModes::BLINKING) {
            if mode.contains(TtyModes::BLINKING) {
                self.puts("\x1b[?12h");
            } else {
                self.puts("\x1b[?12l");
            }
        }
        if let Some(screen) = screen {
            self.set_cursor_style(screen.cursor_style);
            if self.ccolour != screen.cursor_colour {
                let colour = screen.cursor_colour.clone();
                self.force_cursor_colour(&colour);
            }
        }

        let mut bytes = Vec::new();
        let mouse = mode::mouse_transition(self.mode, mode, &mut bytes);
        self.sink.append(&bytes);
        mode = (mode - TtyModes::ALL_MOUSE - TtyModes::MOUSE_SGR) | mouse;

        if changed.contains(TtyModes::BRACKET_PASTE) {
            if mode.contains(TtyModes::BRACKET_PASTE) {
                self.puts("\x1b[?2004h");
            } else {
                self.puts("\x1b[?2004l");
            }
        }
        if changed.contains(TtyModes::FOCUS) {
            if mode.contains(TtyModes::FOCUS) {
                self.puts("\x1b[?1004h");
            } else {
                self.puts("\x1b[?1004l");
            }
        }
        if changed.contains(TtyModes::KEYPAD) {
            if mode.contains(TtyModes::KEYPAD) {
                self.emit(Cap::Smkx);
            } else {
                self.emit(Cap::Rmkx);
            }
        }
        self.mode = mode;
    }

    /// Set the cursor style (0 = terminal default), shadowed in `cstyle`.
    pub fn set_cursor_style(&mut self, style: u32) {
        if self.cstyle == style || !self.term.has(Cap::Ss) {
            return;
        }
        if style == 0 {
            if !self.emit(Cap::Se) {
                self.emit1(Cap::Ss, 0);
            }
        } else {
            self.emit1(Cap::Ss, style);
        }
        self.cstyle = style;
    }

    /// Set or reset (empty string) the cursor colour.
    pub fn force_cursor_colour(&mut self, colour: &str) {
        if self.ccolour == colour {
            return;
        }
        if colour.is_empty() {
            self.emit(Cap::Cr);
        } else {
            self.emit_str(Cap::Cs, colour);
        }
        self.ccolour = colour.to_string();
    }

    /// Set the terminal title through the status line capabilities, when
    /// the terminal has them.
    pub fn set_title(&mut self, title: &str) {
        if self.term.has(Cap::Tsl) && self.term.has(Cap::Fsl) {
            self.emit(Cap::Tsl);
            self.sink.append(title.as_bytes());
            self.emit(Cap::Fsl);
        }
    }

    /// Open a synchronized-update burst if the terminal understands them.
    pub fn sync_start(&mut self) {
        if self.term.features().contains(TermFeatures::SYNC)
            && !self.flags.contains(TtyFlags::SYNCING)
        {
            self.puts("\x1b[?2026h");
            self.flags.insert(TtyFlags::SYNCING);
        }
    }

    /// Close a synchronized-update burst.
    pub fn sync_end(&mut self) {
        if self.flags.contains(TtyFlags::SYNCING) {
            self.puts("\x1b[?2026l");
            self.flags.remove(TtyFlags::SYNCING);
        }
    }

    // ─── Shadow reset ───────────────────────────────────────────────────

    /// Drop back to default attributes if the terminal is decorated.
    ///
    /// SGR0 is the only portable way to clear attribute bits, so this is
    /// also the first step whenever any attribute must be removed.
    pub(crate) fn reset(&mut self) {
        if self.cell == DEFAULT_CELL {
            return;
        }
        if self.cell.attr.contains(CellFlags::CHARSET) && self.use_acs() {
            self.emit(Cap::Rmacs);
        }
        self.emit(Cap::Sgr0);
        self.cell = DEFAULT_CELL;
    }

    /// Forget everything we believed about the terminal and resync.
    ///
    /// Used after raw byte passthrough and anything else that leaves the
    /// terminal in a state the shadow cannot describe.
    pub(crate) fn invalidate(&mut self) {
        self.cell = DEFAULT_CELL;
        self.cursor = None;
        self.region = None;
        if self.flags.contains(TtyFlags::STARTED) {
            self.emit(Cap::Sgr0);
            self.region_set(0, self.sy - 1);
            self.cursor_to(0, 0);
        }
    }

    // ─── Emission helpers ───────────────────────────────────────────────

    /// Append literal bytes with no shadow effect.
    pub(crate) fn puts(&mut self, s: &str) {
        self.sink.append(s.as_bytes());
    }

    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) {
        self.sink.append(bytes);
    }

    /// Expand and emit a parameterless capability. Returns false when the
    /// terminal lacks it, so callers can pick a fallback.
    pub(crate) fn emit(&mut self, cap: Cap) -> bool {
        match self.term.string(cap) {
            Some(bytes) => {
                self.sink.append(&bytes);
                true
            }
            None => false,
        }
    }

    pub(crate) fn emit1(&mut self, cap: Cap, a: u32) -> bool {
        match self.term.string1(cap, a) {
            Some(bytes) => {
                self.sink.append(&bytes);
                true
            }
            None => false,
        }
    }

    pub(crate) fn emit2(&mut self, cap: Cap, a: u32, b: u32) -> bool {
        match self.term.string2(cap, a, b) {
            Some(bytes) => {
                self.sink.append(&bytes);
                true
            }
            None => false,
        }
    }

    pub(crate) fn emit_str(&mut self, cap: Cap, s: &str) -> bool {
        match self.term.string_s(cap, s) {
            Some(bytes) => {
                self.sink.append(&bytes);
                true
            }
            None => false,
        }
    }

    pub(crate) fn emit_str2(&mut self, cap: Cap, a: &str, b: &str) -> bool {
        match self.term.string_ss(cap, a, b) {
            Some(bytes) => {
                self.sink.append(&bytes);
                true
            }
            None => false,
        }
    }

    /// Emit the parameterized capability once, or its single-step variant
    /// `n` times when only that exists.
    pub(crate) fn emit_repeat(&mut self, cap: Cap, cap1: Cap, n: u32) {
        if self.term.has(cap) {
            self.emit1(cap, n);
        } else {
            for _ in 0..n {
                self.emit(cap1);
            }
        }
    }
}

fn push_cap(out: &mut Vec<u8>, bytes: Option<Vec<u8>>) {
    if let Some(b) = bytes {
        out.extend_from_slice(&b);
    }
}

fn query_winsize(fd: RawFd) -> (u32, u32) {
    let mut ws = unsafe { std::mem::zeroed::<libc::winsize>() };
    let ok = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) } == 0;
    if ok && ws.ws_col > 0 && ws.ws_row > 0 {
        (u32::from(ws.ws_col), u32::from(ws.ws_row))
    } else {
        (80, 24)
    }
}
