//! Builtin terminal descriptions.
//!
//! A compact stand-in for the terminfo database covering the families a
//! multiplexer actually meets. Each entry is a list of capability values,
//! optionally layered on a base entry; resolution walks the base chain
//! first so variants only state their differences.

use super::{Cap, CapValue, TermCaps, TermFeatures};

/// Conditional SGR foreground string for 256-colour terminals.
pub const SETAF_256: &str =
    "\u{1b}[%?%p1%{8}%<%t3%p1%d%e%p1%{16}%<%t9%p1%{8}%-%d%e38;5;%p1%d%;m";

/// Conditional SGR background string for 256-colour terminals.
pub const SETAB_256: &str =
    "\u{1b}[%?%p1%{8}%<%t4%p1%d%e%p1%{16}%<%t10%p1%{8}%-%d%e48;5;%p1%d%;m";

pub struct Entry {
    pub name: &'static str,
    /// Entry this one layers on top of, applied first.
    pub base: Option<&'static str>,
    pub caps: &'static [(Cap, CapValue)],
    pub features: TermFeatures,
}

const ACSC: &str = "``aaffggiijjkkllmmnnooppqqrrssttuuvvwwxxyyzz{{||}}~~";

const XTERM: &[(Cap, CapValue)] = &[
    (Cap::Ax, CapValue::Flag(true)),
    (Cap::Bce, CapValue::Flag(true)),
    (Cap::Colors, CapValue::Number(8)),
    (Cap::Acsc, CapValue::Str(ACSC)),
    (Cap::Blink, CapValue::Str("\u{1b}[5m")),
    (Cap::Bold, CapValue::Str("\u{1b}[1m")),
    (Cap::Civis, CapValue::Str("\u{1b}[?25l")),
    (Cap::Clear, CapValue::Str("\u{1b}[H\u{1b}[2J")),
    (Cap::Cnorm, CapValue::Str("\u{1b}[?12l\u{1b}[?25h")),
    (Cap::Cr, CapValue::Str("\u{1b}]112\u{7}")),
    (Cap::Cs, CapValue::Str("\u{1b}]12;%p1%s\u{7}")),
    (Cap::Csr, CapValue::Str("\u{1b}[%i%p1%d;%p2%dr")),
    (Cap::Cub, CapValue::Str("\u{1b}[%p1%dD")),
    (Cap::Cub1, CapValue::Str("\u{8}")),
    (Cap::Cud, CapValue::Str("\u{1b}[%p1%dB")),
    (Cap::Cud1, CapValue::Str("\n")),
    (Cap::Cuf, CapValue::Str("\u{1b}[%p1%dC")),
    (Cap::Cuf1, CapValue::Str("\u{1b}[C")),
    (Cap::Cup, CapValue::Str("\u{1b}[%i%p1%d;%p2%dH")),
    (Cap::Cuu, CapValue::Str("\u{1b}[%p1%dA")),
    (Cap::Cuu1, CapValue::Str("\u{1b}[A")),
    (Cap::Dch, CapValue::Str("\u{1b}[%p1%dP")),
    (Cap::Dch1, CapValue::Str("\u{1b}[P")),
    (Cap::Dim, CapValue::Str("\u{1b}[2m")),
    (Cap::Dl, CapValue::Str("\u{1b}[%p1%dM")),
    (Cap::Dl1, CapValue::Str("\u{1b}[M")),
    (Cap::Ech, CapValue::Str("\u{1b}[%p1%dX")),
    (Cap::Ed, CapValue::Str("\u{1b}[J")),
    (Cap::El, CapValue::Str("\u{1b}[K")),
    (Cap::El1, CapValue::Str("\u{1b}[1K")),
    (Cap::Fsl, CapValue::Str("\u{7}")),
    (Cap::Home, CapValue::Str("\u{1b}[H")),
    (Cap::Hpa, CapValue::Str("\u{1b}[%i%p1%dG")),
    (Cap::Ich, CapValue::Str("\u{1b}[%p1%d@")),
    (Cap::Il, CapValue::Str("\u{1b}[%p1%dL")),
    (Cap::Il1, CapValue::Str("\u{1b}[L")),
    (Cap::Invis, CapValue::Str("\u{1b}[8m")),
    (Cap::Ms, CapValue::Str("\u{1b}]52;%p1%s;%p2%s\u{7}")),
    (Cap::Op, CapValue::Str("\u{1b}[39;49m")),
    (Cap::Rev, CapValue::Str("\u{1b}[7m")),
    (Cap::Ri, CapValue::Str("\u{1b}M")),
    (Cap::Rmacs, CapValue::Str("\u{1b}(B")),
    (Cap::Rmcup, CapValue::Str("\u{1b}[?1049l")),
    (Cap::Rmkx, CapValue::Str("\u{1b}[?1l\u{1b}>")),
    (Cap::Se, CapValue::Str("\u{1b}[2 q")),
    (Cap::Setab, CapValue::Str("\u{1b}[4%p1%dm")),
    (Cap::Setaf, CapValue::Str("\u{1b}[3%p1%dm")),
    (Cap::Sgr0, CapValue::Str("\u{1b}(B\u{1b}[m")),
    (Cap::Sitm, CapValue::Str("\u{1b}[3m")),
    (Cap::Smacs, CapValue::Str("\u{1b}(0")),
    (Cap::Smcup, CapValue::Str("\u{1b}[?1049h")),
    (Cap::Smkx, CapValue::Str("\u{1b}[?1h\u{1b}=")),
    (Cap::Smso, CapValue::Str("\u{1b}[7m")),
    (Cap::Smul, CapValue::Str("\u{1b}[4m")),
    (Cap::Ss, CapValue::Str("\u{1b}[%p1%d q")),
    (Cap::Tsl, CapValue::Str("\u{1b}]2;")),
    (Cap::Vpa, CapValue::Str("\u{1b}[%i%p1%dd")),
];

const XTERM_256: &[(Cap, CapValue)] = &[
    (Cap::Colors, CapValue::Number(256)),
    (Cap::Setaf, CapValue::Str(SETAF_256)),
    (Cap::Setab, CapValue::Str(SETAB_256)),
];

const SCREEN: &[(Cap, CapValue)] = &[
    (Cap::Ax, CapValue::Flag(true)),
    (Cap::Colors, CapValue::Number(8)),
    (Cap::Acsc, CapValue::Str(ACSC)),
    (Cap::Blink, CapValue::Str("\u{1b}[5m")),
    (Cap::Bold, CapValue::Str("\u{1b}[1m")),
    (Cap::Civis, CapValue::Str("\u{1b}[?25l")),
    (Cap::Clear, CapValue::Str("\u{1b}[H\u{1b}[J")),
    (Cap::Cnorm, CapValue::Str("\u{1b}[34h\u{1b}[?25h")),
    (Cap::Csr, CapValue::Str("\u{1b}[%i%p1%d;%p2%dr")),
    (Cap::Cub, CapValue::Str("\u{1b}[%p1%dD")),
    (Cap::Cub1, CapValue::Str("\u{8}")),
    (Cap::Cud, CapValue::Str("\u{1b}[%p1%dB")),
    (Cap::Cud1, CapValue::Str("\n")),
    (Cap::Cuf, CapValue::Str("\u{1b}[%p1%dC")),
    (Cap::Cuf1, CapValue::Str("\u{1b}[C")),
    (Cap::Cup, CapValue::Str("\u{1b}[%i%p1%d;%p2%dH")),
    (Cap::Cuu, CapValue::Str("\u{1b}[%p1%dA")),
    (Cap::Cuu1, CapValue::Str("\u{1b}M")),
    (Cap::Dch, CapValue::Str("\u{1b}[%p1%dP")),
    (Cap::Dch1, CapValue::Str("\u{1b}[P")),
    (Cap::Dim, CapValue::Str("\u{1b}[2m")),
    (Cap::Dl, CapValue::Str("\u{1b}[%p1%dM")),
    (Cap::Dl1, CapValue::Str("\u{1b}[M")),
    (Cap::Ed, CapValue::Str("\u{1b}[J")),
    (Cap::El, CapValue::Str("\u{1b}[K")),
    (Cap::El1, CapValue::Str("\u{1b}[1K")),
    (Cap::Enacs, CapValue::Str("\u{1b}(B\u{1b})0")),
    (Cap::Home, CapValue::Str("\u{1b}[H")),
    (Cap::Ich, CapValue::Str("\u{1b}[%p1%d@")),
    (Cap::Il, CapValue::Str("\u{1b}[%p1%dL")),
    (Cap::Il1, CapValue::Str("\u{1b}[L")),
    (Cap::Op, CapValue::Str("\u{1b}[39;49m")),
    (Cap::Rev, CapValue::Str("\u{1b}[7m")),
    (Cap::Ri, CapValue::Str("\u{1b}M")),
    (Cap::Rmacs, CapValue::Str("\u{f}")),
    (Cap::Rmcup, CapValue::Str("\u{1b}[?1049l")),
    (Cap::Rmkx, CapValue::Str("\u{1b}[?1l\u{1b}>")),
    (Cap::Setab, CapValue::Str("\u{1b}[4%p1%dm")),
    (Cap::Setaf, CapValue::Str("\u{1b}[3%p1%dm")),
    (Cap::Sgr0, CapValue::Str("\u{1b}[m\u{f}")),
    (Cap::Smacs, CapValue::Str("\u{e}")),
    (Cap::Smcup, CapValue::Str("\u{1b}[?1049h")),
    (Cap::Smkx, CapValue::Str("\u{1b}[?1h\u{1b}=")),
    (Cap::Smso, CapValue::Str("\u{1b}[3m")),
    (Cap::Smul, CapValue::Str("\u{1b}[4m")),
    (Cap::Vpa, CapValue::Str("\u{1b}[%i%p1%dd")),
];

const VT100: &[(Cap, CapValue)] = &[
    (Cap::Acsc, CapValue::Str(ACSC)),
    (Cap::Blink, CapValue::Str("\u{1b}[5m$<2>")),
    (Cap::Bold, CapValue::Str("\u{1b}[1m$<2>")),
    (Cap::Clear, CapValue::Str("\u{1b}[H\u{1b}[J$<50>")),
    (Cap::Csr, CapValue::Str("\u{1b}[%i%p1%d;%p2%dr")),
    (Cap::Cub1, CapValue::Str("\u{8}")),
    (Cap::Cud1, CapValue::Str("\n")),
    (Cap::Cuf1, CapValue::Str("\u{1b}[C$<2>")),
    (Cap::Cup, CapValue::Str("\u{1b}[%i%p1%d;%p2%dH$<5>")),
    (Cap::Cuu1, CapValue::Str("\u{1b}[A$<2>")),
    (Cap::Ed, CapValue::Str("\u{1b}[J$<50>")),
    (Cap::El, CapValue::Str("\u{1b}[K$<3>")),
    (Cap::El1, CapValue::Str("\u{1b}[1K$<3>")),
    (Cap::Enacs, CapValue::Str("\u{1b}(B\u{1b})0")),
    (Cap::Home, CapValue::Str("\u{1b}[H")),
    (Cap::Rev, CapValue::Str("\u{1b}[7m$<2>")),
    (Cap::Ri, CapValue::Str("\u{1b}M$<5>")),
    (Cap::Rmacs, CapValue::Str("\u{f}")),
    (Cap::Rmkx, CapValue::Str("\u{1b}[?1l\u{1b}>")),
    (Cap::Sgr0, CapValue::Str("\u{1b}[m\u{f}$<2>")),
    (Cap::Smacs, CapValue::Str("\u{e}")),
    (Cap::Smkx, CapValue::Str("\u{1b}[?1h\u{1b}=")),
    (Cap::Smso, CapValue::Str("\u{1b}[7m$<2>")),
    (Cap::Smul, CapValue::Str("\u{1b}[4m$<2>")),
];

const LINUX: &[(Cap, CapValue)] = &[
    (Cap::Ax, CapValue::Flag(true)),
    (Cap::Bce, CapValue::Flag(true)),
    (Cap::Colors, CapValue::Number(8)),
    (Cap::Acsc, CapValue::Str(ACSC)),
    (Cap::Blink, CapValue::Str("\u{1b}[5m")),
    (Cap::Bold, CapValue::Str("\u{1b}[1m")),
    (Cap::Civis, CapValue::Str("\u{1b}[?25l\u{1b}[?1c")),
    (Cap::Clear, CapValue::Str("\u{1b}[H\u{1b}[J")),
    (Cap::Cnorm, CapValue::Str("\u{1b}[?25h\u{1b}[?0c")),
    (Cap::Csr, CapValue::Str("\u{1b}[%i%p1%d;%p2%dr")),
    (Cap::Cub, CapValue::Str("\u{1b}[%p1%dD")),
    (Cap::Cub1, CapValue::Str("\u{8}")),
    (Cap::Cud, CapValue::Str("\u{1b}[%p1%dB")),
    (Cap::Cud1, CapValue::Str("\n")),
    (Cap::Cuf, CapValue::Str("\u{1b}[%p1%dC")),
    (Cap::Cuf1, CapValue::Str("\u{1b}[C")),
    (Cap::Cup, CapValue::Str("\u{1b}[%i%p1%d;%p2%dH")),
    (Cap::Cuu, CapValue::Str("\u{1b}[%p1%dA")),
    (Cap::Cuu1, CapValue::Str("\u{1b}[A")),
    (Cap::Dch, CapValue::Str("\u{1b}[%p1%dP")),
    (Cap::Dch1, CapValue::Str("\u{1b}[P")),
    (Cap::Dim, CapValue::Str("\u{1b}[2m")),
    (Cap::Dl, CapValue::Str("\u{1b}[%p1%dM")),
    (Cap::Dl1, CapValue::Str("\u{1b}[M")),
    (Cap::Ech, CapValue::Str("\u{1b}[%p1%dX")),
    (Cap::Ed, CapValue::Str("\u{1b}[J")),
    (Cap::El, CapValue::Str("\u{1b}[K")),
    (Cap::El1, CapValue::Str("\u{1b}[1K")),
    (Cap::Home, CapValue::Str("\u{1b}[H")),
    (Cap::Hpa, CapValue::Str("\u{1b}[%i%p1%dG")),
    (Cap::Ich, CapValue::Str("\u{1b}[%p1%d@")),
    (Cap::Il, CapValue::Str("\u{1b}[%p1%dL")),
    (Cap::Il1, CapValue::Str("\u{1b}[L")),
    (Cap::Op, CapValue::Str("\u{1b}[39;49m")),
    (Cap::Rev, CapValue::Str("\u{1b}[7m")),
    (Cap::Ri, CapValue::Str("\u{1b}M")),
    (Cap::Rmacs, CapValue::Str("\u{1b}[10m")),
    (Cap::Setab, CapValue::Str("\u{1b}[4%p1%dm")),
    (Cap::Setaf, CapValue::Str("\u{1b}[3%p1%dm")),
    (Cap::Sgr0, CapValue::Str("\u{1b}[m\u{f}")),
    (Cap::Smacs, CapValue::Str("\u{1b}[11m")),
    (Cap::Smso, CapValue::Str("\u{1b}[7m")),
    (Cap::Smul, CapValue::Str("\u{1b}[4m")),
    (Cap::Vpa, CapValue::Str("\u{1b}[%i%p1%dd")),
];

const ENTRIES: &[Entry] = &[
    Entry {
        name: "xterm",
        base: None,
        caps: XTERM,
        features: TermFeatures::empty(),
    },
    Entry {
        name: "xterm-256color",
        base: Some("xterm"),
        caps: XTERM_256,
        features: TermFeatures::COLOURS_256,
    },
    Entry {
        name: "screen",
        base: None,
        caps: SCREEN,
        features: TermFeatures::empty(),
    },
    Entry {
        name: "screen-256color",
        base: Some("screen"),
        caps: XTERM_256,
        features: TermFeatures::COLOURS_256,
    },
    Entry {
        name: "tmux",
        base: Some("screen"),
        caps: &[(Cap::Sitm, CapValue::Str("\u{1b}[3m")), (Cap::Ss, CapValue::Str("\u{1b}[%p1%d q")), (Cap::Se, CapValue::Str("\u{1b}[2 q"))],
        features: TermFeatures::empty(),
    },
    Entry {
        name: "tmux-256color",
        base: Some("tmux"),
        caps: XTERM_256,
        features: TermFeatures::COLOURS_256,
    },
    Entry {
        name: "vt100",
        base: None,
        caps: VT100,
        features: TermFeatures::empty(),
    },
    Entry {
        name: "linux",
        base: None,
        caps: LINUX,
        features: TermFeatures::empty(),
    },
];

fn exact(name: &str) -> Option<&'static Entry> {
    ENTRIES.iter().find(|e| e.name == name)
}

/// Find the entry for a terminal name, falling back to its family.
pub fn find(name: &str) -> Option<&'static Entry> {
    if let Some(entry) = exact(name) {
        return Some(entry);
    }
    let family = name.split('-').next().unwrap_or(name);
    if name.contains("256color") {
        if let Some(entry) = exact(&format!("{family}-256color")) {
            return Some(entry);
        }
    }
    exact(family)
}

/// Apply an entry (base chain first) to a capability table.
pub fn apply(entry: &Entry, caps: &mut TermCaps) {
    if let Some(base) = entry.base.and_then(exact) {
        apply(base, caps);
    }
    for &(cap, value) in entry.caps {
        match value {
            CapValue::Flag(f) => caps.set_flag(cap, f),
            CapValue::Number(n) => caps.set_number(cap, n),
            CapValue::Str(s) => caps.set_string(cap, s),
        }
    }
    caps.set_features(caps.features() | entry.features);
}

#[cfg(test)]
mod tests {
    use super::find;

    #[test]
    fn exact_and_family_resolution() {
        assert_eq!(find("xterm").unwrap().name, "xterm");
        assert_eq!(find("xterm-ghostty").unwrap().name, "xterm");
        assert_eq!(find("tmux-256color").unwrap().name, "tmux-256color");
        assert_eq!(find("screen-256color-bce").unwrap().name, "screen-256color");
        assert!(find("adm3a").is_none());
    }
}
