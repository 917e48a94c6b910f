//! Capability query.
//!
//! All branching on what the terminal can do flows through [`TermCaps`]: the
//! engine never touches a terminfo database directly, so a fixture table can
//! stand in for a real terminal in tests. Unknown capabilities act as
//! absent; asking for them is never an error.

pub mod builtin;
pub mod params;

use bitflags::bitflags;

use crate::TtyError;
use self::params::Param;

/// Every capability the engine consults, used as an index into the table.
///
/// Names follow the terminfo entries they shadow: `Cub1` is cursor-back-one,
/// `Csr` change-scroll-region, and so on. `Ax`, `Tc`, `Cs`, `Cr`, `Ss`, `Se`
/// and `Ms` are the common user-defined extensions for default-colour reset,
/// direct colour, cursor colour/style, and selection setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Cap {
    // Flags.
    Ax,
    Bce,
    Tc,
    // Numbers.
    Colors,
    // Strings.
    Acsc,
    Blink,
    Bold,
    Civis,
    Clear,
    Cnorm,
    Cr,
    Cs,
    Csr,
    Cub,
    Cub1,
    Cud,
    Cud1,
    Cuf,
    Cuf1,
    Cup,
    Cuu,
    Cuu1,
    Dch,
    Dch1,
    Dim,
    Dl,
    Dl1,
    Ech,
    Ed,
    El,
    El1,
    Enacs,
    Fsl,
    Home,
    Hpa,
    Ich,
    Ich1,
    Il,
    Il1,
    Invis,
    Ms,
    Op,
    Rev,
    Ri,
    Rmacs,
    Rmcup,
    Rmkx,
    Se,
    Setab,
    Setaf,
    Sgr0,
    Sitm,
    Smacs,
    Smcup,
    Smkx,
    Smso,
    Smul,
    Ss,
    Tsl,
    Vpa,
}

pub(crate) const CAP_COUNT: usize = Cap::Vpa as usize + 1;

/// One slot in a capability table.
#[derive(Debug, Clone, Copy)]
pub enum CapValue {
    Flag(bool),
    Number(u32),
    Str(&'static str),
}

bitflags! {
    /// Feature bits derived from the terminal description plus any
    /// user-asserted overrides applied on top of it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TermFeatures: u32 {
        /// The terminal accepts 256-colour SGR parameters.
        const COLOURS_256 = 1;
        /// The terminal accepts 24-bit direct-colour SGR parameters.
        const RGB         = 1 << 1;
        /// The terminal wraps when the last column is written rather than
        /// after; the engine must avoid the bottom-right cell.
        const EARLY_WRAP  = 1 << 2;
        /// The terminal understands synchronized updates (DECSET 2026).
        const SYNC        = 1 << 3;
    }
}

/// A resolved capability table for one terminal type.
#[derive(Debug, Clone)]
pub struct TermCaps {
    name: String,
    entries: [Option<CapValue>; CAP_COUNT],
    features: TermFeatures,
}

impl TermCaps {
    /// An empty table with no capabilities at all. Fixture base for tests
    /// and the starting point for [`for_term`](Self::for_term).
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: [None; CAP_COUNT],
            features: TermFeatures::empty(),
        }
    }

    /// Resolve a builtin description by terminal name.
    ///
    /// Exact names are preferred; otherwise the family before the first `-`
    /// is tried, upgraded to its 256-colour variant when the name asks for
    /// one. A terminal without addressable cursor movement and clear is
    /// unusable and reported as unknown.
    pub fn for_term(name: &str) -> Result<Self, TtyError> {
        let entry = builtin::find(name).ok_or_else(|| TtyError::UnknownTerm {
            name: name.to_string(),
            cause: "no builtin description".to_string(),
        })?;

        let mut caps = Self::empty(name);
        builtin::apply(entry, &mut caps);

        for (required, what) in [(Cap::Cup, "cup"), (Cap::Clear, "clear")] {
            if !caps.has(required) {
                return Err(TtyError::UnknownTerm {
                    name: name.to_string(),
                    cause: format!("terminal does not support {what}"),
                });
            }
        }
        Ok(caps)
    }

    /// The terminal name this table was resolved for.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn features(&self) -> TermFeatures {
        self.features
    }

    /// Apply user-asserted overrides on top of the description.
    ///
    /// Forcing 256 colours swaps in conditional SGR colour strings and the
    /// default-colour reset flag; forcing RGB additionally sets the direct
    /// colour flag the attribute engine keys on.
    pub fn apply_features(&mut self, features: TermFeatures) {
        self.features |= features;
        if features.contains(TermFeatures::COLOURS_256) {
            self.set_number(Cap::Colors, 256);
            self.set_string(Cap::Setaf, builtin::SETAF_256);
            self.set_string(Cap::Setab, builtin::SETAB_256);
            self.set_flag(Cap::Ax, true);
        }
        if features.contains(TermFeatures::RGB) {
            self.set_flag(Cap::Tc, true);
        }
    }

    /// Whether the capability is present at all.
    pub fn has(&self, cap: Cap) -> bool {
        match self.entries[cap as usize] {
            Some(CapValue::Flag(f)) => f,
            Some(_) => true,
            None => false,
        }
    }

    /// Boolean capability; absent means false.
    pub fn flag(&self, cap: Cap) -> bool {
        matches!(self.entries[cap as usize], Some(CapValue::Flag(true)))
    }

    /// Numeric capability; absent means `None`.
    pub fn number(&self, cap: Cap) -> Option<u32> {
        match self.entries[cap as usize] {
            Some(CapValue::Number(n)) => Some(n),
            _ => None,
        }
    }

    /// Declared colour count, defaulting to none at all.
    pub fn colours(&self) -> u32 {
        self.number(Cap::Colors).unwrap_or(0)
    }

    /// The raw, unexpanded string capability.
    pub fn raw_string(&self, cap: Cap) -> Option<&'static str> {
        match self.entries[cap as usize] {
            Some(CapValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Expand a string capability with explicit parameters.
    pub fn expand(&self, cap: Cap, args: &[Param<'_>]) -> Option<Vec<u8>> {
        self.raw_string(cap).map(|s| params::expand(s, args))
    }

    /// Expand a parameterless string capability.
    pub fn string(&self, cap: Cap) -> Option<Vec<u8>> {
        self.expand(cap, &[])
    }

    /// Expand with one numeric parameter.
    pub fn string1(&self, cap: Cap, a: u32) -> Option<Vec<u8>> {
        self.expand(cap, &[Param::Num(i64::from(a))])
    }

    /// Expand with two numeric parameters.
    pub fn string2(&self, cap: Cap, a: u32, b: u32) -> Option<Vec<u8>> {
        self.expand(cap, &[Param::Num(i64::from(a)), Param::Num(i64::from(b))])
    }

    /// Expand with one string parameter.
    pub fn string_s(&self, cap: Cap, s: &str) -> Option<Vec<u8>> {
        self.expand(cap, &[Param::Str(s)])
    }

    /// Expand with two string parameters.
    pub fn string_ss(&self, cap: Cap, a: &str, b: &str) -> Option<Vec<u8>> {
        self.expand(cap, &[Param::Str(a), Param::Str(b)])
    }

    pub fn set_flag(&mut self, cap: Cap, value: bool) {
        self.entries[cap as usize] = Some(CapValue::Flag(value));
    }

    pub fn set_number(&mut self, cap: Cap, value: u32) {
        self.entries[cap as usize] = Some(CapValue::Number(value));
    }

    pub fn set_string(&mut self, cap: Cap, value: &'static str) {
        self.entries[cap as usize] = Some(CapValue::Str(value));
    }

    pub fn set_features(&mut self, features: TermFeatures) {
        self.features = features;
    }

    /// Remove a capability. Fixtures use this to model reduced terminals.
    pub fn clear(&mut self, cap: Cap) {
        self.entries[cap as usize] = None;
    }
}
