//! Alternate character set translation.
//!
//! Line-drawing cells store the VT100 ACS names (`q` for a horizontal line,
//! `x` for vertical, corners `jklm`, …). On a UTF-8 terminal they are
//! rendered directly as Unicode glyphs and the alternate charset is never
//! entered; otherwise the terminal's `acsc` pairs say which byte to send
//! while SMACS is active.

/// Unicode replacement for an ACS name, for UTF-8 terminals.
pub fn unicode(ch: u8) -> Option<&'static str> {
    Some(match ch {
        b'+' => "\u{2192}",
        b',' => "\u{2190}",
        b'-' => "\u{2191}",
        b'.' => "\u{2193}",
        b'0' => "\u{25ae}",
        b'`' => "\u{25c6}",
        b'a' => "\u{2592}",
        b'f' => "\u{b0}",
        b'g' => "\u{b1}",
        b'h' => "\u{2592}",
        b'i' => "\u{2603}",
        b'j' => "\u{2518}",
        b'k' => "\u{2510}",
        b'l' => "\u{250c}",
        b'm' => "\u{2514}",
        b'n' => "\u{253c}",
        b'o' => "\u{23ba}",
        b'p' => "\u{23bb}",
        b'q' => "\u{2500}",
        b'r' => "\u{23bc}",
        b's' => "\u{23bd}",
        b't' => "\u{251c}",
        b'u' => "\u{2524}",
        b'v' => "\u{2534}",
        b'w' => "\u{252c}",
        b'x' => "\u{2502}",
        b'y' => "\u{2264}",
        b'z' => "\u{2265}",
        b'{' => "\u{3c0}",
        b'|' => "\u{2260}",
        b'}' => "\u{a3}",
        b'~' => "\u{b7}",
        _ => return None,
    })
}

/// Per-terminal ACS name → output byte map, parsed from the `acsc` pairs.
#[derive(Debug, Clone)]
pub struct AcsMap {
    map: [Option<u8>; 128],
}

impl AcsMap {
    /// Parse an `acsc` capability string of name/output byte pairs.
    pub fn from_acsc(acsc: &str) -> Self {
        let mut map = [None; 128];
        let mut bytes = acsc.bytes();
        while let (Some(name), Some(output)) = (bytes.next(), bytes.next()) {
            if (name as usize) < 128 {
                map[name as usize] = Some(output);
            }
        }
        Self { map }
    }

    /// An empty map for terminals without `acsc`.
    pub fn empty() -> Self {
        Self { map: [None; 128] }
    }

    /// The byte to emit for an ACS name while SMACS is active.
    pub fn get(&self, ch: u8) -> Option<u8> {
        if (ch as usize) < 128 { self.map[ch as usize] } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::{AcsMap, unicode};

    #[test]
    fn standard_pairs_map_to_themselves() {
        let map = AcsMap::from_acsc(
            "``aaffggiijjkkllmmnnooppqqrrssttuuvvwwxxyyzz{{||}}~~",
        );
        assert_eq!(map.get(b'q'), Some(b'q'));
        assert_eq!(map.get(b'x'), Some(b'x'));
        assert_eq!(map.get(b'Q'), None);
    }

    #[test]
    fn remapped_pairs() {
        // A terminal that draws horizontal lines with 'D'.
        let map = AcsMap::from_acsc("qD");
        assert_eq!(map.get(b'q'), Some(b'D'));
    }

    #[test]
    fn unicode_line_glyphs() {
        assert_eq!(unicode(b'q'), Some("─"));
        assert_eq!(unicode(b'x'), Some("│"));
        assert_eq!(unicode(b'Z'), None);
    }
}
