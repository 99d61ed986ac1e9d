//! Canonical character identifiers.
//!
//! Every input token (a literal glyph, a 4-digit hex or a 5-digit
//! zero-padded hex) normalizes to one immutable [`CharacterCode`]. All hex
//! derivations (4-digit, 5-digit, shard prefix) live here so call sites
//! never re-pad or re-split by hand.

use crate::error::PipelineError;

/// Canonical identifier for one studied character.
///
/// Derived once from an input token and never mutated. The code point is
/// the single source of truth; `hex4`/`hex5`/`shard` are derivations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacterCode {
    codepoint: u32,
    glyph: Option<char>,
}

impl CharacterCode {
    /// Normalize an input token into a canonical code.
    ///
    /// A token matching `^[0-9a-fA-F]{4,6}$` is treated as a hex code
    /// point; anything else is treated as a literal glyph whose first
    /// scalar value is taken.
    pub fn normalize(token: &str) -> Result<Self, PipelineError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(invalid(token, "empty token"));
        }

        let codepoint = if is_hex_token(token) {
            // Cannot fail: is_hex_token guarantees 4-6 hex digits
            u32::from_str_radix(token, 16).map_err(|e| invalid(token, &e.to_string()))?
        } else {
            let mut chars = token.chars();
            let first = chars.next().ok_or_else(|| invalid(token, "empty token"))?;
            if chars.next().is_some() {
                return Err(invalid(token, "expected a single character or a hex code"));
            }
            first as u32
        };

        let glyph = char::from_u32(codepoint);
        match glyph {
            None => return Err(invalid(token, "not a Unicode scalar value")),
            Some(c) if c.is_control() => {
                return Err(invalid(token, "control code point"));
            }
            Some(c) if c.is_whitespace() => {
                return Err(invalid(token, "non-printable code point"));
            }
            Some(_) => {}
        }

        Ok(Self { codepoint, glyph })
    }

    /// Unicode scalar value.
    pub fn codepoint(&self) -> u32 {
        self.codepoint
    }

    /// The literal character, when the code point is a valid scalar.
    pub fn glyph(&self) -> Option<char> {
        self.glyph
    }

    /// Lowercase hex, zero-padded to at least 4 digits.
    ///
    /// This is the canonical key for cache files, output filenames and
    /// index entries.
    pub fn hex4(&self) -> String {
        format!("{:04x}", self.codepoint)
    }

    /// Lowercase hex, zero-padded to at least 5 digits (KanjiVG filenames).
    pub fn hex5(&self) -> String {
        format!("{:05x}", self.codepoint)
    }

    /// Directory shard: the first 3 digits of `hex5`.
    ///
    /// Sharded mirrors store `{shard}/{hex5}.svg`.
    pub fn shard(&self) -> String {
        self.hex5()[..3].to_string()
    }
}

impl std::fmt::Display for CharacterCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.glyph {
            Some(g) => write!(f, "{} ({})", self.hex4(), g),
            None => f.write_str(&self.hex4()),
        }
    }
}

/// Check whether a token is a 4-6 digit hex code.
fn is_hex_token(token: &str) -> bool {
    (4..=6).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_hexdigit())
}

fn invalid(token: &str, reason: &str) -> PipelineError {
    PipelineError::InvalidToken {
        token: token.to_string(),
        reason: reason.to_string(),
    }
}
