//! Markup fingerprints
//!
//! Every [`Document`](crate::Document) carries the Blake3 digest of its
//! markup. Stored versions keep the hex form next to the markup so a load
//! can tell whether the row was edited behind the store's back.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

const DIGEST_LEN: usize = 32;
const SHORT_LEN: usize = 8;

/// Blake3 digest of a document's markup
///
/// Identical markup always yields the same fingerprint; whitespace and
/// attribute order count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; DIGEST_LEN]);

impl ContentHash {
    /// Fingerprint a markup string
    #[inline]
    #[must_use]
    pub fn of_markup(markup: &str) -> Self {
        Self(*blake3::hash(markup.as_bytes()).as_bytes())
    }

    /// Whether `markup` is exactly what was fingerprinted
    #[must_use]
    pub fn verifies(&self, markup: &str) -> bool {
        *self == Self::of_markup(markup)
    }

    /// Leading hex digits, for logs and version listings
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..SHORT_LEN])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    /// Parse the full 64-digit hex form written by `Display`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DIGEST_LEN * 2 {
            return Err(HashError::Length(s.len()));
        }
        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(s, &mut digest)?;
        Ok(Self(digest))
    }
}

/// A stored fingerprint that cannot be read back
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Not 64 hex digits long
    #[error("fingerprint must be {expected} hex digits, got {0}", expected = DIGEST_LEN * 2)]
    Length(usize),

    /// Non-hex characters
    #[error("fingerprint is not hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_markup_same_fingerprint() {
        let a = ContentHash::of_markup("<p>hello</p>");
        assert_eq!(a, ContentHash::of_markup("<p>hello</p>"));
        assert_ne!(a, ContentHash::of_markup("<p>hello</p> "));
        assert!(a.verifies("<p>hello</p>"));
        assert!(!a.verifies("<p>world</p>"));
    }

    #[test]
    fn stored_form_reads_back() {
        let hash = ContentHash::of_markup("<main>page</main>");
        let stored = hash.to_string();
        assert_eq!(stored.len(), 64);
        assert!(stored.starts_with(&hash.short()));
        assert_eq!(hash.short().len(), 16);
        assert_eq!(stored.parse::<ContentHash>().unwrap(), hash);
    }

    #[test]
    fn malformed_stored_form_is_rejected() {
        assert!(matches!("abcd".parse::<ContentHash>(), Err(HashError::Length(4))));
        let not_hex = "z".repeat(64);
        assert!(matches!(not_hex.parse::<ContentHash>(), Err(HashError::Hex(_))));
    }
}
