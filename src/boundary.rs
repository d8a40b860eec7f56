//! Multipart boundary tokens and dash-boundary line matching.
//!
//! Every outgoing batch draws a fresh random token so the delimiter cannot
//! collide with payload content, and every changeset draws its own token
//! distinct from the enclosing batch boundary.

use std::fmt;

use uuid::Uuid;

/// A multipart boundary token, without the leading dashes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundaryToken(String);

/// Kind of dash-boundary line found on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryLine {
    /// `--<token>`: another part follows.
    Delimiter,
    /// `--<token>--`: the enclosing multipart body is complete.
    Closing,
}

impl BoundaryToken {
    /// Draw a fresh token for a top-level batch body.
    #[must_use]
    pub fn batch() -> Self { Self(format!("batch_{}", Uuid::new_v4())) }

    /// Draw a fresh token for a nested changeset body.
    #[must_use]
    pub fn changeset() -> Self { Self(format!("changeset_{}", Uuid::new_v4())) }

    /// Wrap a token parsed from a `Content-Type` header.
    pub fn from_value(value: impl Into<String>) -> Self { Self(value.into()) }

    /// The bare token, as it appears in the `boundary=` parameter.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }

    /// The dash-boundary line introducing a part, without line ending.
    #[must_use]
    pub fn delimiter(&self) -> String { format!("--{}", self.0) }

    /// The closing delimiter line, without line ending.
    #[must_use]
    pub fn closing(&self) -> String { format!("--{}--", self.0) }

    /// Classify a raw line as a delimiter or closing delimiter for this
    /// token.
    ///
    /// Trailing line endings and transport padding (spaces, tabs) are
    /// ignored, as permitted by the multipart grammar.
    #[must_use]
    pub fn match_line(&self, line: &[u8]) -> Option<BoundaryLine> {
        let line = trim_boundary_line(line);
        let token = self.0.as_bytes();
        let rest = line.strip_prefix(b"--")?.strip_prefix(token)?;
        match rest {
            b"" => Some(BoundaryLine::Delimiter),
            b"--" => Some(BoundaryLine::Closing),
            _ => None,
        }
    }
}

impl fmt::Display for BoundaryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

fn trim_boundary_line(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., last] = line {
        if matches!(last, b'\r' | b'\n' | b' ' | b'\t') {
            line = rest;
        } else {
            break;
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_tokens_are_unique() {
        let a = BoundaryToken::batch();
        let b = BoundaryToken::batch();
        assert_ne!(a, b);
    }

    #[test]
    fn changeset_token_differs_from_batch_token() {
        let batch = BoundaryToken::batch();
        let changeset = BoundaryToken::changeset();
        assert_ne!(batch.as_str(), changeset.as_str());
        assert!(batch.as_str().starts_with("batch_"));
        assert!(changeset.as_str().starts_with("changeset_"));
    }

    #[test]
    fn match_line_classifies_delimiters() {
        let token = BoundaryToken::from_value("batch_abc");
        assert_eq!(
            token.match_line(b"--batch_abc\r\n"),
            Some(BoundaryLine::Delimiter)
        );
        assert_eq!(
            token.match_line(b"--batch_abc--\r\n"),
            Some(BoundaryLine::Closing)
        );
        assert_eq!(token.match_line(b"--batch_abc-- \t\r\n"), Some(BoundaryLine::Closing));
        assert_eq!(token.match_line(b"--batch_abcd\r\n"), None);
        assert_eq!(token.match_line(b"payload --batch_abc\r\n"), None);
    }
}
