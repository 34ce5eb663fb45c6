//! Canonical naming of pairwise Proteus sessions.
//!
//! The engine addresses a session by a single string key. That key is derived
//! from `(domain, user_id, client_id)` by joining the fields with `_`. Fields
//! are escaped first (`\` becomes `\\`, `_` becomes `\_`) so that a field
//! containing the delimiter can never collide with a different triple.
//!
//! Legacy non-federated sessions have an empty domain and are keyed as
//! `user_client`, without a leading delimiter. For fields free of `_` and `\`
//! the key is byte-identical to the historical unescaped format, so existing
//! engine stores keep resolving.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Separator between the fields of a raw session key.
const DELIMITER: char = '_';

/// Escape prefix for delimiter and escape characters inside a field.
const ESCAPE: char = '\\';

/// Identifier of a pairwise cryptographic session.
///
/// # Invariants
///
/// - Two identifiers are equal iff all three fields are equal (exact,
///   case-sensitive comparison)
/// - [`Self::raw_value`] is injective: distinct identifiers never share a raw
///   key
/// - `raw.parse::<ProteusSessionId>()` inverts [`Self::raw_value`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProteusSessionId {
    domain: String,
    user_id: String,
    client_id: String,
}

impl ProteusSessionId {
    /// Create an identifier for a client on a (possibly federated) backend.
    pub fn new(
        domain: impl Into<String>,
        user_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self { domain: domain.into(), user_id: user_id.into(), client_id: client_id.into() }
    }

    /// Create an identifier for a legacy, non-federated context.
    pub fn without_domain(user_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self::new(String::new(), user_id, client_id)
    }

    /// Backend realm. Empty for legacy contexts.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// User owning the remote client.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Remote client (device).
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Canonical key under which the engine stores this session.
    pub fn raw_value(&self) -> String {
        let mut raw = String::with_capacity(
            self.domain.len() + self.user_id.len() + self.client_id.len() + 2,
        );

        if !self.domain.is_empty() {
            escape_into(&mut raw, &self.domain);
            raw.push(DELIMITER);
        }
        escape_into(&mut raw, &self.user_id);
        raw.push(DELIMITER);
        escape_into(&mut raw, &self.client_id);

        raw
    }
}

impl fmt::Display for ProteusSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_value())
    }
}

/// Errors from parsing a raw session key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionIdParseError {
    /// Key did not split into two or three fields
    #[error("expected 2 or 3 fields, found {0}")]
    FieldCount(usize),

    /// Key ended in the middle of an escape sequence
    #[error("dangling escape at end of key")]
    DanglingEscape,

    /// Escape prefix followed by a character that needs no escaping
    #[error("invalid escape sequence: \\{0}")]
    InvalidEscape(char),

    /// Three fields with an empty domain: never produced by `raw_value`
    #[error("empty domain must be omitted, not encoded as an empty field")]
    EmptyDomainField,
}

impl FromStr for ProteusSessionId {
    type Err = SessionIdParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut fields = split_fields(raw)?;

        match fields.len() {
            2 => {
                let client_id = fields.pop().unwrap_or_default();
                let user_id = fields.pop().unwrap_or_default();
                Ok(Self::without_domain(user_id, client_id))
            },
            3 => {
                let client_id = fields.pop().unwrap_or_default();
                let user_id = fields.pop().unwrap_or_default();
                let domain = fields.pop().unwrap_or_default();
                if domain.is_empty() {
                    return Err(SessionIdParseError::EmptyDomainField);
                }
                Ok(Self::new(domain, user_id, client_id))
            },
            n => Err(SessionIdParseError::FieldCount(n)),
        }
    }
}

fn escape_into(out: &mut String, field: &str) {
    for c in field.chars() {
        if c == DELIMITER || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

fn split_fields(raw: &str) -> Result<Vec<String>, SessionIdParseError> {
    let mut fields = Vec::with_capacity(3);
    let mut current = String::new();
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(escaped @ (DELIMITER | ESCAPE)) => current.push(escaped),
                Some(other) => return Err(SessionIdParseError::InvalidEscape(other)),
                None => return Err(SessionIdParseError::DanglingEscape),
            },
            DELIMITER => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn federated_key_joins_all_fields() {
        let id = ProteusSessionId::new("example.com", "3b1c", "a1b2c3");
        assert_eq!(id.raw_value(), "example.com_3b1c_a1b2c3");
    }

    #[test]
    fn legacy_key_omits_domain() {
        let id = ProteusSessionId::without_domain("3b1c", "a1b2c3");
        assert_eq!(id.raw_value(), "3b1c_a1b2c3");
    }

    #[test]
    fn delimiter_inside_field_is_escaped() {
        let a = ProteusSessionId::new("d", "u_x", "c");
        let b = ProteusSessionId::new("d_u", "x", "c");

        assert_eq!(a.raw_value(), r"d_u\_x_c");
        assert_eq!(b.raw_value(), r"d\_u_x_c");
        assert_ne!(a.raw_value(), b.raw_value());
    }

    #[test]
    fn escape_character_is_escaped() {
        let id = ProteusSessionId::new(r"a\", "b", "c");
        assert_eq!(id.raw_value(), r"a\\_b_c");
        assert_eq!(id.raw_value().parse::<ProteusSessionId>(), Ok(id));
    }

    #[test]
    fn parse_inverts_raw_value() {
        let ids = [
            ProteusSessionId::new("wire.com", "user", "client"),
            ProteusSessionId::without_domain("user", "client"),
            ProteusSessionId::without_domain("", ""),
            ProteusSessionId::new("d", "", "c"),
            ProteusSessionId::new("_", "_", "_"),
        ];

        for id in ids {
            assert_eq!(id.raw_value().parse::<ProteusSessionId>(), Ok(id));
        }
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert_eq!("single".parse::<ProteusSessionId>(), Err(SessionIdParseError::FieldCount(1)));
        assert_eq!("a_b_c_d".parse::<ProteusSessionId>(), Err(SessionIdParseError::FieldCount(4)));
        assert_eq!(r"a_b\".parse::<ProteusSessionId>(), Err(SessionIdParseError::DanglingEscape));
        assert_eq!(
            r"a_\b".parse::<ProteusSessionId>(),
            Err(SessionIdParseError::InvalidEscape('b'))
        );
        assert_eq!("_b_c".parse::<ProteusSessionId>(), Err(SessionIdParseError::EmptyDomainField));
    }

    #[test]
    fn equality_is_case_sensitive() {
        assert_ne!(ProteusSessionId::new("D", "u", "c"), ProteusSessionId::new("d", "u", "c"));
    }
}
