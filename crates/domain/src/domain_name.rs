//! Validated domain names.
//!
//! A [`DomainName`] keeps the caller's spelling but compares and hashes
//! case-insensitively. Construction enforces the RFC 1035 limits: labels of
//! 1-63 bytes and an encoded length of at most 255 bytes.

use crate::errors::DomainError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

pub const MAX_LABEL_LEN: usize = 63;
pub const MAX_ENCODED_LEN: usize = 255;

#[derive(Debug, Clone, Eq)]
pub struct DomainName {
    name: String,
}

impl DomainName {
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidQuery("domain name is empty".into()));
        }
        if trimmed == "." {
            return Ok(Self::root());
        }

        let name = trimmed.strip_suffix('.').unwrap_or(trimmed);
        let mut encoded_len = 1;
        for label in name.split('.') {
            validate_label(label, trimmed)?;
            encoded_len += label.len() + 1;
        }

        if encoded_len > MAX_ENCODED_LEN {
            return Err(DomainError::InvalidQuery(format!(
                "domain '{}' encodes to {} bytes (max {})",
                trimmed, encoded_len, MAX_ENCODED_LEN
            )));
        }

        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn root() -> Self {
        Self {
            name: String::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// The name as given, without a trailing dot. Empty for the root.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Lowercased form used for cache keys and comparisons.
    pub fn normalized(&self) -> String {
        self.name.to_ascii_lowercase()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.name.split('.').filter(|l| !l.is_empty())
    }

    pub fn encoded_len(&self) -> usize {
        1 + self.labels().map(|l| l.len() + 1).sum::<usize>()
    }
}

fn validate_label(label: &str, whole: &str) -> Result<(), DomainError> {
    if label.is_empty() {
        return Err(DomainError::InvalidQuery(format!(
            "domain '{}' contains an empty label",
            whole
        )));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(DomainError::InvalidQuery(format!(
            "label '{}' is {} bytes (max {})",
            label,
            label.len(),
            MAX_LABEL_LEN
        )));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(DomainError::InvalidQuery(format!(
            "label '{}' starts or ends with a hyphen",
            label
        )));
    }
    if let Some(bad) = label
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(DomainError::InvalidQuery(format!(
            "domain '{}' contains invalid character '{}'",
            whole, bad
        )));
    }
    Ok(())
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.name.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl FromStr for DomainName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_dot_is_stripped() {
        let name = DomainName::parse("Example.COM.").unwrap();
        assert_eq!(name.as_str(), "Example.COM");
        assert_eq!(name.normalized(), "example.com");
    }

    #[test]
    fn test_encoded_len_counts_prefixes_and_terminator() {
        let name = DomainName::parse("www.example.com").unwrap();
        assert_eq!(name.encoded_len(), 17);
        assert_eq!(DomainName::root().encoded_len(), 1);
    }
}
