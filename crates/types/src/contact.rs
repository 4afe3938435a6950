//! Contact identifiers used to match user accounts against patient records.
//!
//! Matching across the auth and clinic stores relies on both sides storing these values in the
//! same canonical form:
//! - email addresses are trimmed and lowercased;
//! - phone numbers are reduced to digits in national (leading `0`) form.

use crate::TextError;
use std::fmt;

/// A trimmed, lowercased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses and canonicalises an email address.
    ///
    /// Only a light plausibility check is made: one `@`, a non-empty local part and a dotted
    /// domain, no whitespace.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let lowered = input.as_ref().trim().to_lowercase();
        if lowered.is_empty() {
            return Err(TextError::Empty);
        }

        let invalid = || TextError::InvalidEmail(lowered.clone());

        if lowered.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let (local, domain) = lowered.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        let dotted = domain
            .split('.')
            .collect::<Vec<_>>();
        if dotted.len() < 2 || dotted.iter().any(|part| part.is_empty()) {
            return Err(invalid());
        }

        Ok(Self(lowered))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A phone number in canonical national form.
///
/// Normalisation rules:
/// 1. strip every non-digit character;
/// 2. a leading country code `62` is replaced by `0`;
/// 3. otherwise a leading `0` is ensured.
///
/// So `+6281234567890`, `6281234567890` and `0812-3456-7890` all become `081234567890`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let raw = input.as_ref();
        if raw.trim().is_empty() {
            return Err(TextError::Empty);
        }
        Self::normalise(raw)
            .map(Self)
            .ok_or_else(|| TextError::InvalidPhone(raw.trim().to_owned()))
    }

    /// Applies the normalisation rules, returning `None` when no digits remain.
    pub fn normalise(raw: &str) -> Option<String> {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }

        let normalised = if let Some(rest) = digits.strip_prefix("62") {
            format!("0{rest}")
        } else if digits.starts_with('0') {
            digits
        } else {
            format!("0{digits}")
        };
        Some(normalised)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the canonical digits contain `needle`'s digits.
    pub fn contains_digits(&self, needle: &str) -> bool {
        let digits: String = needle.chars().filter(char::is_ascii_digit).collect();
        !digits.is_empty() && self.0.contains(&digits)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

macro_rules! string_serde {
    ($ty:ident) => {
        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $ty::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(EmailAddress);
string_serde!(PhoneNumber);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_variants_normalise_to_national_form() {
        for input in ["+6281234567890", "081234567890", "6281234567890"] {
            assert_eq!(PhoneNumber::parse(input).unwrap().as_str(), "081234567890");
        }
    }

    #[test]
    fn test_phone_strips_punctuation() {
        let phone = PhoneNumber::parse("(0812) 3456-7890").unwrap();
        assert_eq!(phone.as_str(), "081234567890");
    }

    #[test]
    fn test_phone_without_prefix_gets_leading_zero() {
        let phone = PhoneNumber::parse("81234567890").unwrap();
        assert_eq!(phone.as_str(), "081234567890");
    }

    #[test]
    fn test_phone_rejects_non_digits() {
        assert!(matches!(
            PhoneNumber::parse("call me"),
            Err(TextError::InvalidPhone(_))
        ));
        assert_eq!(PhoneNumber::parse(" "), Err(TextError::Empty));
    }

    #[test]
    fn test_phone_contains_digits() {
        let phone = PhoneNumber::parse("081234567890").unwrap();
        assert!(phone.contains_digits("3456"));
        assert!(!phone.contains_digits("abc"));
    }

    #[test]
    fn test_email_is_lowercased_and_trimmed() {
        let email = EmailAddress::parse("  Budi@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "budi@example.com");
    }

    #[test]
    fn test_email_rejects_malformed() {
        for input in ["budi", "@example.com", "budi@", "budi@example", "bu di@example.com"] {
            assert!(EmailAddress::parse(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn test_phone_deserialises_normalised() {
        let phone: PhoneNumber = serde_json::from_str("\"+62 812 3456 7890\"").unwrap();
        assert_eq!(phone.as_str(), "081234567890");
    }
}
