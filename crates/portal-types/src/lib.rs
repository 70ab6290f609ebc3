//! Validated value types shared across the MedPortal crates.
//!
//! Each type checks its invariant once at construction so downstream code can rely on it
//! without re-validating.

/// Number of digits in a mobile number accepted by the login flow.
pub const PHONE_DIGITS: usize = 10;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// Errors that can occur when parsing a phone number.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("phone number must be exactly {PHONE_DIGITS} digits, got {0}")]
    WrongLength(usize),
    #[error("phone number must contain digits only")]
    NonNumeric,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A mobile number made of exactly [`PHONE_DIGITS`] ASCII digits.
///
/// No trimming or normalisation is applied: `" 9876543210"` is rejected, matching what the
/// login screen accepts. Country codes are not part of the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses a phone number, rejecting anything that is not exactly ten ASCII digits.
    pub fn parse(input: &str) -> Result<Self, PhoneError> {
        // Count chars rather than bytes so multi-byte input reports a sensible length.
        let len = input.chars().count();
        if len != PHONE_DIGITS {
            return Err(PhoneError::WrongLength(len));
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PhoneError::NonNumeric);
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for PhoneNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for PhoneNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PhoneNumber::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims() {
        let text = NonEmptyText::new("  Dr. Rao  ").unwrap();
        assert_eq!(text.as_str(), "Dr. Rao");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert!(matches!(NonEmptyText::new("   "), Err(TextError::Empty)));
        assert!(matches!(NonEmptyText::new(""), Err(TextError::Empty)));
    }

    #[test]
    fn test_phone_accepts_ten_digits() {
        let phone = PhoneNumber::parse("9876543210").unwrap();
        assert_eq!(phone.as_str(), "9876543210");
        assert_eq!(phone.to_string(), "9876543210");
    }

    #[test]
    fn test_phone_rejects_wrong_length() {
        assert_eq!(
            PhoneNumber::parse("987654321"),
            Err(PhoneError::WrongLength(9))
        );
        assert_eq!(
            PhoneNumber::parse("98765432100"),
            Err(PhoneError::WrongLength(11))
        );
        assert_eq!(PhoneNumber::parse(""), Err(PhoneError::WrongLength(0)));
    }

    #[test]
    fn test_phone_rejects_non_digits() {
        assert_eq!(PhoneNumber::parse("98765-3210"), Err(PhoneError::NonNumeric));
        assert_eq!(PhoneNumber::parse("987654321a"), Err(PhoneError::NonNumeric));
        assert_eq!(PhoneNumber::parse(" 987654321"), Err(PhoneError::NonNumeric));
        assert_eq!(PhoneNumber::parse("+987654321"), Err(PhoneError::NonNumeric));
    }

    #[test]
    fn test_phone_rejects_unicode_digits() {
        // Arabic-Indic digits are numeric in Unicode but not ASCII.
        let input = "٩٨٧٦٥٤٣٢١٠";
        assert_eq!(PhoneNumber::parse(input), Err(PhoneError::NonNumeric));
    }

    #[test]
    fn test_phone_deserialize_validates() {
        let ok: PhoneNumber = serde_json::from_str("\"9876543210\"").unwrap();
        assert_eq!(ok.as_str(), "9876543210");
        assert!(serde_json::from_str::<PhoneNumber>("\"12345\"").is_err());
    }
}
