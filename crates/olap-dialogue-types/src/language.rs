//! Supported dialogue languages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of a dialogue session.
///
/// Locales are accepted in the usual spellings (`en`, `en-US`, `de_AT`);
/// only the primary subtag is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for locales other than English or German.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedLocale(pub String);

impl fmt::Display for UnsupportedLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported locale '{}', expected 'en' or 'de'", self.0)
    }
}

impl std::error::Error for UnsupportedLocale {}

impl FromStr for Language {
    type Err = UnsupportedLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Ok(Language::En),
            "de" => Ok(Language::De),
            _ => Err(UnsupportedLocale(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locales() {
        assert_eq!("en".parse::<Language>().unwrap(), Language::En);
        assert_eq!("de-AT".parse::<Language>().unwrap(), Language::De);
        assert_eq!("EN_gb".parse::<Language>().unwrap(), Language::En);
        assert!("fr".parse::<Language>().is_err());
        assert!("".parse::<Language>().is_err());
    }
}
