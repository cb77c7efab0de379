use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::ElementCategory;

static MID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z]+)-([0-9]+)$").expect("mid pattern is a valid regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MnemonicError {
    #[error("mid {0:?} doesn't match <category>-<number>")]
    Format(String),

    #[error("unknown element category {0:?}")]
    UnknownCategory(String),

    #[error("mid {mid:?} is outside of {from}..={to}")]
    OutOfRange { mid: String, from: u32, to: u32 },
}

/// A validated element identifier such as `pv-003`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mnemonic {
    pub raw: String,
    pub category: String,
    pub number: u32,
    suffix: String,
    label: String,
    article: String,
}

impl Mnemonic {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Human readable category name, e.g. "PV-Modul"
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn article(&self) -> &str {
        &self.article
    }

    /// Identifier printed on mails and certificates: the suffix as written
    pub fn display_id(&self) -> String {
        self.suffix.to_uppercase()
    }
}

/// Checks mids against the configured category ranges
#[derive(Debug, Clone)]
pub struct MidValidator {
    categories: BTreeMap<String, ElementCategory>,
}

impl MidValidator {
    pub fn new(categories: BTreeMap<String, ElementCategory>) -> Self {
        Self { categories }
    }

    pub fn parse(&self, mid: &str) -> Result<Mnemonic, MnemonicError> {
        let caps = MID_PATTERN
            .captures(mid)
            .ok_or_else(|| MnemonicError::Format(mid.to_string()))?;

        let category = &caps[1];
        let suffix = &caps[2];

        let range = self
            .categories
            .get(category)
            .ok_or_else(|| MnemonicError::UnknownCategory(category.to_string()))?;

        let out_of_range = || MnemonicError::OutOfRange {
            mid: mid.to_string(),
            from: range.from,
            to: range.to,
        };

        // too many digits for u32 can't be in any configured range
        let number: u32 = suffix.parse().map_err(|_| out_of_range())?;
        if number < range.from || number > range.to {
            return Err(out_of_range());
        }

        Ok(Mnemonic {
            raw: mid.to_string(),
            category: category.to_string(),
            number,
            suffix: suffix.to_string(),
            label: range.label.clone(),
            article: range.article.clone(),
        })
    }
}
