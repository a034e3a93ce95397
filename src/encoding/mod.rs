//! Static category encodings used as model inputs.
//!
//! The codes are the ones the model was trained with. They are fixed literals
//! and must never be renumbered.

use std::collections::HashMap;
use thiserror::Error;

/// Brand codes as used during training.
pub const BRAND_CODES: [(&str, u32); 32] = [
    ("Ambassador", 20),
    ("Ashok", 27),
    ("Audi", 10),
    ("BMW", 11),
    ("Chevrolet", 29),
    ("Daewoo", 9),
    ("Datsun", 26),
    ("Fiat", 19),
    ("Force", 28),
    ("Ford", 4),
    ("Honda", 7),
    ("Hyundai", 6),
    ("Isuzu", 14),
    ("Jaguar", 21),
    ("Jeep", 22),
    ("Kia", 2),
    ("Land", 30),
    ("Lexus", 8),
    ("MG", 0),
    ("Mahindra", 1),
    ("Maruti", 12),
    ("Mercedes-Benz", 24),
    ("Mitsubishi", 15),
    ("Nissan", 5),
    ("Opel", 16),
    ("Peugot", 3),
    ("Renault", 13),
    ("Skoda", 18),
    ("Tata", 23),
    ("Toyota", 17),
    ("Volkswagen", 25),
    ("Volvo", 31),
];

pub const TRANSMISSION_CODES: [(&str, u32); 2] = [("Manual", 1), ("Automatic", 0)];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Duplicate category '{category}' in {table} table")]
    DuplicateCategory { table: String, category: String },

    #[error("Code {code} assigned twice in {table} table")]
    DuplicateCode { table: String, code: u32 },
}

/// Immutable mapping from category name to integer code.
#[derive(Debug, Clone)]
pub struct EncodingTable {
    name: String,
    codes: HashMap<String, u32>,
}

impl EncodingTable {
    /// Build a table, rejecting repeated categories or codes.
    pub fn new<'a, I>(name: &str, entries: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let mut codes = HashMap::new();
        let mut seen_codes = HashMap::new();

        for (category, code) in entries {
            if seen_codes.insert(code, category).is_some() {
                return Err(EncodingError::DuplicateCode {
                    table: name.to_string(),
                    code,
                });
            }
            if codes.insert(category.to_string(), code).is_some() {
                return Err(EncodingError::DuplicateCategory {
                    table: name.to_string(),
                    category: category.to_string(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            codes,
        })
    }

    /// Brand table built from [`BRAND_CODES`].
    pub fn brands() -> Result<Self, EncodingError> {
        Self::new("brand", BRAND_CODES)
    }

    /// Transmission table built from [`TRANSMISSION_CODES`].
    pub fn transmissions() -> Result<Self, EncodingError> {
        Self::new("transmission", TRANSMISSION_CODES)
    }

    /// Exact, case-sensitive lookup. Callers trim input beforehand.
    pub fn lookup(&self, category: &str) -> Option<u32> {
        self.codes.get(category).copied()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Category names in alphabetical order.
    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.codes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `(category, code)` pairs in alphabetical order of category.
    pub fn entries(&self) -> Vec<(&str, u32)> {
        self.categories()
            .into_iter()
            .map(|name| (name, self.codes[name]))
            .collect()
    }
}
