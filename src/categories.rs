//! Fixed key → category lookup
//!
//! Membership is case-insensitive. The table is built once on first use.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Name used for the space bar throughout the model and the synthesizer
pub const SPACE_KEY: &str = "space";

/// Named modifier/control keys that make up the `special` category
pub const SPECIAL_KEYS: [&str; 7] = [
    "Shift_L",
    "Shift_R",
    "BackSpace",
    "Tab",
    "Enter",
    "Control_L",
    "Control_R",
];

/// Key category used by the middle tier of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCategory {
    Letters,
    Space,
    Special,
}

impl KeyCategory {
    pub const ALL: [KeyCategory; 3] = [KeyCategory::Letters, KeyCategory::Space, KeyCategory::Special];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyCategory::Letters => "letters",
            KeyCategory::Space => "space",
            KeyCategory::Special => "special",
        }
    }
}

impl fmt::Display for KeyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static! {
    static ref CATEGORY_TABLE: HashMap<String, KeyCategory> = {
        let mut table = HashMap::new();
        for letter in 'a'..='z' {
            table.insert(letter.to_string(), KeyCategory::Letters);
        }
        table.insert(SPACE_KEY.to_string(), KeyCategory::Space);
        for key in SPECIAL_KEYS {
            table.insert(key.to_lowercase(), KeyCategory::Special);
        }
        table
    };
}

/// Category of a key label, ignoring case
pub fn category_of(key: &str) -> Option<KeyCategory> {
    CATEGORY_TABLE.get(&key.to_lowercase()).copied()
}
