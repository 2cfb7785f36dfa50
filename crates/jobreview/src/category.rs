//! The single enumeration of job categories shared by filtering, label
//! selection and ordering.

use serde::{Deserialize, Serialize};

/// Filter key used for records whose label is empty or absent.
pub const UNCATEGORIZED: &str = "uncategorized";

/// A category a reviewer can assign to a job.
///
/// Declaration order is rank order: `Good` ranks highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Good,
    Maybe,
    Bad,
    Irrelevant,
}

impl Category {
    /// Canonical list, in rank order.
    pub const ALL: [Category; 4] = [
        Category::Good,
        Category::Maybe,
        Category::Bad,
        Category::Irrelevant,
    ];

    /// Display name, also the value written to the label column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Good => "Good",
            Category::Maybe => "Maybe",
            Category::Bad => "Bad",
            Category::Irrelevant => "Irrelevant",
        }
    }

    /// Lowercase filter key.
    pub fn key(&self) -> &'static str {
        match self {
            Category::Good => "good",
            Category::Maybe => "maybe",
            Category::Bad => "bad",
            Category::Irrelevant => "irrelevant",
        }
    }

    /// Rank used by predicted-category ordering. Lower ranks sort first.
    pub fn rank(&self) -> u8 {
        match self {
            Category::Good => 0,
            Category::Maybe => 1,
            Category::Bad => 2,
            Category::Irrelevant => 3,
        }
    }

    /// Case-insensitive parse of a category name. Surrounding whitespace is
    /// ignored; anything else unknown yields `None`.
    pub fn parse(value: &str) -> Option<Category> {
        let value = value.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
