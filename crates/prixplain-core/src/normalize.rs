//! Key normalisation for taxonomy and rating comparison.
//!
//! The classifier emits free-form strings: categories with stray whitespace,
//! ratings in mixed case, labels that are sometimes blank. Every comparison in
//! the engine goes through these helpers so that `" Data Sharing "` and
//! `"Data Sharing"` never end up in different groups.

use serde::{Deserialize, Serialize};

/// Presentation fallback for a blank category.
pub const OTHER_CATEGORY: &str = "Other";

/// Presentation fallback for a blank fine-grained category.
pub const UNMAPPED: &str = "Unmapped";

/// Trim surrounding whitespace. Blank input becomes `""`.
pub fn normalize(s: &str) -> &str {
    s.trim()
}

/// Normalised favorability judgment of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Good,
    Bad,
    Blocker,
    Neutral,
}

impl Rating {
    /// All ratings in badge display order.
    pub const ALL: [Rating; 4] = [Rating::Good, Rating::Bad, Rating::Blocker, Rating::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Bad => "bad",
            Self::Blocker => "blocker",
            Self::Neutral => "neutral",
        }
    }

    /// Capitalised form for badges ("Good 3/12").
    pub fn title(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Bad => "Bad",
            Self::Blocker => "Blocker",
            Self::Neutral => "Neutral",
        }
    }

    /// `bad` or `blocker`.
    pub fn is_adverse(&self) -> bool {
        matches!(self, Self::Bad | Self::Blocker)
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw rating string onto [`Rating`].
///
/// Case-insensitive; anything other than good/bad/blocker, including the
/// empty string, is [`Rating::Neutral`].
pub fn rating_key(rating: &str) -> Rating {
    let r = normalize(rating);
    if r.eq_ignore_ascii_case("good") {
        Rating::Good
    } else if r.eq_ignore_ascii_case("bad") {
        Rating::Bad
    } else if r.eq_ignore_ascii_case("blocker") {
        Rating::Blocker
    } else {
        Rating::Neutral
    }
}

/// Case-insensitive substring test. A blank needle matches everything.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = normalize(needle);
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Category name as shown to users: blank becomes [`OTHER_CATEGORY`].
pub fn display_category(category: &str) -> &str {
    match normalize(category) {
        "" => OTHER_CATEGORY,
        c => c,
    }
}

/// Fine-grained category as shown to users: blank becomes [`UNMAPPED`].
pub fn display_fine_grained(fine_grained: &str) -> &str {
    match normalize(fine_grained) {
        "" => UNMAPPED,
        f => f,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims() {
        assert_eq!(normalize("  Data Sharing \n"), "Data Sharing");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn rating_key_is_case_insensitive() {
        assert_eq!(rating_key("GOOD"), Rating::Good);
        assert_eq!(rating_key(" Bad "), Rating::Bad);
        assert_eq!(rating_key("Blocker"), Rating::Blocker);
    }

    #[test]
    fn unknown_ratings_are_neutral() {
        assert_eq!(rating_key(""), Rating::Neutral);
        assert_eq!(rating_key("  "), Rating::Neutral);
        assert_eq!(rating_key("terrible"), Rating::Neutral);
        assert_eq!(rating_key("NEUTRAL"), Rating::Neutral);
    }

    #[test]
    fn contains_ci_matches() {
        assert!(contains_ci("Shares data with Advertisers", "advertisers"));
        assert!(contains_ci("anything", "   "));
        assert!(contains_ci("", ""));
        assert!(!contains_ci("", "x"));
        assert!(!contains_ci("cookies", "tracking"));
    }

    #[test]
    fn display_fallbacks() {
        assert_eq!(display_category(" "), "Other");
        assert_eq!(display_category(" Data Security"), "Data Security");
        assert_eq!(display_fine_grained(""), "Unmapped");
        assert_eq!(display_fine_grained("Cookies"), "Cookies");
    }

    #[test]
    fn rating_serde_lowercase() {
        let json = serde_json::to_string(&Rating::Blocker).unwrap();
        assert_eq!(json, "\"blocker\"");
        let parsed: Rating = serde_json::from_str("\"good\"").unwrap();
        assert_eq!(parsed, Rating::Good);
    }
}
