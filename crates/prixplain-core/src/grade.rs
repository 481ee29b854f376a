//! Letter grade for a population of rated clauses.
//!
//! Blockers weigh against the policy three times as heavily as a plain bad
//! clause, and any bad clause at all caps the grade at B. Neutral clauses
//! take no part in either the denominator or the balance.
//!
//! The thresholds are a hand-tuned heuristic. They live in [`GradingPolicy`]
//! so callers can override them; the default reproduces the published table.

use serde::{Deserialize, Serialize};

use crate::normalize::Rating;
use crate::record::SentenceRecord;

/// Summary grade, `A` (best) to `E` (worst), or `N/A` with nothing to grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::NotApplicable => "N/A",
        }
    }

    /// Human-readable meaning of the letter.
    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "Excellent",
            Self::B => "Good",
            Self::C => "Mixed",
            Self::D => "Risky",
            Self::E => "Poor",
            Self::NotApplicable => "N/A",
        }
    }

    /// Normalise a free-form grade string. Anything outside A to E is `N/A`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "B" => Self::B,
            "C" => Self::C,
            "D" => Self::D,
            "E" => Self::E,
            _ => Self::NotApplicable,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tally of records per normalised rating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCounts {
    pub good: usize,
    pub bad: usize,
    pub blocker: usize,
    pub neutral: usize,
}

impl RatingCounts {
    pub fn tally<'a, T, I>(rows: I) -> Self
    where
        T: AsRef<SentenceRecord> + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut counts = Self::default();
        for row in rows {
            counts.add(row.as_ref().rating_key());
        }
        counts
    }

    pub fn add(&mut self, rating: Rating) {
        match rating {
            Rating::Good => self.good += 1,
            Rating::Bad => self.bad += 1,
            Rating::Blocker => self.blocker += 1,
            Rating::Neutral => self.neutral += 1,
        }
    }

    pub fn get(&self, rating: Rating) -> usize {
        match rating {
            Rating::Good => self.good,
            Rating::Bad => self.bad,
            Rating::Blocker => self.blocker,
            Rating::Neutral => self.neutral,
        }
    }

    /// Records that count toward the grade (everything but neutral).
    pub fn rated(&self) -> usize {
        self.good + self.bad + self.blocker
    }

    pub fn total(&self) -> usize {
        self.rated() + self.neutral
    }
}

/// Weights and cutoffs of the grading table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingPolicy {
    /// How many good clauses one blocker cancels in the balance.
    pub blocker_weight: i64,
    /// Balance at or below this is an `E`.
    pub poor_balance: i64,
    /// This many blockers or more is at best a `D`.
    pub risky_blocker_count: usize,
    /// Balance below this is at best a `C`.
    pub mixed_balance_below: i64,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            blocker_weight: 3,
            poor_balance: -10,
            risky_blocker_count: 3,
            mixed_balance_below: 5,
        }
    }
}

impl GradingPolicy {
    /// `good - bad - blocker_weight * blocker`, saturating at the `i64` bounds.
    pub fn balance(&self, counts: &RatingCounts) -> i64 {
        let good = i64::try_from(counts.good).unwrap_or(i64::MAX);
        let bad = i64::try_from(counts.bad).unwrap_or(i64::MAX);
        let blocker = i64::try_from(counts.blocker).unwrap_or(i64::MAX);
        good.saturating_sub(bad)
            .saturating_sub(self.blocker_weight.saturating_mul(blocker))
    }

    /// Apply the grading table to a tally. First matching rule wins.
    pub fn grade_counts(&self, counts: &RatingCounts) -> Grade {
        if counts.rated() == 0 {
            return Grade::NotApplicable;
        }

        let balance = self.balance(counts);

        if balance <= self.poor_balance || counts.blocker > counts.good {
            Grade::E
        } else if counts.blocker >= self.risky_blocker_count || counts.bad > counts.good {
            Grade::D
        } else if balance < self.mixed_balance_below {
            Grade::C
        } else if counts.bad > 0 {
            Grade::B
        } else {
            Grade::A
        }
    }
}

/// Grade a population with the default policy.
///
/// Works on raw or merged rows; the caller decides which population it means.
pub fn grade<'a, T, I>(rows: I) -> Grade
where
    T: AsRef<SentenceRecord> + 'a,
    I: IntoIterator<Item = &'a T>,
{
    grade_with(rows, &GradingPolicy::default())
}

/// Grade a population with an explicit policy.
pub fn grade_with<'a, T, I>(rows: I, policy: &GradingPolicy) -> Grade
where
    T: AsRef<SentenceRecord> + 'a,
    I: IntoIterator<Item = &'a T>,
{
    policy.grade_counts(&RatingCounts::tally(rows))
}
