//! Sentence-level annotation records exchanged with the upstream classifier.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ValidationError;
use crate::normalize::{Rating, rating_key};

/// One alternative label the classifier considered for a sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopK {
    pub label: String,
    pub prob: f64,
}

/// A classified policy sentence.
///
/// `id` is the sentence's position in the source text and the only source of
/// truth for document order. Taxonomy fields are open-ended strings; compare
/// them through [`crate::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceRecord {
    pub id: i64,
    pub text: String,
    pub label: String,
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sub_category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fine_grained: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_k: Vec<TopK>,
}

impl SentenceRecord {
    /// Normalised rating of this record.
    pub fn rating_key(&self) -> Rating {
        rating_key(&self.rating)
    }
}

impl AsRef<SentenceRecord> for SentenceRecord {
    fn as_ref(&self) -> &SentenceRecord {
        self
    }
}

/// A run of consecutive same-case sentences folded into one display unit.
///
/// Carries every [`SentenceRecord`] field; for runs longer than one the
/// `confidence`, `text` and `top_k` are recomputed over the members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    #[serde(flatten)]
    pub record: SentenceRecord,
    /// Original ids folded into this record, ascending. Never empty.
    pub merged_ids: Vec<i64>,
}

impl MergedRecord {
    /// Wrap a single record as a run of one.
    pub fn single(record: SentenceRecord) -> Self {
        let merged_ids = vec![record.id];
        Self { record, merged_ids }
    }

    pub fn is_merged(&self) -> bool {
        self.merged_ids.len() > 1
    }

    /// `"5"` for a single sentence, `"5–8"` (en dash) for a run.
    pub fn id_range(&self) -> String {
        ids_to_range(&self.merged_ids).unwrap_or_else(|| self.record.id.to_string())
    }
}

impl AsRef<SentenceRecord> for MergedRecord {
    fn as_ref(&self) -> &SentenceRecord {
        &self.record
    }
}

/// Render ids as `min` or `min–max`. `None` for an empty slice.
pub fn ids_to_range(ids: &[i64]) -> Option<String> {
    let min = ids.iter().min()?;
    let max = ids.iter().max()?;
    if ids.len() == 1 {
        Some(min.to_string())
    } else {
        Some(format!("{min}\u{2013}{max}"))
    }
}

/// Response body of the annotation service.
///
/// Only `rows` is required; the service's own `overall_grade` is a
/// placeholder and is kept for reference, not trusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default)]
    pub overall_grade: Option<String>,
    #[serde(default)]
    pub num_sentences: Option<usize>,
    pub rows: Vec<SentenceRecord>,
}

impl AnnotationResponse {
    /// Parse either a bare JSON array of records or a `{ "rows": [...] }`
    /// envelope, then validate the rows.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_str(json)?;
        let response = match value {
            Value::Array(_) => Self {
                rows: serde_json::from_value(value)?,
                ..Self::default()
            },
            Value::Object(_) => serde_json::from_value(value)?,
            _ => return Err(ValidationError::UnexpectedShape),
        };
        validate(&response.rows)?;
        Ok(response)
    }
}

/// Parse and validate records from JSON. See [`AnnotationResponse::from_json`].
pub fn parse_records(json: &str) -> Result<Vec<SentenceRecord>, ValidationError> {
    Ok(AnnotationResponse::from_json(json)?.rows)
}

/// Check a batch for out-of-range confidences and probabilities and for
/// duplicate ids.
pub fn validate(records: &[SentenceRecord]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(records.len());
    for r in records {
        if !in_unit_interval(r.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange {
                id: r.id,
                value: r.confidence,
            });
        }
        if let Some(tk) = r.top_k.iter().find(|tk| !in_unit_interval(tk.prob)) {
            return Err(ValidationError::ProbabilityOutOfRange {
                id: r.id,
                label: tk.label.clone(),
                value: tk.prob,
            });
        }
        if !seen.insert(r.id) {
            return Err(ValidationError::DuplicateId(r.id));
        }
    }
    Ok(())
}

fn in_unit_interval(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
