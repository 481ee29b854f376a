//! Consecutive-run merging.
//!
//! Adjacent sentences (in `id` order) that carry the same classification are
//! the same finding repeated across several sentences. They are folded into a
//! single [`MergedRecord`] so the reader sees one card per finding.

use std::collections::HashMap;

use crate::normalize::{Rating, normalize, rating_key};
use crate::record::{MergedRecord, SentenceRecord, TopK};

/// Default number of alternative labels kept on a merged record.
pub const DEFAULT_TOP_K_LIMIT: usize = 5;

/// Everything that must match for two neighbours to be "the same case".
#[derive(Debug, PartialEq, Eq)]
struct CaseKey<'a> {
    label: &'a str,
    category: &'a str,
    sub_category: &'a str,
    fine_grained: &'a str,
    rating: Rating,
    action: &'a str,
}

impl<'a> CaseKey<'a> {
    fn of(r: &'a SentenceRecord) -> Self {
        Self {
            label: normalize(&r.label),
            category: normalize(&r.category),
            sub_category: normalize(&r.sub_category),
            fine_grained: normalize(&r.fine_grained),
            rating: rating_key(&r.rating),
            action: normalize(&r.action),
        }
    }
}

/// Whether two records would be folded together if adjacent.
pub fn same_case(a: &SentenceRecord, b: &SentenceRecord) -> bool {
    CaseKey::of(a) == CaseKey::of(b)
}

/// Fold maximal runs of adjacent same-case records.
///
/// Input is sorted by `id` first, so callers need not pre-sort. Runs of one
/// pass through unchanged; longer runs are consolidated by [`consolidate`].
pub fn merge_consecutive<'a, I>(records: I, top_k_limit: usize) -> Vec<MergedRecord>
where
    I: IntoIterator<Item = &'a SentenceRecord>,
{
    let mut ordered: Vec<&SentenceRecord> = records.into_iter().collect();
    ordered.sort_by_key(|r| r.id);

    let mut merged = Vec::new();
    let mut cluster: Vec<&SentenceRecord> = Vec::new();

    for r in ordered {
        if let Some(prev) = cluster.last()
            && !same_case(prev, r)
        {
            merged.push(consolidate(&cluster, top_k_limit));
            cluster.clear();
        }
        cluster.push(r);
    }
    if !cluster.is_empty() {
        merged.push(consolidate(&cluster, top_k_limit));
    }

    merged
}

/// Consolidate one non-empty run of same-case records.
///
/// - `id` and the taxonomy fields come from the first member.
/// - `confidence` is the unweighted mean.
/// - `text` joins the members' non-blank trimmed texts with `\n`.
/// - `top_k` is the per-label average, see [`average_top_k`].
fn consolidate(cluster: &[&SentenceRecord], top_k_limit: usize) -> MergedRecord {
    let base = cluster[0];
    if cluster.len() == 1 {
        return MergedRecord::single(base.clone());
    }

    let merged_ids: Vec<i64> = cluster.iter().map(|r| r.id).collect();
    let confidence =
        cluster.iter().map(|r| r.confidence).sum::<f64>() / cluster.len() as f64;
    let text = cluster
        .iter()
        .map(|r| normalize(&r.text))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    MergedRecord {
        record: SentenceRecord {
            confidence,
            text,
            top_k: average_top_k(cluster.iter().copied(), top_k_limit),
            ..base.clone()
        },
        merged_ids,
    }
}

/// Average each label's probability over the members that list it.
///
/// A label missing from a member contributes nothing to that label (not a
/// zero); a label listed twice by one member counts twice. Labels are
/// compared trimmed; blank labels are skipped. Output is
/// sorted by descending probability, ties in first-seen order, and truncated
/// to `limit`.
pub fn average_top_k<'a, I>(records: I, limit: usize) -> Vec<TopK>
where
    I: IntoIterator<Item = &'a SentenceRecord>,
{
    // label -> (sum, n); `order` keeps first-seen order for stable ties.
    let mut accum: HashMap<&str, (f64, usize)> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for r in records {
        for tk in &r.top_k {
            let label = normalize(&tk.label);
            if label.is_empty() {
                continue;
            }
            let entry = accum.entry(label).or_insert_with(|| {
                order.push(label);
                (0.0, 0)
            });
            entry.0 += tk.prob;
            entry.1 += 1;
        }
    }

    let mut averaged: Vec<TopK> = order
        .into_iter()
        .map(|label| {
            let (sum, n) = accum[label];
            TopK {
                label: label.to_string(),
                prob: sum / n as f64,
            }
        })
        .collect();

    averaged.sort_by(|a, b| b.prob.partial_cmp(&a.prob).unwrap_or(std::cmp::Ordering::Equal));
    averaged.truncate(limit);
    averaged
}

/// Expand merged rows back into their member records, in `merged_ids` order.
///
/// Ids with no counterpart in `originals` are skipped.
pub fn explode<'a>(
    merged: &[MergedRecord],
    originals: &'a [SentenceRecord],
) -> Vec<&'a SentenceRecord> {
    let by_id: HashMap<i64, &SentenceRecord> = originals.iter().map(|r| (r.id, r)).collect();
    merged
        .iter()
        .flat_map(|m| m.merged_ids.iter())
        .filter_map(|id| by_id.get(id).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, label: &str, rating: &str, confidence: f64) -> SentenceRecord {
        SentenceRecord {
            id,
            text: format!("Sentence {id}."),
            label: label.into(),
            confidence,
            category: "Data Sharing".into(),
            sub_category: "Advertising".into(),
            fine_grained: "Ad networks".into(),
            rating: rating.into(),
            action: "Opt out.".into(),
            top_k: vec![],
        }
    }

    fn tk(label: &str, prob: f64) -> TopK {
        TopK {
            label: label.into(),
            prob,
        }
    }

    #[test]
    fn empty_input_yields_nothing() {
        let records: Vec<SentenceRecord> = vec![];
        assert!(merge_consecutive(&records, DEFAULT_TOP_K_LIMIT).is_empty());
    }

    #[test]
    fn single_record_passes_through() {
        let records = vec![rec(4, "Shares with advertisers", "bad", 0.8)];
        let merged = merge_consecutive(&records, DEFAULT_TOP_K_LIMIT);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].merged_ids, vec![4]);
        assert_eq!(merged[0].record, records[0]);
    }

    #[test]
    fn three_identical_neighbours_merge() {
        let records = vec![
            rec(1, "Shares with advertisers", "bad", 0.8),
            rec(2, "Shares with advertisers", "bad", 0.9),
            rec(3, "Shares with advertisers", "bad", 0.7),
        ];
        let merged = merge_consecutive(&records, DEFAULT_TOP_K_LIMIT);
        assert_eq!(merged.len(), 1);
        let m = &merged[0];
        assert_eq!(m.merged_ids, vec![1, 2, 3]);
        assert_eq!(m.record.id, 1);
        assert!((m.record.confidence - 0.8).abs() < 1e-9);
        assert_eq!(m.record.text, "Sentence 1.\nSentence 2.\nSentence 3.");
    }

    #[test]
    fn key_change_splits_runs() {
        let records = vec![
            rec(1, "A", "bad", 0.8),
            rec(2, "A", "bad", 0.8),
            rec(3, "B", "bad", 0.8),
            rec(4, "A", "bad", 0.8),
        ];
        let merged = merge_consecutive(&records, DEFAULT_TOP_K_LIMIT);
        let ids: Vec<Vec<i64>> = merged.iter().map(|m| m.merged_ids.clone()).collect();
        assert_eq!(ids, vec![vec![1, 2], vec![3], vec![4]]);
    }

    #[test]
    fn rating_difference_splits_runs() {
        let records = vec![rec(1, "A", "bad", 0.8), rec(2, "A", "blocker", 0.8)];
        assert_eq!(merge_consecutive(&records, DEFAULT_TOP_K_LIMIT).len(), 2);
    }

    #[test]
    fn whitespace_and_case_do_not_split() {
        let mut b = rec(2, "  A ", "BAD", 0.6);
        b.category = " Data Sharing ".into();
        let records = vec![rec(1, "A", "bad", 0.8), b];
        let merged = merge_consecutive(&records, DEFAULT_TOP_K_LIMIT);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].merged_ids, vec![1, 2]);
    }

    #[test]
    fn unknown_ratings_merge_with_neutral() {
        let records = vec![rec(1, "A", "neutral", 0.8), rec(2, "A", "", 0.8)];
        assert_eq!(merge_consecutive(&records, DEFAULT_TOP_K_LIMIT).len(), 1);
    }

    #[test]
    fn empty_taxonomy_is_a_valid_key() {
        let mut a = rec(1, "A", "good", 0.8);
        let mut b = rec(2, "A", "good", 0.8);
        a.category.clear();
        b.category = "   ".into();
        assert_eq!(merge_consecutive(&[a, b], DEFAULT_TOP_K_LIMIT).len(), 1);
    }

    #[test]
    fn input_is_sorted_by_id() {
        let records = vec![
            rec(3, "A", "bad", 0.8),
            rec(1, "A", "bad", 0.8),
            rec(2, "B", "bad", 0.8),
        ];
        let merged = merge_consecutive(&records, DEFAULT_TOP_K_LIMIT);
        let ids: Vec<Vec<i64>> = merged.iter().map(|m| m.merged_ids.clone()).collect();
        assert_eq!(ids, vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn blank_texts_are_dropped_from_join() {
        let mut b = rec(2, "A", "bad", 0.8);
        b.text = "   ".into();
        let mut c = rec(3, "A", "bad", 0.8);
        c.text = "  Third.  ".into();
        let merged = merge_consecutive(&[rec(1, "A", "bad", 0.8), b, c], DEFAULT_TOP_K_LIMIT);
        assert_eq!(merged[0].record.text, "Sentence 1.\nThird.");
    }

    #[test]
    fn top_k_averages_per_label() {
        let mut a = rec(1, "A", "bad", 0.8);
        a.top_k = vec![tk("x", 0.6), tk("y", 0.4)];
        let mut b = rec(2, "A", "bad", 0.8);
        b.top_k = vec![tk("x", 0.8)];

        let merged = merge_consecutive(&[a, b], DEFAULT_TOP_K_LIMIT);
        let top = &merged[0].record.top_k;
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].label, "x");
        assert!((top[0].prob - 0.7).abs() < 1e-9);
        // "y" appears in one member only: averaged over that one, not two.
        assert_eq!(top[1].label, "y");
        assert!((top[1].prob - 0.4).abs() < 1e-9);
    }

    #[test]
    fn duplicate_labels_count_per_occurrence() {
        let mut a = rec(1, "A", "bad", 0.8);
        a.top_k = vec![tk("x", 0.9), tk(" x", 0.3)];
        let mut b = rec(2, "A", "bad", 0.8);
        b.top_k = vec![tk("x", 0.6)];

        let merged = merge_consecutive(&[a, b], DEFAULT_TOP_K_LIMIT);
        let top = &merged[0].record.top_k;
        assert_eq!(top.len(), 1);
        // (0.9 + 0.3 + 0.6) / 3, not the mean of per-member means.
        assert!((top[0].prob - 0.6).abs() < 1e-9);
    }

    #[test]
    fn top_k_sorted_and_truncated() {
        let mut a = rec(1, "A", "bad", 0.8);
        a.top_k = vec![tk("a", 0.1), tk("b", 0.5), tk("c", 0.3), tk(" ", 0.9)];
        let b = rec(2, "A", "bad", 0.8);

        let merged = merge_consecutive(&[a, b], 2);
        let labels: Vec<&str> = merged[0]
            .record
            .top_k
            .iter()
            .map(|t| t.label.as_str())
            .collect();
        assert_eq!(labels, vec!["b", "c"]);
    }

    #[test]
    fn top_k_ties_keep_first_seen_order() {
        let records = vec![SentenceRecord {
            top_k: vec![tk("first", 0.5), tk("second", 0.5)],
            ..rec(1, "A", "bad", 0.8)
        }];
        let averaged = average_top_k(&records, 5);
        assert_eq!(averaged[0].label, "first");
        assert_eq!(averaged[1].label, "second");
    }

    #[test]
    fn explode_restores_members() {
        let records = vec![
            rec(1, "A", "bad", 0.8),
            rec(2, "A", "bad", 0.9),
            rec(3, "B", "good", 0.7),
        ];
        let merged = merge_consecutive(&records, DEFAULT_TOP_K_LIMIT);
        let exploded = explode(&merged, &records);
        let ids: Vec<i64> = exploded.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(merge_consecutive(exploded, DEFAULT_TOP_K_LIMIT), merged);
    }
}
