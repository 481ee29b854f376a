//! Terminal rendering of an analysis: grade chip, category cards, table and
//! facet badges.

use arrow::util::pretty::pretty_format_batches;
use prixplain_core::filter::{FacetOption, Facets, FilterCriteria};
use prixplain_core::normalize::{display_category, display_fine_grained};
use prixplain_core::schema::merged::to_record_batch;
use prixplain_core::{Analysis, MergedRecord};

const TEXT_WIDTH: usize = 96;

// ── Grade ──

pub fn print_grade(analysis: &Analysis, summary: &str) {
    let c = &analysis.rating_counts;
    println!("Overall Grade: {} ({})", analysis.grade, analysis.grade.label());
    if let Some(summary) = summary_line(summary) {
        println!("  {summary}");
    }
    println!(
        "  good {}  bad {}  blocker {}  neutral {}",
        c.good, c.bad, c.blocker, c.neutral
    );
    println!(
        "  {} cards (merged) from {} of {} sentences",
        analysis.merged_rows.len(),
        analysis.filtered_count,
        analysis.total_count
    );
}

// ── Cards ──

/// Print each category section followed by its merged cards.
pub fn print_cards(analysis: &Analysis, summary: &str) {
    print_grade(analysis, summary);
    println!();

    if analysis.merged_rows.is_empty() {
        if analysis.total_count > 0 {
            println!("No clauses match the current filters.");
        }
        return;
    }

    for group in &analysis.groups {
        println!(
            "=== {} ({} cards, {} sentences) ===",
            display_category(&group.category),
            group.items.len(),
            group.record_count
        );
        println!();
        for item in &group.items {
            print_card(item);
        }
    }
}

fn print_card(item: &MergedRecord) {
    let r = &item.record;

    print!("  [{}] {}", item.id_range(), r.label);
    if item.is_merged() {
        print!("  (merged {})", item.merged_ids.len());
    }
    println!();
    println!(
        "    {:<12} {}  ({:.1}%)",
        "rating",
        r.rating_key().title(),
        r.confidence * 100.0
    );
    if !r.sub_category.trim().is_empty() || !r.fine_grained.trim().is_empty() {
        println!(
            "    {:<12} {} / {}",
            "taxonomy",
            r.sub_category.trim(),
            display_fine_grained(&r.fine_grained)
        );
    }
    for line in r.text.lines() {
        println!("    > {}", truncate(line.trim(), TEXT_WIDTH));
    }
    if !r.action.trim().is_empty() {
        println!("    {:<12} {}", "action", r.action.trim());
    }
    if !r.top_k.is_empty() {
        println!("    top-k:");
        for tk in &r.top_k {
            println!("      {:<40} {:>5.1}%", truncate(&tk.label, 40), tk.prob * 100.0);
        }
    }
    println!();
}

// ── Table ──

pub fn print_table(rows: &[MergedRecord]) -> anyhow::Result<()> {
    if rows.is_empty() {
        println!("(no rows)");
        return Ok(());
    }
    let batch = to_record_batch(rows)?;
    println!("{}", pretty_format_batches(&[batch])?);
    Ok(())
}

// ── Facets ──

pub fn print_facets(facets: &Facets, criteria: &FilterCriteria) {
    println!("Ratings");
    for f in &facets.ratings {
        println!("  {:<10} {}/{}", f.rating.title(), f.filtered, f.total);
    }
    println!();

    println!("Categories");
    print_options(&facets.categories);
    println!();

    println!("Fine-grained (category: {})", criteria.category);
    print_options(&facets.fine_grained);
}

fn print_options(options: &[FacetOption]) {
    for o in options {
        println!("  {:<48} {}", o.display, o.count);
    }
}

// ── Helpers ──

fn summary_line(summary: &str) -> Option<&str> {
    Some(summary.trim()).filter(|s| !s.is_empty())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}
