mod display;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use prixplain_core::filter::{DEFAULT_MIN_CONFIDENCE, Selection};
use prixplain_core::{
    AnalysisOptions, AnnotationResponse, FilterCriteria, GradingPolicy, Rating, SentenceRecord,
    analyze,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "prixplain", version)]
#[command(about = "Grade, merge, filter and export privacy-policy clause annotations")]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Annotation results as JSON (array of rows or `{ "rows": [...] }`); `-` for stdin
    #[arg(short, long, global = true, default_value = "-")]
    input: PathBuf,

    /// Category to show, or "All"
    #[arg(long, global = true, default_value = "All")]
    category: String,

    /// Fine-grained category to show, or "All"
    #[arg(long, global = true, default_value = "All")]
    fine_grained: String,

    /// good, bad, blocker, neutral or "All"
    #[arg(long, global = true, default_value = "All")]
    rating: String,

    /// Only bad and blocker clauses
    #[arg(long, global = true)]
    only_bad: bool,

    /// Minimum classifier confidence, 0 to 1
    #[arg(long, global = true, env = "PRIXPLAIN_MIN_CONFIDENCE", default_value_t = DEFAULT_MIN_CONFIDENCE)]
    min_confidence: f64,

    /// Case-insensitive text search over sentence, label, action and taxonomy
    #[arg(long, global = true, default_value = "")]
    search: String,

    /// Alternative labels kept per merged row
    #[arg(long, global = true, default_value_t = prixplain_core::DEFAULT_TOP_K_LIMIT)]
    top_k: usize,

    /// Grading policy overrides as JSON
    #[arg(long, global = true, env = "PRIXPLAIN_POLICY")]
    policy: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Overall grade of the merged, filtered rows
    Grade,
    /// Grouped card view
    Cards,
    /// Tabular view of merged rows
    Table,
    /// Rating badges and dropdown option counts
    Facets,
    /// CSV export of merged rows
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merged rows as JSON
    Json,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    info!("prixplain v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let opts = &cli.opts;
    let response = read_input(&opts.input)?;
    let records = &response.rows;
    info!(rows = records.len(), "loaded annotations");

    let criteria = build_criteria(opts, records)?;
    let options = AnalysisOptions {
        top_k_limit: opts.top_k,
        grading: load_policy(opts.policy.as_deref())?,
    };

    let analysis = analyze(records, &criteria, &options);

    match cli.command {
        Command::Grade => display::print_grade(&analysis, &response.summary),
        Command::Cards => display::print_cards(&analysis, &response.summary),
        Command::Table => display::print_table(&analysis.merged_rows)?,
        Command::Facets => display::print_facets(&analysis.facets, &criteria),
        Command::Export { output } => {
            let csv = prixplain_core::to_csv(&analysis.merged_rows);
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(rows = analysis.merged_rows.len(), path = %path.display(), "exported CSV");
                }
                None => println!("{csv}"),
            }
        }
        Command::Json => {
            let json = serde_json::to_string_pretty(&analysis.merged_rows)
                .context("serialising merged rows")?;
            println!("{json}");
        }
    }

    Ok(())
}

fn build_criteria(opts: &GlobalOpts, records: &[SentenceRecord]) -> anyhow::Result<FilterCriteria> {
    let requested = Selection::parse(&opts.fine_grained);
    let mut criteria = FilterCriteria {
        fine_grained: requested.clone(),
        rating: parse_rating(&opts.rating)?,
        only_bad_or_blocker: opts.only_bad,
        min_confidence: opts.min_confidence,
        search: opts.search.clone(),
        ..FilterCriteria::default()
    };
    criteria.select_category(Selection::parse(&opts.category), records);

    if criteria.fine_grained != requested {
        warn!(
            fine_grained = %requested,
            category = %criteria.category,
            "fine-grained category not present under the selected category; showing all"
        );
    }
    Ok(criteria)
}

fn read_input(path: &Path) -> anyhow::Result<AnnotationResponse> {
    let json = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading annotations from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };

    AnnotationResponse::from_json(&json)
        .with_context(|| format!("invalid annotations in {}", path.display()))
}

fn load_policy(path: Option<&Path>) -> anyhow::Result<GradingPolicy> {
    let Some(path) = path else {
        return Ok(GradingPolicy::default());
    };
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let policy = serde_json::from_str(&json)
        .with_context(|| format!("invalid grading policy in {}", path.display()))?;
    info!(path = %path.display(), "loaded grading policy");
    Ok(policy)
}

fn parse_rating(s: &str) -> anyhow::Result<Option<Rating>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    match prixplain_core::rating_key(s) {
        Rating::Neutral if !s.eq_ignore_ascii_case("neutral") => {
            bail!("unknown rating '{s}' (expected good, bad, blocker, neutral or All)")
        }
        rating => Ok(Some(rating)),
    }
}
