// pattern-pulse - tracks whether coding patterns actually stop recurring problems
//
// This is the main entry point. Parses CLI args and dispatches to handlers.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use pattern_pulse_lib::{
    core::{
        AnalysisConfig, BugReport, Category, MetricRecord, PatternLibrary, PatternSearcher,
        Recorder, ReviewFinding, Retriever, TestFailure,
    },
    intelligence::{Analyzer, EffectivenessResult, PlanOptions},
    Database, PulseError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DATA_DIR: &str = ".pattern-pulse";

/// Flags every subcommand understands
#[derive(Debug, Default)]
struct GlobalFlags {
    json: bool,
    seed: Option<u64>,
}

#[tokio::main]
async fn main() {
    init_tracing();

    // Grab whatever the user typed
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    let outcome = match command {
        "record" => handle_record(rest).await,
        "import" => handle_import(rest).await,
        "patterns" => handle_patterns(rest).await,
        "recent" => handle_recent(rest).await,
        "search" => handle_search(rest).await,
        "analyze" => handle_analyze(rest).await,
        "plan" => handle_plan(rest).await,
        "status" => handle_status().await,
        "version" | "-v" | "--version" => {
            println!("pattern-pulse v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = outcome {
        // Library errors get the friendly wording, everything else the context chain
        match e.downcast_ref::<PulseError>() {
            Some(pulse) => eprintln!("Error: {}", pulse.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    // Logs go to stderr so --json output stays clean
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pattern_pulse_lib=info,pattern_pulse=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Pull global flags out and return what's left
fn split_global_flags(args: &[String]) -> anyhow::Result<(GlobalFlags, Vec<String>)> {
    let mut flags = GlobalFlags::default();
    let mut rest = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => flags.json = true,
            "--seed" => {
                i += 1;
                let raw = args.get(i).context("--seed needs a value")?;
                flags.seed = Some(raw.parse().with_context(|| format!("bad seed '{}'", raw))?);
            }
            other => rest.push(other.to_string()),
        }
        i += 1;
    }

    Ok((flags, rest))
}

fn take_value(args: &[String], i: &mut usize, flag: &str) -> anyhow::Result<String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .with_context(|| format!("{} needs a value", flag))
}

async fn handle_record(args: &[String]) -> anyhow::Result<()> {
    let (_, args) = split_global_flags(args)?;

    let mut pattern_name: Option<String> = None;
    let mut category = Category::Bug;
    let mut timestamp: DateTime<Utc> = Utc::now();
    let mut first_text: Option<String> = None;
    let mut second_text: Option<String> = None;
    let mut from_file: Option<PathBuf> = None;
    let mut strict = false;

    let mut i = 0;
    while i < args.len() {
        let flag = args[i].clone();
        match flag.as_str() {
            "--category" => category = take_value(&args, &mut i, "--category")?.parse()?,
            "--at" => {
                let raw = take_value(&args, &mut i, "--at")?;
                timestamp = DateTime::parse_from_rfc3339(&raw)
                    .with_context(|| format!("--at expects an RFC 3339 timestamp, got '{}'", raw))?
                    .with_timezone(&Utc);
            }
            // title / test name / reviewer, depending on category
            "--title" | "--test" | "--reviewer" => {
                first_text = Some(take_value(&args, &mut i, &flag)?)
            }
            // file path / error message / comment
            "--file" | "--error" | "--comment" => {
                second_text = Some(take_value(&args, &mut i, &flag)?)
            }
            "--from" => from_file = Some(PathBuf::from(take_value(&args, &mut i, "--from")?)),
            "--strict" => strict = true,
            arg => pattern_name = Some(arg.to_string()),
        }
        i += 1;
    }

    let records = if let Some(path) = from_file {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading metric records from {}", path.display()))?;
        serde_json::from_str::<Vec<MetricRecord>>(&contents)
            .with_context(|| format!("parsing metric records in {}", path.display()))?
    } else {
        let Some(pattern_name) = pattern_name else {
            bail!("record needs a pattern name or --from <file>");
        };
        vec![build_record(pattern_name, category, timestamp, first_text, second_text)]
    };

    let db = Arc::new(get_database().await?);
    let recorder = if strict {
        Recorder::new(db).strict()
    } else {
        Recorder::new(db)
    };

    let written = recorder.record_batch(&records).await?;

    println!("Recorded {} occurrence(s)", written);
    Ok(())
}

fn build_record(
    pattern_name: String,
    category: Category,
    timestamp: DateTime<Utc>,
    first_text: Option<String>,
    second_text: Option<String>,
) -> MetricRecord {
    match category {
        Category::Bug => MetricRecord::Bug(BugReport {
            pattern_name,
            timestamp,
            title: first_text,
            file_path: second_text,
        }),
        Category::TestFailure => MetricRecord::TestFailure(TestFailure {
            pattern_name,
            timestamp,
            test_name: first_text,
            error_message: second_text,
        }),
        Category::CodeReview => MetricRecord::CodeReview(ReviewFinding {
            pattern_name,
            timestamp,
            reviewer: first_text,
            comment: second_text,
        }),
    }
}

async fn handle_import(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = args.first() else {
        bail!("import needs a path to a pattern library JSON file");
    };

    let library = PatternLibrary::from_json_file(path)
        .with_context(|| format!("loading pattern library from {}", path))?;

    let db = Arc::new(get_database().await?);
    let count = Recorder::new(db).import_library(&library).await?;

    println!("Imported {} pattern(s)", count);
    Ok(())
}

async fn handle_patterns(args: &[String]) -> anyhow::Result<()> {
    let (flags, _) = split_global_flags(args)?;

    let db = Arc::new(get_database().await?);
    let library = Retriever::new(db).library_snapshot().await?;

    if flags.json {
        let patterns: Vec<_> = library.iter().collect();
        println!("{}", serde_json::to_string_pretty(&patterns)?);
        return Ok(());
    }

    if library.is_empty() {
        println!("No patterns stored. Load some with 'pattern-pulse import <file>'.");
        return Ok(());
    }

    println!("\nPatterns:");
    println!("{}", "=".repeat(60));
    for pattern in library.iter() {
        let groups: Vec<&str> = pattern.indicator_groups.iter().map(|g| g.name()).collect();
        println!(
            "  {:<32} {:<9} score {:.2}  [{}]",
            pattern.name,
            pattern.severity,
            pattern.effectiveness_score,
            if groups.is_empty() {
                "generic".to_string()
            } else {
                groups.join(", ")
            }
        );
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

async fn handle_recent(args: &[String]) -> anyhow::Result<()> {
    let (flags, rest) = split_global_flags(args)?;

    let limit = rest
        .first()
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(10);

    let db = Arc::new(get_database().await?);
    let occurrences = Retriever::new(db).recent(None, limit).await?;

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&occurrences)?);
    } else if occurrences.is_empty() {
        println!("No occurrences recorded.");
    } else {
        println!("\nRecent occurrences:");
        println!("{}", "=".repeat(60));
        for (i, occurrence) in occurrences.iter().enumerate() {
            println!(
                "{:3}. {}  {:<12} {}",
                i + 1,
                occurrence.timestamp.format("%Y-%m-%d %H:%M"),
                occurrence.category,
                occurrence.pattern_name
            );
        }
        println!("{}", "=".repeat(60));
    }

    Ok(())
}

async fn handle_search(args: &[String]) -> anyhow::Result<()> {
    let (flags, rest) = split_global_flags(args)?;
    if rest.is_empty() {
        bail!("no search query provided");
    }

    let query = rest.join(" ");
    let db = Arc::new(get_database().await?);
    let library = Retriever::new(db).library_snapshot().await?;
    let hits = PatternSearcher::new().search(&library, &query, 20);

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("No patterns found matching '{}'", query);
    } else {
        println!("\nFound {} pattern(s) matching '{}':", hits.len(), query);
        println!("{}", "=".repeat(60));
        for (i, hit) in hits.iter().enumerate() {
            println!(
                "{:3}. {} ({}) {}",
                i + 1,
                hit.pattern.name,
                hit.pattern.severity,
                hit.pattern.description
            );
        }
        println!("{}", "=".repeat(60));
    }

    Ok(())
}

async fn handle_analyze(args: &[String]) -> anyhow::Result<()> {
    let (flags, rest) = split_global_flags(args)?;

    let analyzer = get_analyzer().await?;
    let mut rng = make_rng(flags.seed);
    let now = Utc::now();

    if let Some(pattern_name) = rest.first() {
        let result = analyzer.analyze_pattern(pattern_name, now, &mut rng).await?;
        if flags.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_result(&result);
        }
        return Ok(());
    }

    let report = analyzer.analyze_all(now, &mut rng).await?;

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "=".repeat(60));
    println!(
        "Effectiveness over the last {} days",
        analyzer.config().time_window_days
    );
    println!("{}", "=".repeat(60));

    if report.results.is_empty() {
        println!("\nNo patterns stored yet.");
    }
    for result in &report.results {
        print_result(result);
    }

    println!("\n{}", "=".repeat(60));
    Ok(())
}

fn print_result(result: &EffectivenessResult) {
    println!(
        "\n  {}  score {:.2}  {}  ({} occurrence(s))",
        result.pattern_name, result.score, result.trend, result.total_occurrences
    );
    println!(
        "     rate {:.2}/day -> {:.2}/day, CI [{:.2}, {:.2}]",
        result.first_half_rate,
        result.second_half_rate,
        result.confidence_interval.lower,
        result.confidence_interval.upper
    );
    if let Some(p) = result.p_value {
        let verdict = if result.statistically_significant {
            "significant"
        } else {
            "not significant"
        };
        println!("     p = {:.4} ({})", p, verdict);
    }
}

async fn handle_plan(args: &[String]) -> anyhow::Result<()> {
    let (flags, rest) = split_global_flags(args)?;

    let analyzer = get_analyzer().await?;
    let mut options = PlanOptions::from(analyzer.config());
    let mut prompt_parts = Vec::new();

    let mut i = 0;
    while i < rest.len() {
        match rest[i].as_str() {
            "--no-apply" => options.apply_patterns = false,
            "--min-confidence" => {
                let raw = take_value(&rest, &mut i, "--min-confidence")?;
                options.min_confidence = raw
                    .parse()
                    .with_context(|| format!("bad confidence '{}'", raw))?;
            }
            arg => prompt_parts.push(arg.to_string()),
        }
        i += 1;
    }

    let prompt = prompt_parts.join(" ");
    let mut rng = make_rng(flags.seed);
    let plan = analyzer.plan(&prompt, options, Utc::now(), &mut rng).await?;

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("\nPlan for: {}", prompt);
    println!("{}", "=".repeat(60));

    if plan.is_empty() {
        println!("No patterns apply.");
    }
    if !plan.applied.is_empty() {
        println!("\nApplied:");
        for candidate in &plan.applied {
            println!("  - {} ({:.0}%)", candidate.name(), candidate.confidence * 100.0);
            if !candidate.pattern.good_example.is_empty() {
                println!("      do: {}", candidate.pattern.good_example);
            }
        }
    }
    if !plan.suggested.is_empty() {
        println!("\nSuggested:");
        for candidate in &plan.suggested {
            println!("  - {} ({:.0}%)", candidate.name(), candidate.confidence * 100.0);
        }
    }

    println!("\nWhy:");
    for why in &plan.rationale {
        println!("  {:<32} {:<9} {}", why.pattern_name, why.decision, why.reason);
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

async fn handle_status() -> anyhow::Result<()> {
    let db = get_database().await?;
    let stats = db.stats().await?;
    let config = load_config()?;

    println!("\npattern-pulse Status");
    println!("{}", "=".repeat(60));

    println!("\nMetrics Store:");
    println!("  Location:     {}", db.path().display());
    println!("  Occurrences:  {}", stats.total_occurrences);
    println!("  Patterns:     {}", stats.total_patterns);
    println!("  Tracked:      {}", stats.patterns_with_occurrences);

    println!("\nAnalysis:");
    println!("  Window:          {} days", config.time_window_days);
    println!("  Smoothing alpha: {}", config.alpha);
    println!("  Min confidence:  {}", config.min_confidence);
    println!(
        "  Bootstrap:       {} resamples at {:.0}%",
        config.resample_count,
        config.confidence_level * 100.0
    );

    println!("{}", "=".repeat(60));

    Ok(())
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().context("could not find home directory")?;
    Ok(home.join(DATA_DIR))
}

fn load_config() -> anyhow::Result<AnalysisConfig> {
    let path = data_dir()?.join("config.toml");
    if !path.exists() {
        return Ok(AnalysisConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config = AnalysisConfig::from_toml_str(&contents)
        .with_context(|| format!("loading {}", path.display()))?;

    Ok(config)
}

async fn get_database() -> anyhow::Result<Database> {
    let db_path = data_dir()?.join("metrics.db");
    let db = Database::new(&db_path)
        .await
        .with_context(|| format!("opening {}", db_path.display()))?;
    Ok(db)
}

async fn get_analyzer() -> anyhow::Result<Analyzer> {
    let config = load_config()?;
    let db = Arc::new(get_database().await?);
    Ok(Analyzer::new(db, config)?)
}

fn print_usage() {
    println!(
        r#"pattern-pulse v{} - Are your coding patterns working?

USAGE:
    pattern-pulse <COMMAND> [OPTIONS]

COMMANDS:
    record <pattern>       Record one occurrence
        --category <c>       bug | test_failure | code_review (default: bug)
        --at <rfc3339>       When it happened (default: now)
        --title/--test/--reviewer <text>
        --file/--error/--comment <text>
        --from <file.json>   Record a JSON array of metric records instead
        --strict             Reject patterns that aren't in the library
    import <file.json>     Load a pattern library
    patterns               List stored patterns
    recent [limit]         Show recent occurrences (default: 10)
    search <query>         Fuzzy search patterns
    analyze [pattern]      Score patterns over the analysis window
    plan <request>         Decide which patterns apply to a request
        --no-apply           Only suggest, never apply
        --min-confidence <x> Override the apply threshold
    status                 Show store and config
    version                Show version
    help                   Show this help

GLOBAL OPTIONS:
    --json                 Machine-readable output
    --seed <n>             Fix the bootstrap random seed

FILES:
    ~/.pattern-pulse/metrics.db    Occurrence log and pattern library
    ~/.pattern-pulse/config.toml   Analysis settings (optional)

Set RUST_LOG=pattern_pulse_lib=debug to see scoring decisions.
"#,
        env!("CARGO_PKG_VERSION")
    );
}
