use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use techpays::cache::{DatasetCache, SqliteCache};
use techpays::config::Settings;
use techpays::derive::with_extra_compensation;
use techpays::record::Dataset;
use techpays::report;
use techpays::source::{self, PageFilter};
use techpays::stats::{self, RankOutcome, RankQuery, SortKey, SortOrder};

#[derive(Parser)]
#[command(name = "techpays", about = "techpays.eu compensation statistics")]
struct Cli {
    #[command(flatten)]
    page: PageArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PageArgs {
    /// Full page URL (overrides base URL + filters)
    #[arg(long, global = true)]
    url: Option<String>,
    /// Country segment, e.g. "netherlands"
    #[arg(short, long, global = true)]
    country: Option<String>,
    /// Seniority segment
    #[arg(short, long, global = true)]
    level: Option<String>,
    /// Job category segment
    #[arg(long, global = true)]
    category: Option<String>,
    /// Root directory for exported files
    #[arg(short, long, global = true)]
    out_dir: Option<String>,
    /// Skip the on-disk dataset cache
    #[arg(long, global = true)]
    no_cache: bool,
}

#[derive(Args, Clone)]
struct RankArgs {
    /// Field to group by
    #[arg(short, long)]
    group: Option<String>,
    /// Numeric field to rank on
    #[arg(short, long)]
    field: Option<String>,
    /// Minimum records per group
    #[arg(short, long)]
    min_entries: Option<usize>,
    /// Number of groups to keep
    #[arg(short = 'n', long)]
    top: Option<usize>,
    /// Lowest first
    #[arg(long)]
    ascending: bool,
    /// Statistic to sort by
    #[arg(long, value_enum, default_value = "median")]
    by: SortBy,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortBy {
    Median,
    Mean,
    Count,
}

impl From<SortBy> for SortKey {
    fn from(s: SortBy) -> Self {
        match s {
            SortBy::Median => SortKey::Median,
            SortBy::Mean => SortKey::Mean,
            SortBy::Count => SortKey::Count,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download and decode the compensation list, write it as JSON
    Fetch,
    /// Describe a numeric field over the whole dataset
    Describe {
        /// Numeric field to describe
        #[arg(short, long)]
        field: Option<String>,
        /// Histogram bins
        #[arg(short, long)]
        bins: Option<usize>,
    },
    /// Rank groups (companies by default) by a numeric field
    Rank(RankArgs),
    /// Fetch + describe + rank in one go
    Run(RankArgs),
    /// Run the parser on a saved HTML page (no network)
    Parse {
        /// HTML file
        file: PathBuf,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(settings = ?settings, "loaded settings");

    let url = cli.page.url.clone().unwrap_or_else(|| {
        let filter = PageFilter {
            country: cli.page.country.clone(),
            level: cli.page.level.clone(),
            category: cli.page.category.clone(),
        };
        source::page_url(&settings.base_url, &filter)
    });
    let out_root = cli.page.out_dir.clone().unwrap_or_else(|| settings.out_dir.clone());
    let (dir, stem) = source::output_location(&out_root, &url);

    let dataset = match &cli.command {
        Commands::Parse { file } => {
            let html = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            source::parse_fetched(&file.display().to_string(), &html)?
        }
        _ => load(&settings, &cli.page, &url).await?,
    };
    let dataset = with_extra_compensation(&dataset)?;
    println!("Loaded {} records from {}", dataset.len(), url);

    match cli.command {
        Commands::Fetch | Commands::Parse { .. } => {
            let path = report::write_dataset(&dir, &dataset)?;
            println!("Wrote {}", path.display());
        }
        Commands::Describe { field, bins } => {
            let field = field.unwrap_or_else(|| settings.target_field.clone());
            let bins = bins.unwrap_or(settings.histogram_bins);
            describe(&dataset, &dir, &stem, &field, bins)?;
        }
        Commands::Rank(args) => {
            rank(&settings, &dataset, &dir, &stem, &args)?;
        }
        Commands::Run(args) => {
            report::write_dataset(&dir, &dataset)?;
            let field = args.field.clone().unwrap_or_else(|| settings.target_field.clone());
            describe(&dataset, &dir, &stem, &field, settings.histogram_bins)?;
            rank(&settings, &dataset, &dir, &stem, &args)?;
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

async fn load(settings: &Settings, page: &PageArgs, url: &str) -> Result<Dataset> {
    let client = source::client()?;
    if page.no_cache {
        return source::load_dataset(&client, url, None).await;
    }
    let mut cache = SqliteCache::open(Path::new(&settings.cache_path))?;
    source::load_dataset(&client, url, Some(&mut cache as &mut dyn DatasetCache)).await
}

fn describe(dataset: &Dataset, dir: &Path, stem: &str, field: &str, bins: usize) -> Result<()> {
    let Some(summary) = stats::describe(dataset, field)? else {
        warn!(field, "dataset is empty, nothing to describe");
        println!("No records to describe.");
        return Ok(());
    };
    let hist = stats::histogram(dataset, field, bins)?;
    print!("{}", report::describe_table(field, &summary));
    let prefix = report::field_prefix(field);
    for p in report::write_description(dir, prefix, stem, field, &summary, &hist)? {
        println!("Wrote {}", p.display());
    }
    Ok(())
}

fn rank(
    settings: &Settings,
    dataset: &Dataset,
    dir: &Path,
    stem: &str,
    args: &RankArgs,
) -> Result<()> {
    let group = args.group.as_deref().unwrap_or(&settings.group_field);
    let field = args.field.as_deref().unwrap_or(&settings.target_field);
    let order = if args.ascending || !settings.descending {
        SortOrder::Ascending
    } else {
        SortOrder::Descending
    };
    let query = RankQuery::new(group, field)
        .min_entries(args.min_entries.unwrap_or(settings.min_entries))
        .top(args.top.unwrap_or(settings.top_n))
        .order(order)
        .by(args.by.into());

    match stats::rank_groups(dataset, &query)? {
        RankOutcome::Empty => {
            warn!(
                min_entries = query.min_entries,
                "no group has enough entries; loosen the filter"
            );
            println!("No {} has at least {} entries.", group, query.min_entries);
        }
        RankOutcome::Ranked(ranking) => {
            print!("{}", report::groups_table(group, ranking.top()));
            println!(
                "\n{} of {} groups shown ({} records)",
                ranking.top().len(),
                ranking.all().len(),
                ranking.records().len()
            );
            for p in report::write_ranking(dir, stem, group, ranking.all())? {
                println!("Wrote {}", p.display());
            }
        }
    }
    Ok(())
}
