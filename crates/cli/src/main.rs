use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::EntityKind;
use indicatif::ProgressBar;
use ingest::{
    LoadOrchestrator, LoadSummary, LoaderConfig, LogProgress, ProgressReporter,
    DEFAULT_RATINGS_BATCH_SIZE,
};
use ranking::{top_movies, RankedMovie, TopMoviesQuery};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;
use store::{DocumentStore, MemoryStore, MongoStore};
use tracing::info;

/// moviedb - MovieLens loader and ranking queries for a document store
#[derive(Parser)]
#[command(name = "moviedb")]
#[command(about = "Load MovieLens CSV files into MongoDB and rank movies", long_about = None)]
struct Cli {
    /// MongoDB connection string
    #[arg(long, env = "MONGO_URI", default_value = "mongodb://localhost:27017", global = true)]
    mongo_uri: String,

    /// Database holding the movies, ratings and users collections
    #[arg(long, env = "MONGO_DB", default_value = "moviedb", global = true)]
    database: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reset the collections and load movies.csv, ratings.csv and users.csv
    Load {
        /// Directory containing the CSV files
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Ratings per bulk insert
        #[arg(long, default_value_t = DEFAULT_RATINGS_BATCH_SIZE)]
        batch_size: usize,

        /// Load into an in-memory store instead of MongoDB
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the best rated movies with a minimum number of votes
    Top {
        /// Minimum number of ratings a movie needs
        #[arg(long, default_value_t = 1000)]
        min_votes: u64,

        /// Number of movies to show
        #[arg(long, default_value_t = 10)]
        top_n: u64,

        /// Print the ranking as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Load {
            ref data_dir,
            batch_size,
            dry_run,
        } => {
            let config = LoaderConfig::new(data_dir).with_ratings_batch_size(batch_size);
            if dry_run {
                info!("Dry run: loading into an in-memory store, MongoDB is not touched");
                handle_load(&MemoryStore::new(), config)?
            } else {
                handle_load(&connect(&cli)?, config)?
            }
        }
        Commands::Top {
            min_votes,
            top_n,
            json,
        } => handle_top(&connect(&cli)?, TopMoviesQuery { min_votes, top_n }, json)?,
    }

    Ok(())
}

fn connect(cli: &Cli) -> Result<MongoStore> {
    MongoStore::connect(&cli.mongo_uri, &cli.database)
        .with_context(|| format!("Failed to connect to {}", cli.mongo_uri))
}

/// Spinner showing how many ratings have been committed
struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        Self {
            bar: ProgressBar::new_spinner(),
        }
    }
}

impl Drop for SpinnerProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for SpinnerProgress {
    fn batch_committed(&self, kind: EntityKind, total: u64) {
        self.bar
            .set_message(format!("Inserted {} {}...", total, kind.collection()));
        self.bar.tick();
    }
}

/// Handle the 'load' command
fn handle_load(store: &dyn DocumentStore, config: LoaderConfig) -> Result<()> {
    println!(
        "Loading MovieLens CSV files from {} into {}...",
        config.data_dir().display(),
        store.name()
    );
    let start = Instant::now();
    // plain log lines when the output is not interactive
    let progress: Box<dyn ProgressReporter> = if std::io::stderr().is_terminal() {
        Box::new(SpinnerProgress::new())
    } else {
        Box::new(LogProgress)
    };

    let result = LoadOrchestrator::new(store, progress.as_ref(), config).run();
    drop(progress);
    let summary = result.context("Load failed")?;

    print_summary(&summary);
    println!("{} Done in {:.2?}", "✓".green(), start.elapsed());
    Ok(())
}

/// Handle the 'top' command
fn handle_top(store: &dyn DocumentStore, query: TopMoviesQuery, json: bool) -> Result<()> {
    let ranked = top_movies(store, &query).context("Ranking query failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        print_ranking(&ranked, &query);
    }
    Ok(())
}

fn print_summary(summary: &LoadSummary) {
    println!("{}", "Load summary:".bold().blue());
    println!("{}Documents removed: {}", "• ".green(), summary.deleted);
    println!("{}Indexes created: {}", "• ".green(), summary.indexes_created);
    for report in &summary.reports {
        println!(
            "{}{}: {} documents in {} batch(es), {} stored",
            "• ".cyan(),
            report.kind.collection(),
            report.inserted,
            report.batches,
            summary.stored(report.kind).unwrap_or_default()
        );
    }
}

fn print_ranking(ranked: &[RankedMovie], query: &TopMoviesQuery) {
    println!(
        "{}",
        format!("Top {} movies with at least {} votes:", query.top_n, query.min_votes)
            .bold()
            .blue()
    );
    if ranked.is_empty() {
        println!("  (no movie qualifies)");
        return;
    }
    for (i, movie) in ranked.iter().enumerate() {
        println!(
            "{}. {} [{}] - avg {:.2} ({} ratings)",
            (i + 1).to_string().green(),
            movie.title,
            movie.movie_id,
            movie.avg_rating,
            movie.n
        );
    }
}
