//! arvtrain CLI: interactive training and record keeping.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "arvtrain", version, about = "ARV training assessment and progression")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a unit interactively (answers are read from stdin)
    Train {
        /// Trainee email (defaults to `default_trainee` from the config)
        #[arg(long)]
        trainee: Option<String>,

        /// Curriculum ID
        #[arg(long, default_value = "valuation")]
        curriculum: String,

        /// 1-based unit number (defaults to the next unlocked unit)
        #[arg(long)]
        unit: Option<usize>,

        /// Restrict properties to one state, e.g. "TN" (default: all states)
        #[arg(long, default_value = "all")]
        region: String,

        /// Seed for property sampling and option shuffling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show unit states for every curriculum
    Progress {
        #[arg(long)]
        trainee: Option<String>,
    },

    /// Start a certified curriculum over
    Reset {
        #[arg(long)]
        trainee: Option<String>,

        #[arg(long)]
        curriculum: String,
    },

    /// Grade a single estimate against the actual value
    Score {
        /// ARV estimate, e.g. "$350,000"
        #[arg(long)]
        estimate: String,

        /// Actual ARV
        #[arg(long)]
        actual: String,

        /// Renovation estimate (adds a composite grade)
        #[arg(long, requires = "reno_actual")]
        reno_estimate: Option<String>,

        /// Actual renovation cost
        #[arg(long, requires = "reno_estimate")]
        reno_actual: Option<String>,
    },

    /// Preview the multiple-choice options for a true value
    Distractors {
        /// True value, e.g. "287,000"
        #[arg(long)]
        value: String,

        /// Seed for the option shuffle
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List past valuation sessions
    History {
        /// Number of sessions to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Rank trainees from a JSON-lines results log
    Leaderboard {
        /// Results file (defaults to the configured jsonl sink)
        #[arg(long)]
        results: Option<PathBuf>,

        /// Minimum questions for an entry to qualify
        #[arg(long, default_value = "10")]
        min_questions: usize,

        /// Include failed attempts
        #[arg(long)]
        include_failed: bool,
    },

    /// Validate curriculum TOML files
    Validate {
        /// Curriculum file or directory (defaults to the built-in catalog)
        #[arg(long)]
        curricula: Option<PathBuf>,
    },

    /// Create a starter config and curriculum file
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("arvtrain=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let result = match cli.command {
        Commands::Train {
            trainee,
            curriculum,
            unit,
            region,
            seed,
        } => commands::train::execute(config, trainee, curriculum, unit, region, seed).await,
        Commands::Progress { trainee } => commands::progress::execute(config, trainee).await,
        Commands::Reset {
            trainee,
            curriculum,
        } => commands::progress::reset(config, trainee, curriculum).await,
        Commands::Score {
            estimate,
            actual,
            reno_estimate,
            reno_actual,
        } => commands::score::execute(config, estimate, actual, reno_estimate, reno_actual),
        Commands::Distractors { value, seed } => {
            commands::score::distractors(config, value, seed)
        }
        Commands::History { limit } => commands::history::execute(config, limit),
        Commands::Leaderboard {
            results,
            min_questions,
            include_failed,
        } => commands::history::leaderboard(config, results, min_questions, include_failed),
        Commands::Validate { curricula } => commands::validate::execute(curricula),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
