use std::process;
use std::time::Duration;

use assess_core::model::{AgeBand, ResultId};
use clap::{Parser, Subcommand};
use services::SessionConfig;
use storage::repository::Storage;

mod commands;
mod db;

#[derive(Parser)]
#[command(name = "assess", version, about = "Timed cognitive assessments with per-patient trends")]
struct Cli {
    /// Database URL (`sqlite://path`, a bare path, or `sqlite::memory:`)
    #[arg(long, global = true, env = "ASSESS_DB_URL", default_value = "sqlite://assess.sqlite3")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an assessment session in the terminal
    Take {
        /// Age band: youth, adolescent, adult or elderly
        #[arg(long, default_value = "adult")]
        band: AgeBand,

        /// Subject name (prompted when omitted)
        #[arg(long)]
        name: Option<String>,

        /// Subject age (prompted when omitted)
        #[arg(long)]
        age: Option<String>,

        /// Number of questions to draw
        #[arg(long, default_value_t = SessionConfig::default().target_questions)]
        questions: usize,

        /// Milliseconds the answer stays on screen before advancing
        #[arg(long, default_value = "1000")]
        settle_ms: u64,
    },

    /// Show per-patient trends
    Trends {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Delete one assessment result
    Delete {
        /// Result id as shown by `trends`
        id: ResultId,
    },

    /// Insert demo patients and results
    Seed,
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    let db_url = db::normalize_sqlite_url(&cli.db);
    db::prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;
    tracing::debug!(db = %db_url, "storage ready");

    match cli.command {
        Commands::Take {
            band,
            name,
            age,
            questions,
            settle_ms,
        } => {
            let config = SessionConfig {
                target_questions: questions,
                settle_delay: Duration::from_millis(settle_ms),
                ..SessionConfig::default()
            };
            commands::take::execute(&storage, band, name, age, config).await
        }
        Commands::Trends { json } => commands::dashboard::trends(&storage, json).await,
        Commands::Delete { id } => commands::dashboard::delete(&storage, id).await,
        Commands::Seed => commands::dashboard::seed(&storage).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,services=info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        process::exit(2);
    }
}
