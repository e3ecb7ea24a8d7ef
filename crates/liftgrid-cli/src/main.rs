mod app;
mod auth_cmd;
mod config;
mod log_cmd;
mod plan_cmd;
mod sheet_cmd;

use clap::{Parser, Subcommand};

use liftgrid_core::layout::Weekday;
use liftgrid_core::write::SetResult;
use liftgrid_store::pool;

use app::App;
use config::LiftgridConfig;

#[derive(Parser)]
#[command(
    name = "liftgrid",
    version,
    about = "Read a workout plan from a spreadsheet and log results back into it"
)]
struct Cli {
    /// Database URL (overrides LIFTGRID_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a liftgrid config file (no database required)
    Init {
        /// OAuth client id of your Google Cloud project
        #[arg(long)]
        client_id: Option<String>,
        /// OAuth client secret, if the client type has one
        #[arg(long)]
        client_secret: Option<String>,
        /// SQLite connection URL
        #[arg(long)]
        db_url: Option<String>,
        /// Label vocabulary used by the sheet: english or russian
        #[arg(long, default_value = "english")]
        vocabulary: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the local database and apply migrations
    DbInit,
    /// Configure the workout spreadsheet
    Sheet {
        #[command(subcommand)]
        command: SheetCommands,
    },
    /// Show the workout plan read from the sheet
    Plan {
        /// Only this weekday (e.g. monday, wed)
        #[arg(long, conflicts_with = "today")]
        day: Option<Weekday>,
        /// Only today's workout
        #[arg(long)]
        today: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Google account authorization
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Record completed sets and write them into the sheet
    Log {
        /// Exercise name as it appears in the sheet (case-insensitive)
        exercise: String,
        /// Weekday of the plan entry (defaults to today)
        #[arg(long)]
        day: Option<Weekday>,
        /// A completed set as N=WEIGHT; repeat for more sets
        #[arg(long = "set", value_name = "N=WEIGHT", value_parser = log_cmd::parse_set, required = true)]
        sets: Vec<SetResult>,
        /// Print cell instructions instead of writing to the sheet
        #[arg(long)]
        manual: bool,
    },
    /// List recently logged sessions
    History {
        /// Maximum number of sessions to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Totals for one exercise across all logged sessions
    Stats {
        /// Exercise name (case-insensitive)
        exercise: String,
    },
}

#[derive(Subcommand)]
pub enum SheetCommands {
    /// Remember the spreadsheet share URL
    Set {
        /// URL containing /d/<document id>
        url: String,
    },
    /// Show the configured spreadsheet
    Show,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in (uses the cached or refreshed token when possible)
    Login {
        /// Print the authorization URL and finish with `auth code`
        #[arg(long)]
        manual: bool,
        /// Do not launch a browser; print the URL and wait for the redirect
        #[arg(long, conflicts_with = "manual")]
        no_browser: bool,
    },
    /// Finish a manual sign-in with the code from the redirect
    Code {
        /// Authorization code
        code: String,
    },
    /// Show whether a usable token is stored
    Status,
    /// Revoke and forget the stored token
    Logout,
}

/// Execute the `liftgrid init` command: write config file.
fn cmd_init(
    client_id: Option<String>,
    client_secret: Option<String>,
    db_url: Option<String>,
    vocabulary: String,
    force: bool,
) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }
    if liftgrid_core::layout::Vocabulary::by_name(&vocabulary).is_none() {
        anyhow::bail!("unknown vocabulary {vocabulary:?}; expected \"english\" or \"russian\"");
    }

    let mut cfg = config::ConfigFile::default();
    if let Some(url) = db_url {
        cfg.database.url = url;
    }
    cfg.oauth.client_id = client_id;
    cfg.oauth.client_secret = client_secret;
    cfg.sheet.vocabulary = vocabulary;

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {}", cfg.database.url);
    match &cfg.oauth.client_id {
        Some(id) => println!("  oauth.client_id = {id}"),
        None => println!("  oauth.client_id is not set; add it before `liftgrid auth login`"),
    }
    println!("  sheet.vocabulary = {}", cfg.sheet.vocabulary);
    println!();
    println!("Next: run `liftgrid db-init`, then `liftgrid sheet set <URL>`.");

    Ok(())
}

/// Execute the `liftgrid db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = LiftgridConfig::resolve(cli_db_url)?;

    println!("Initializing liftgrid database...");

    pool::ensure_database_dir(&resolved.store_config).await?;
    let db_pool = pool::create_pool(&resolved.store_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("liftgrid db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            client_id,
            client_secret,
            db_url,
            vocabulary,
            force,
        } => cmd_init(client_id, client_secret, db_url, vocabulary, force),
        Commands::DbInit => cmd_db_init(cli.database_url.as_deref()).await,
        command => {
            let resolved = LiftgridConfig::resolve(cli.database_url.as_deref())?;
            let app = App::connect(resolved).await?;
            let result = run(command, &app).await;
            app.close().await;
            result
        }
    }
}

async fn run(command: Commands, app: &App) -> anyhow::Result<()> {
    match command {
        Commands::Sheet { command } => sheet_cmd::run_sheet_command(command, app).await,
        Commands::Plan { day, today, json } => {
            plan_cmd::run_plan(app, plan_cmd::DaySelection::from_flags(day, today), json).await
        }
        Commands::Auth { command } => auth_cmd::run_auth_command(command, app).await,
        Commands::Log {
            exercise,
            day,
            sets,
            manual,
        } => {
            let day = day.unwrap_or_else(plan_cmd::today_weekday);
            log_cmd::run_log(app, &exercise, day, sets, manual).await
        }
        Commands::History { limit } => log_cmd::run_history(app, limit).await,
        Commands::Stats { exercise } => log_cmd::run_stats(app, &exercise).await,
        Commands::Init { .. } | Commands::DbInit => {
            anyhow::bail!("init and db-init run without an open database")
        }
    }
}
