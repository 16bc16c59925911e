mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use timebox_core::TimeboxConfig;

use commands::category::CategoryAction;
use commands::config::ConfigAction;
use commands::goal::GoalAction;
use commands::habit::HabitAction;
use commands::maintenance::MaintenanceAction;
use commands::prefs::PrefsAction;
use commands::review::{ReflectArgs, ReviewArgs};
use commands::session::SessionAction;
use commands::task::TaskAction;

#[derive(Parser)]
#[command(name = "timebox")]
#[command(about = "Timeboxing, goals and habits with focus analytics", long_about = None)]
struct Cli {
    /// Use this database file instead of the configured one
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize timebox (first-time setup)
    Init,
    /// Manage tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Manage categories
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Manage goals
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },
    /// Start, finish and inspect timebox sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Track habits
    Habit {
        #[command(subcommand)]
        action: HabitAction,
    },
    /// Write or show the daily reflection
    Reflect(ReflectArgs),
    /// Weekly summary and review
    Review(ReviewArgs),
    /// Show or change preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Today at a glance
    Dashboard,
    /// Statistics over a period
    Analytics {
        /// Number of days
        #[arg(short, long)]
        period: Option<String>,
    },
    /// Patterns, suggestions and tips
    Insights {
        /// Number of days
        #[arg(short, long)]
        period: Option<String>,
    },
    /// Export data as CSV or JSON
    Export {
        /// sessions, tasks, categories, goals, habits, reflections or all
        #[arg(default_value = "all")]
        what: String,
        /// csv or json (csv with `all` writes a zip)
        #[arg(short, long, default_value = "csv")]
        format: String,
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a maintenance job once
    Maintenance {
        #[command(subcommand)]
        action: MaintenanceAction,
    },
    /// Add demonstration data
    SampleData,
    /// Run the periodic maintenance jobs in the foreground
    Scheduler,
    /// Start the HTTP API server
    Serve {
        /// Address to bind, e.g. 127.0.0.1:8000
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let mut config = TimeboxConfig::load()?;
    if let Some(path) = cli.database {
        config.database_path = Some(path);
    }

    match cli.command {
        Commands::Init => commands::init::init_command(&config),
        Commands::Task { action } => commands::task::handle_task_command(&config, action),
        Commands::Category { action } => {
            commands::category::handle_category_command(&config, action)
        }
        Commands::Goal { action } => commands::goal::handle_goal_command(&config, action),
        Commands::Session { action } => {
            commands::session::handle_session_command(&config, action)
        }
        Commands::Habit { action } => commands::habit::handle_habit_command(&config, action),
        Commands::Reflect(args) => commands::review::handle_reflect(&config, args),
        Commands::Review(args) => commands::review::handle_review(&config, args),
        Commands::Prefs { action } => commands::prefs::handle_prefs_command(&config, action),
        Commands::Dashboard => commands::report::handle_dashboard(&config),
        Commands::Analytics { period } => {
            commands::report::handle_analytics(&config, period.as_deref())
        }
        Commands::Insights { period } => {
            commands::report::handle_insights(&config, period.as_deref())
        }
        Commands::Export {
            what,
            format,
            output,
        } => commands::data::handle_export(&config, &what, &format, output),
        Commands::Maintenance { action } => {
            commands::maintenance::handle_maintenance_command(&config, action).await
        }
        Commands::SampleData => commands::data::handle_sample_data(&config),
        Commands::Scheduler => commands::maintenance::handle_scheduler(&config).await,
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            let db = commands::helpers::open_database(&config)?;
            timebox_api::serve(db, config).await
        }
        Commands::Config { action } => commands::config::handle_config_command(&config, action),
    }
}
