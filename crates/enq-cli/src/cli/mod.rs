//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use enq_core::config::Config;

mod commands;

#[derive(Parser)]
#[command(name = "enq")]
#[command(version)]
#[command(about = "Admin CLI for customer enquiries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in to the admin panel
    Login {
        /// Admin username
        #[arg(short, long)]
        username: String,

        /// Admin password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and clear the local session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// List enquiries
    List {
        /// Case-insensitive search over name, email, company, and text
        #[arg(short, long, default_value = "")]
        search: String,

        /// Status filter: all, pending, contacted, or resolved
        #[arg(long, default_value = "all")]
        status: String,
    },

    /// Show one enquiry in full
    Show {
        /// Enquiry ID
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Update an enquiry's status
    SetStatus {
        /// Enquiry ID
        #[arg(value_name = "ID")]
        id: String,

        /// New status: pending, contacted, or resolved
        #[arg(value_name = "STATUS")]
        status: String,
    },

    /// Delete an enquiry (asks for confirmation)
    Delete {
        /// Enquiry ID
        #[arg(value_name = "ID")]
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Download the CSV export
    Export {
        /// Output path (default: enquiries_<date>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Submit a new enquiry (public, no login required)
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        company: Option<String>,
        /// The enquiry text
        #[arg(long)]
        message: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load().context("load config")?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::auth::login(&config, &username, password).await
        }
        Commands::Logout => commands::auth::logout(&config).await,
        Commands::Whoami => commands::auth::whoami(),
        Commands::List { search, status } => {
            commands::enquiries::list(&config, &search, &status).await
        }
        Commands::Show { id } => commands::enquiries::show(&config, &id).await,
        Commands::SetStatus { id, status } => {
            commands::enquiries::set_status(&config, &id, &status).await
        }
        Commands::Delete { id, yes } => commands::enquiries::delete(&config, &id, yes).await,
        Commands::Export { output } => commands::enquiries::export(&config, output).await,
        Commands::Submit {
            name,
            email,
            phone,
            company,
            message,
        } => commands::enquiries::submit(&config, name, email, phone, company, message).await,
        Commands::Config { command } => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
