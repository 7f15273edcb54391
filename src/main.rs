//! Fintrack command-line entry point

mod commands;

use clap::{Parser, Subcommand};
use fintrack_config::{Config, DateRangePreset};
use std::path::PathBuf;
use tokio::runtime::Runtime;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "fintrack")]
#[command(author = "Fintrack Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Track bank accounts, transactions and monthly spending", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a default configuration file
    Config,
    /// Sign in and store the access token
    Login { email: String, password: String },
    /// Forget the stored access token
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage bank accounts
    #[command(subcommand)]
    Accounts(AccountCommand),
    /// Manage transactions
    #[command(subcommand)]
    Transactions(TransactionCommand),
    /// Monthly income and expenses
    Analytics {
        /// 7d, 30d, this-month, last-month, this-year or all
        #[arg(short, long)]
        range: Option<DateRangePreset>,
        #[arg(short, long)]
        account: Option<Uuid>,
    },
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// List accounts
    List {
        /// Include deactivated accounts
        #[arg(long)]
        all: bool,
    },
    /// Link a new account
    Add {
        /// checking, savings, credit or investment
        #[arg(short = 't', long = "type", default_value = "")]
        account_type: String,
        #[arg(long, default_value = "")]
        access_token: String,
        #[arg(short, long, default_value = "")]
        name: String,
        #[arg(short, long, default_value = "")]
        identifier: String,
        #[arg(long, default_value = "")]
        refresh_token: String,
    },
    /// Change an account's display name
    Rename { id: Uuid, name: String },
    /// Stop syncing an account without deleting it
    Deactivate { id: Uuid },
    /// Delete an account
    Remove { id: Uuid },
}

#[derive(Subcommand, Debug)]
enum TransactionCommand {
    /// List transactions
    List {
        #[arg(short, long)]
        account: Option<Uuid>,
        /// 7d, 30d, this-month, last-month, this-year or all
        #[arg(short, long)]
        range: Option<DateRangePreset>,
    },
    /// Record a transaction; negative amounts are expenses
    Add {
        #[arg(short, long, default_value = "")]
        account: String,
        #[arg(long, default_value = "", allow_hyphen_values = true)]
        amount: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Change the amount or description of a transaction
    Edit {
        id: Uuid,
        #[arg(long, allow_hyphen_values = true)]
        amount: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a transaction
    Remove { id: Uuid },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let loaded = Config::load_or_default(&args.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.to_details());
            std::process::exit(2);
        }
    };
    log::debug!("Config loaded: api={}", config.api.base_url);

    let rt = Runtime::new()?;
    let result = rt.block_on(commands::run(&config, args.command));

    if let Err(e) = result {
        match e.downcast_ref::<fintrack_core::ClientError>() {
            Some(client_error) => eprintln!("{}", client_error.to_details()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }

    Ok(())
}
