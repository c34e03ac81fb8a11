//! Feastly CLI - command-line storefront client.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (session persists under STOREFRONT_STATE_DIR)
//! feastly login -e mona@feastly.test -p hunter2
//!
//! # Browse the menu
//! feastly menu
//!
//! # Order a large margherita with cheese, twice, plus a cola
//! feastly order -a "12 Nile St" -i p1:lg+Cheese -i p1:lg+Cheese -i p9
//!
//! # Active orders only
//! feastly orders --active
//!
//! # Any other endpoint, with session refresh
//! feastly request GET /users/me
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `logout`, `whoami` - Account and session
//! - `menu` - List products by category
//! - `order` - Build a cart and place it
//! - `orders` - Order history
//! - `request` - Raw authenticated request

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use feastly_storefront::{ClientConfig, LogFormat, StorefrontClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "feastly")]
#[command(author, version, about = "Feastly storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create a customer account
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List the menu grouped by category
    Menu {
        /// Show best sellers only
        #[arg(long)]
        best_sellers: bool,
    },
    /// Build a cart from item specs and place the order
    Order {
        /// Delivery address
        #[arg(short, long)]
        address: String,

        /// `product[:size][+extra...]`; repeat to add more, identical specs merge
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,

        /// `cash` or `card`
        #[arg(long, default_value = "cash")]
        payment: String,

        /// Build and price the cart without placing the order
        #[arg(long)]
        dry_run: bool,
    },
    /// List your orders
    Orders {
        /// Only orders still in progress
        #[arg(long)]
        active: bool,
    },
    /// Send an arbitrary request through the session
    Request {
        /// HTTP method (GET, POST, PUT, DELETE, ...)
        method: String,

        /// Path relative to the API base URL
        path: String,

        /// JSON body
        #[arg(short, long)]
        data: Option<String>,
    },
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "feastly=info,feastly_storefront=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(LogFormat::default());
            tracing::error!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    init_tracing(config.log_format);

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = StorefrontClient::from_config(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&client, &email, password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
        } => commands::account::register(&client, &name, &email, password).await?,
        Commands::Logout => client.logout().await,
        Commands::Whoami => commands::account::whoami(&client)?,
        Commands::Menu { best_sellers } => commands::menu::list(&client, best_sellers).await?,
        Commands::Order {
            address,
            items,
            payment,
            dry_run,
        } => {
            let order = commands::order::OrderArgs {
                address,
                items,
                payment,
                dry_run,
            };
            commands::order::place(&client, order).await?;
        }
        Commands::Orders { active } => commands::order::history(&client, active).await?,
        Commands::Request { method, path, data } => {
            commands::request::send(&client, &method, &path, data.as_deref()).await?;
        }
    }
    Ok(())
}
