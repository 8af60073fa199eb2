//! `puerta` command line: run the door service and administer it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use puerta_core::{Schedule, Ttl};
use puerta_server::Config;
use puerta_server::commands::{self, NewUser};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "puerta")]
#[command(version, about = "Door access over HTTP with passwords and passkeys", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Server {
        /// Config file path
        #[arg(short, long, default_value = "./config.toml")]
        config: PathBuf,

        /// Database path, overriding the config file
        #[arg(long)]
        db: Option<String>,
    },

    /// Pair with a Philips Hue bridge and list its lights
    HueSetup {
        /// Bridge address
        #[arg(long)]
        ip: String,

        /// Name this application registers under on the bridge
        #[arg(long, default_value = "puerta#server")]
        devicetype: String,

        /// Existing bridge username, skips pairing
        #[arg(long)]
        username: Option<String>,
    },

    /// Create a user
    UserCreate {
        handle: String,
        name: String,
        password: String,

        /// Config file path, used to find the database
        #[arg(short, long, default_value = "./config.toml")]
        config: PathBuf,

        /// Database path, overriding the config file
        #[arg(long)]
        db: Option<String>,

        /// Maximum session lifetime, e.g. `7d` or `12h`
        #[arg(long)]
        ttl: Option<Ttl>,

        /// Access ends at this instant (RFC 3339)
        #[arg(long)]
        expires: Option<DateTime<Utc>>,

        /// Allowed days and hours, e.g. `days=1-5 hours=9-17`
        #[arg(long)]
        schedule: Option<Schedule>,

        /// Text shown after logging in
        #[arg(long, default_value = "")]
        greeting: String,

        #[arg(long)]
        admin: bool,

        /// Require a passkey on every entry
        #[arg(long)]
        require_2fa: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info,puerta=debug" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Config file contents, or the defaults when the file does not exist.
fn load_config(path: &Path, db: Option<String>) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path).with_context(|| format!("loading {}", path.display()))?
    } else {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };
    if let Some(db) = db {
        config.db = db;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Server { config, db } => {
            let config = load_config(&config, db)?;
            puerta_server::serve(config).await?;
        }
        Commands::HueSetup {
            ip,
            devicetype,
            username,
        } => {
            let (username, lights) = commands::hue_setup(&ip, &devicetype, username).await?;
            println!("username: {username}");
            println!();
            println!("{:<6} {:<24} {:<24} product", "id", "name", "type");
            for light in lights {
                println!(
                    "{:<6} {:<24} {:<24} {}",
                    light.id, light.name, light.kind, light.product
                );
            }
        }
        Commands::UserCreate {
            handle,
            name,
            password,
            config,
            db,
            ttl,
            expires,
            schedule,
            greeting,
            admin,
            require_2fa,
        } => {
            let config = load_config(&config, db)?;
            let id = commands::create_user(
                &config.db,
                NewUser {
                    handle: handle.clone(),
                    name,
                    password,
                    greeting,
                    ttl,
                    expires,
                    schedule,
                    is_admin: admin,
                    require_2fa,
                },
            )
            .await?;
            println!("created user {handle} with id {id}");
        }
    }

    Ok(())
}
