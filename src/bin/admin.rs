//! Administrative API key management.
//!
//! Keys are written to the configured Supabase store; the in-memory store
//! would vanish with this process, so it is refused.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use keygate::{
    db::Database,
    models::{generate_api_key, NewApiKey, Scope},
    store::{ApiKeyStore, PostgrestStore},
    Config,
};
use std::collections::BTreeSet;

#[derive(Parser)]
#[command(name = "keygate-admin", about = "Manage keygate API keys")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and store a new active key, printing it once
    Create {
        /// Scopes granted to the key
        #[arg(long = "scope", value_parser = parse_scope, default_values = ["GENERAL"])]
        scopes: Vec<Scope>,
        /// Key version
        #[arg(long, default_value_t = 1)]
        version: u32,
    },
    /// Soft-disable a key
    Deactivate { key: String },
    /// Re-enable a key
    Activate { key: String },
    /// Replace the scope set of a key
    SetScopes {
        key: String,
        #[arg(value_parser = parse_scope, required = true)]
        scopes: Vec<Scope>,
    },
}

fn parse_scope(value: &str) -> Result<Scope, String> {
    value.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let database = config.database.as_ref().ok_or_else(|| {
        anyhow!("SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY must be set to manage keys")
    })?;
    let store = PostgrestStore::new(Database::new(database));

    match cli.command {
        Command::Create { scopes, version } => {
            let key = generate_api_key();
            let record = NewApiKey::new(&key, version, scopes)
                .map_err(|e| anyhow!(e))?
                .into_record();
            let granted = record
                .scopes
                .iter()
                .map(Scope::to_string)
                .collect::<Vec<_>>()
                .join(",");

            store
                .insert_api_key(record)
                .await
                .context("failed to store api key")?;

            println!("Created API key (version {version}, scopes {granted}):");
            println!("{key}");
        }
        Command::Deactivate { key } => {
            store
                .set_active(&key, false)
                .await
                .context("failed to deactivate api key")?;
            println!("Deactivated API key");
        }
        Command::Activate { key } => {
            store
                .set_active(&key, true)
                .await
                .context("failed to activate api key")?;
            println!("Activated API key");
        }
        Command::SetScopes { key, scopes } => {
            let scopes: BTreeSet<Scope> = scopes.into_iter().collect();
            store
                .set_scopes(&key, scopes)
                .await
                .context("failed to update api key scopes")?;
            println!("Updated API key scopes");
        }
    }

    Ok(())
}
