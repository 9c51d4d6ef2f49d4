mod app;
mod cli;

use crate::app::{App, Schema};
use crate::cli::{Cli, Command, StorageBackendArg};
use anyhow::Context;
use clap::Parser;
use snip_core::MappingStore;
use snip_generator::RandomGenerator;
use snip_storage::{InMemoryStore, MySqlStore};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse();
    snip_telemetry::init(config.log_format.into())?;

    info!(
        storage_backend = %config.storage,
        base_url = %config.base_url,
        alias_length = config.alias_length,
        "starting snip"
    );

    let generator = RandomGenerator::new(config.alias_length)
        .context("invalid alias length")?
        .with_alphabet(config.alphabet.into());

    match config.storage {
        StorageBackendArg::InMemory => {
            run(InMemoryStore::new(), generator, config.base_url, config.command).await
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlStore::connect(&mysql_dsn)
                .await
                .context("failed to connect to mysql")?;
            run(store, generator, config.base_url, config.command).await
        }
    }
}

async fn run<S: MappingStore + Schema>(
    store: S,
    generator: RandomGenerator,
    base_url: String,
    command: Command,
) -> anyhow::Result<()> {
    let app = App::new(store, generator, base_url);
    let output = app.execute(command).await?;
    println!("{}", output.render()?);
    Ok(())
}
