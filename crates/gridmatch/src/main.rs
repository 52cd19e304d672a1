//! gridmatch - command-line front end
//!
//! Opens the configured SQLite database, applies migrations and runs one
//! command against the match services.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, MatchCommand, MoveCommand, PlayerCommand};
use gridmatch::{
    ChaosRule, GameConfig, MatchFilter, MatchLifecycle, MatchQuery, MoveAdjudicator, MoveFilter,
    MoveQuery, MoveSubmission, PageRequest, SqliteStore,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = GameConfig::load_or_default(&cli.config)?;
    if let Some(url) = cli.database_url {
        config = config.with_database_url(url);
    }
    info!(database_url = %config.database_url(), "Opening database");

    let store = Arc::new(SqliteStore::new(config.database_url().clone())?);
    store.run_migrations()?;

    match cli.command {
        Command::Player { action } => run_player(&store, action).await,
        Command::Match { action } => run_match(&store, &config, action).await,
        Command::Move { action } => run_move(&store, &config, action).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Player subcommands
#[instrument(skip(store))]
async fn run_player(store: &Arc<SqliteStore>, action: PlayerCommand) -> Result<()> {
    match action {
        PlayerCommand::Add { username } => {
            let participant = store.register_player(username).await?;
            print_json(&participant)
        }
    }
}

/// Match subcommands
#[instrument(skip(store, config))]
async fn run_match(
    store: &Arc<SqliteStore>,
    config: &GameConfig,
    action: MatchCommand,
) -> Result<()> {
    let lifecycle = MatchLifecycle::new(store.clone(), store.clone());
    match action {
        MatchCommand::Create {
            side_a,
            side_b,
            size,
            win_length,
        } => {
            let size = size.unwrap_or(*config.board().size());
            let win_length = win_length.unwrap_or(*config.board().win_length());
            let created = lifecycle.create_match(side_a, side_b, size, win_length).await?;
            print_json(&created)
        }
        MatchCommand::Show { id } => {
            let game = lifecycle.get_match(id).await?;
            print_json(&game)?;
            println!();
            println!("{}", game.board()?.display());
            Ok(())
        }
        MatchCommand::List {
            status,
            players,
            sort,
            page,
            page_size,
        } => {
            let query = MatchQuery::new(
                MatchFilter::new(status, players),
                sort,
                PageRequest::new(page, page_size)?,
            );
            debug!(?query, "Listing matches");
            print_json(&lifecycle.search_matches(&query).await?)
        }
    }
}

/// Move subcommands
#[instrument(skip(store, config))]
async fn run_move(
    store: &Arc<SqliteStore>,
    config: &GameConfig,
    action: MoveCommand,
) -> Result<()> {
    let chaos = Arc::new(ChaosRule::from_config(config.chaos()));
    let adjudicator = MoveAdjudicator::new(store.clone(), store.clone(), chaos);
    match action {
        MoveCommand::Submit {
            match_id,
            player,
            x,
            y,
            token,
        } => {
            let receipt = adjudicator
                .submit_move(MoveSubmission::new(match_id, player, x, y, token))
                .await?;
            println!("ETag: {}", receipt.fingerprint().etag());
            print_json(&receipt)
        }
        MoveCommand::Show { id } => {
            let record = adjudicator.get_move(id).await?;
            println!("ETag: {}", gridmatch::Fingerprint::of(&record).etag());
            print_json(&record)
        }
        MoveCommand::List {
            match_id,
            player,
            sort,
            page,
            page_size,
        } => {
            let query = MoveQuery::new(
                MoveFilter::new(match_id, player),
                sort,
                PageRequest::new(page, page_size)?,
            );
            debug!(?query, "Listing moves");
            print_json(&adjudicator.search_moves(&query).await?)
        }
    }
}
