//! Command-line interface for gridmatch.

use clap::{Parser, Subcommand};
use gridmatch::{MatchId, MatchSortField, MatchStatus, MoveId, MoveSortField, PlayerId, SortKey};
use std::path::PathBuf;

/// gridmatch - N×N tic-tac-toe match records and move adjudication
#[derive(Parser, Debug)]
#[command(name = "gridmatch")]
#[command(about = "Record and adjudicate N×N tic-tac-toe matches", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "gridmatch.toml")]
    pub config: PathBuf,

    /// SQLite database file (overrides the config file and environment)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage players
    Player {
        /// Player action
        #[command(subcommand)]
        action: PlayerCommand,
    },

    /// Create and inspect matches
    Match {
        /// Match action
        #[command(subcommand)]
        action: MatchCommand,
    },

    /// Submit and inspect moves
    Move {
        /// Move action
        #[command(subcommand)]
        action: MoveCommand,
    },
}

/// Player commands
#[derive(Subcommand, Debug)]
pub enum PlayerCommand {
    /// Register a new player
    Add {
        /// Unique username
        username: String,
    },
}

/// Match commands
#[derive(Subcommand, Debug)]
pub enum MatchCommand {
    /// Start a match; side A plays X and moves first
    Create {
        /// Player on side A
        #[arg(long)]
        side_a: PlayerId,

        /// Player on side B
        #[arg(long)]
        side_b: PlayerId,

        /// Board dimension (defaults to the configured size)
        #[arg(long)]
        size: Option<u32>,

        /// Marks in a row needed to win (defaults to the configured length)
        #[arg(long)]
        win_length: Option<u32>,
    },

    /// Show a match and its board
    Show {
        /// Match id
        id: MatchId,
    },

    /// List matches
    List {
        /// Only matches with this status (InProgress or Finished)
        #[arg(long)]
        status: Option<MatchStatus>,

        /// Only matches involving this player (repeatable)
        #[arg(long = "player")]
        players: Vec<PlayerId>,

        /// Sort key as field[:asc|desc] (repeatable)
        #[arg(long)]
        sort: Vec<SortKey<MatchSortField>>,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u32,

        /// Results per page
        #[arg(long, default_value = "10")]
        page_size: u32,
    },
}

/// Move commands
#[derive(Subcommand, Debug)]
pub enum MoveCommand {
    /// Submit a move
    Submit {
        /// Match id
        #[arg(long = "match")]
        match_id: MatchId,

        /// Submitting player
        #[arg(long)]
        player: PlayerId,

        /// Column, starting at 0
        #[arg(long, allow_negative_numbers = true)]
        x: i64,

        /// Row, starting at 0
        #[arg(long, allow_negative_numbers = true)]
        y: i64,

        /// Idempotency token; resubmitting it returns the original move
        #[arg(long)]
        token: String,
    },

    /// Show a move
    Show {
        /// Move id
        id: MoveId,
    },

    /// List moves
    List {
        /// Only moves in this match
        #[arg(long = "match")]
        match_id: Option<MatchId>,

        /// Only moves by this player
        #[arg(long)]
        player: Option<PlayerId>,

        /// Sort key as field[:asc|desc] (repeatable)
        #[arg(long)]
        sort: Vec<SortKey<MoveSortField>>,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u32,

        /// Results per page
        #[arg(long, default_value = "10")]
        page_size: u32,
    },
}
