//! Command-line interface for draftsync.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// draftsync - follow and take part in a live draft room from the terminal
#[derive(Parser, Debug)]
#[command(name = "draftsync")]
#[command(about = "Terminal client for live fantasy draft rooms", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to draftsync.toml (defaults to ./draftsync.toml, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Identifies a room either by id or by its short join code.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RoomRef {
    /// Room id
    #[arg(long, required_unless_present = "code", conflicts_with = "code")]
    pub room: Option<String>,

    /// Room join code
    #[arg(long)]
    pub code: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a room and seat the host
    Create {
        /// Room display name
        #[arg(long)]
        name: String,

        /// Host user name (takes draft position 1)
        #[arg(long)]
        host: String,

        /// Seconds per pick
        #[arg(long)]
        turn_time: Option<u32>,

        /// Number of rounds
        #[arg(long)]
        rounds: Option<u32>,
    },

    /// Join a room as a participant
    Join {
        #[command(flatten)]
        room: RoomRef,

        /// User name to join as
        #[arg(long)]
        user: String,
    },

    /// Start the draft (host only)
    Start {
        #[command(flatten)]
        room: RoomRef,
    },

    /// Print a room's status, participants, and recent picks
    Room {
        #[command(flatten)]
        room: RoomRef,
    },

    /// Connect to a room and follow the draft live; type `pick <player_id>` to pick
    Watch {
        #[command(flatten)]
        room: RoomRef,

        /// User name to connect as
        #[arg(long)]
        user: String,

        /// Join the room before connecting
        #[arg(long)]
        join: bool,
    },
}
