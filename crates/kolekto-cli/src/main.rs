//! # kolekto CLI
//!
//! Command-line interface for Kolekto movie catalog trees.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kolekto_config::{init_logging, LogLevel};

mod commands;
mod datasource;
mod format;

use commands::{dump, gc, import, link, list, movie, tree};

/// Kolekto - content-addressed movie catalog
#[derive(Parser)]
#[command(name = "kolekto")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Root of the kolekto tree (default: the tree enclosing the current directory)
    #[arg(long, global = true, env = "KOLEKTO_TREE", value_name = "DIR")]
    tree: Option<PathBuf>,

    /// Increase logging verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new kolekto tree
    Init,

    /// Import movies into the tree
    Import(import::ImportArgs),

    /// Synchronize view links with the index
    Link(link::LinkArgs),

    /// Delete store entries no movie references
    Gc(gc::GcArgs),

    /// Remove a movie from the index
    Rm(movie::MovieArgs),

    /// List movies
    List,

    /// Show the metadata of a movie
    Show(movie::MovieArgs),

    /// Re-query the datasources for one movie, or every movie
    Refresh(movie::RefreshArgs),

    /// Dump the index as JSON
    Dump,

    /// Restore the index from a JSON dump
    Restore(dump::RestoreArgs),

    /// Collection statistics
    Stats,

    /// Find movies imported more than once
    FindDuplicates,

    /// Mark a movie as watched
    Watch(movie::FlagArgs),

    /// Mark a movie as favorite
    Favorite(movie::FlagArgs),

    /// Mark a movie as crap
    Crap(movie::FlagArgs),

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(LogLevel::from_verbosity(cli.verbose));

    let tree = cli.tree.as_deref();
    match cli.command {
        Commands::Init => tree::init(tree),
        Commands::Config => tree::config(&commands::open(tree)?),
        Commands::Import(args) => import::run(&commands::open(tree)?, args),
        Commands::Link(args) => link::run(&commands::open(tree)?, args),
        Commands::Gc(args) => gc::run(&commands::open(tree)?, args),
        Commands::Rm(args) => movie::rm(&commands::open(tree)?, args),
        Commands::Show(args) => movie::show(&commands::open(tree)?, args),
        Commands::Refresh(args) => movie::refresh(&commands::open(tree)?, args),
        Commands::Watch(args) => movie::flag(&commands::open(tree)?, kolekto_tree::Flag::Watch, args),
        Commands::Favorite(args) => movie::flag(&commands::open(tree)?, kolekto_tree::Flag::Favorite, args),
        Commands::Crap(args) => movie::flag(&commands::open(tree)?, kolekto_tree::Flag::Crap, args),
        Commands::List => list::list(&commands::open(tree)?),
        Commands::Stats => list::stats(&commands::open(tree)?),
        Commands::FindDuplicates => list::find_duplicates(&commands::open(tree)?),
        Commands::Dump => dump::dump(&commands::open(tree)?),
        Commands::Restore(args) => dump::restore(&commands::open(tree)?, args),
    }
}
