use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "syncobj")]
#[command(about = "Inspect directories and files in a sync server object store")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Storage config file, otherwise found through SYNCWERK_CENTRAL_CONF_DIR
    /// or SYNCWERK_CONF_DIR
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Decode names as text, rejecting directories with non utf-8 names
    #[arg(long)]
    pub text_names: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lists a directory
    Ls {
        repo_id: String,

        /// Directory object id
        dir_id: String,

        /// Path below the directory, `/` separated
        path: Option<String>,

        #[arg(short = 'V', long, default_value_t = 1)]
        version: u32,
    },

    /// Shows the entry at a path below a directory
    Stat {
        repo_id: String,

        /// Directory object id
        dir_id: String,

        path: String,

        #[arg(short = 'V', long, default_value_t = 1)]
        version: u32,
    },

    /// Writes file content to stdout
    Cat {
        repo_id: String,

        /// File object id
        file_id: String,

        /// Only the first N bytes
        #[arg(short, long)]
        limit: Option<u64>,

        #[arg(short = 'V', long, default_value_t = 1)]
        version: u32,
    },
}
