use std::error::Error;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use log::debug;

use syncobj::{Child, DirEntry, DirectoryTree, Manager, NameMode, ObjectId, StorageConfig};

mod cli;
use crate::cli::Cli;
use crate::cli::Commands;

type CliResult<T> = std::result::Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let cfg = match &cli.config {
        Some(path) => StorageConfig::load(path)?,
        None => StorageConfig::from_env()?,
    };
    let mgr = Manager::from_config(&cfg, None)?;
    let mode = if cli.text_names {
        NameMode::Text
    } else {
        NameMode::Bytes
    };

    match cli.command {
        Commands::Ls {
            repo_id,
            dir_id,
            path,
            version,
        } => {
            let root = mgr.load_directory_with(&repo_id, version, &dir_id.parse::<ObjectId>()?, mode)?;
            let dir = walk(&mgr, root, path.as_deref().unwrap_or(""))?;

            for entry in dir.entries() {
                print_entry(entry);
            }
        }
        Commands::Stat {
            repo_id,
            dir_id,
            path,
            version,
        } => {
            let trimmed = path.trim_end_matches('/');
            let (parent, name) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));

            let root = mgr.load_directory_with(&repo_id, version, &dir_id.parse::<ObjectId>()?, mode)?;
            let dir = walk(&mgr, root, parent)?;
            let entry = dir
                .lookup_dent(name)
                .ok_or_else(|| format!("{}: no such entry", path))?;
            print_entry(entry);

            if entry.is_file() {
                let file = mgr.load_file(&repo_id, version, &entry.id)?;
                println!("blocks: {}", file.block_ids().len());
                for id in file.block_ids() {
                    println!("  {}", id);
                }
            }
        }
        Commands::Cat {
            repo_id,
            file_id,
            limit,
            version,
        } => {
            let id: ObjectId = file_id.parse()?;
            let file = mgr.load_file(&repo_id, version, &id)?;
            let content = file.get_content(mgr.blocks(), limit)?;

            let mut stdout = io::stdout().lock();
            stdout.write_all(&content)?;
            stdout.flush()?;
        }
    }

    debug!(
        "loaded {} directories, {} files",
        mgr.dir_read_count(),
        mgr.file_read_count()
    );
    Ok(())
}

// Follows `path` down from `root`, every component has to be a directory
fn walk(mgr: &Manager, root: DirectoryTree, path: &str) -> CliResult<DirectoryTree> {
    let mut dir = root;
    for name in path.split('/').filter(|c| !c.is_empty()) {
        dir = match dir.lookup(mgr, name)? {
            Some(Child::Dir(sub)) => sub,
            Some(Child::File(_)) => return Err(format!("{}: not a directory", name).into()),
            None => return Err(format!("{}: no such entry", name).into()),
        };
    }
    Ok(dir)
}

fn print_entry(entry: &DirEntry) {
    let kind = if entry.is_dir() { 'd' } else { '-' };
    println!(
        "{} {} {:>12} {:>12} {}",
        kind,
        entry.id,
        entry.size,
        entry.mtime,
        entry.name_lossy()
    );
}
