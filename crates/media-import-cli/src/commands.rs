use clap::{Parser, Subcommand, ValueEnum};
use media_import_core::ScanMode;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "media-import")]
#[command(about = "Find new media files and skip what was already imported", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Hash every candidate
    ContentHash,
    /// Reuse recorded identities for unchanged files
    History,
}

impl From<ModeArg> for ScanMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::ContentHash => ScanMode::ContentHash,
            ModeArg::History => ScanMode::History,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory and report new files and duplicates
    Scan {
        directory: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::ContentHash)]
        mode: ModeArg,
        /// Only look at the top level of the directory
        #[arg(long)]
        no_recursive: bool,
        /// Print every classified file
        #[arg(long)]
        list: bool,
        /// Print statistics and entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scan a directory and record every new file in the import history
    Import {
        directory: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::History)]
        mode: ModeArg,
        #[arg(long)]
        no_recursive: bool,
    },
    /// Display the number of distinct identities in the import history
    HistoryCount,
    /// Delete every import record
    ClearHistory,
    /// Print configuration values
    PrintConfig,
}
