use std::path::PathBuf;

use clap::Parser;

/// Check IPTV/stream playlists and split them into live and dead entries.
#[derive(Debug, Clone, Parser)]
#[command(name = "m3u-check", version, about)]
pub struct Cli {
    /// Playlist files (.m3u, .m3u8, .txt) or directories containing them.
    #[arg(required = true, value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// RON configuration file; command-line flags win over its values.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for the result playlists.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Number of concurrent workers.
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// HTTP request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Never run the media prober.
    #[arg(long)]
    pub no_prober: bool,

    /// Media prober binary (name on PATH or full path).
    #[arg(long, value_name = "BIN")]
    pub prober: Option<PathBuf>,

    /// Keyword that forces prober verification of matching entries (repeatable).
    #[arg(short = 'e', long = "escalate", value_name = "KEYWORD")]
    pub escalate: Vec<String>,

    /// Keep duplicate entries.
    #[arg(long)]
    pub no_dedupe: bool,

    /// Stop starting new checks after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Also write the log to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Warn;
        }
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
