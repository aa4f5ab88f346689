use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::{Extension, Platform};

macro_rules! arg_env {
    ($v:literal) => {
        concat!("VIDSET_", $v)
    };
}

/// Build small per-class video datasets: search a platform for candidate
/// video URLs, then download them with cross-run resume.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Log debug information
    #[arg(long, global = true, env = arg_env!("VERBOSE"))]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search the platform for candidate videos and record them in the ledger
    Collect {
        /// Text file containing one class name per line
        classes_file: PathBuf,

        /// Additional search keywords appended to every class query
        #[arg(short, long, default_value = "", env = arg_env!("KEYWORDS"))]
        keywords: String,

        /// Target number of videos per class: either a single value applied
        /// to all classes, or exactly one value per class
        #[arg(short, long, num_args = 1.., default_values_t = [5])]
        num_videos: Vec<usize>,

        /// Platform to search
        #[arg(short, long, value_enum, default_value_t = Platform::Youtube, env = arg_env!("PLATFORM"))]
        platform: Platform,

        /// Path of the ledger CSV file
        #[arg(short, long, default_value = "data/annotations/urls.csv", env = arg_env!("LEDGER"))]
        output: PathBuf,
    },

    /// Download the videos recorded in the ledger
    Fetch {
        /// Path of the ledger CSV file written by `collect`
        ledger: PathBuf,

        /// Platform to download from
        #[arg(value_enum)]
        platform: Platform,

        /// Maximum number of downloaded videos to accumulate per class
        #[arg(long, env = arg_env!("CAP"))]
        cap: Option<usize>,

        /// Root directory for the downloaded videos
        #[arg(short, long, default_value = "data/videos", env = arg_env!("OUT"))]
        output_root: PathBuf,

        /// Container extension of the downloaded files
        #[arg(long, value_enum, default_value_t = Extension::Mp4, env = arg_env!("EXT"))]
        ext: Extension,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::Args;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
