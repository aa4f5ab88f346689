mod cli;
mod collect;
mod fetch;
mod filename;
mod ledger;
mod logging;
mod outside;
mod report;
mod types;

use clap::Parser;
use miette::{Context, Result};
use tracing::{info, Level};

use crate::{
    cli::{Args, Command},
    ledger::Ledger,
    outside::{
        download::{BilibiliDownloader, VideoDownloader, YoutubeDownloader},
        search::YtdlSearch,
    },
    types::Platform,
};

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    logging::init_logging(level)?;

    match args.command {
        Command::Collect {
            classes_file,
            keywords,
            num_videos,
            platform,
            output,
        } => {
            let classes = collect::load_classes(&classes_file)?;
            let targets = collect::resolve_targets(&num_videos, classes.len())?;

            let backend = YtdlSearch::new(platform)?;
            let ledger = Ledger::read_or_create(&output)?;

            let (ledger, counts) = collect::collect(
                ledger,
                &classes,
                &targets,
                keywords.trim(),
                platform,
                &backend,
            )?;

            ledger.save(&output)?;
            report::print_class_counts("No. of videos by class", &counts);
            info!("Results saved to {}", output.display());
            Ok(())
        }
        Command::Fetch {
            ledger,
            platform,
            cap,
            output_root,
            ext,
        } => {
            let table = Ledger::read(&ledger)
                .wrap_err("Could not read the ledger, run `collect` first")?;

            let downloader: Box<dyn VideoDownloader> = match platform {
                Platform::Youtube => Box::new(YoutubeDownloader::new()),
                Platform::Bilibili => Box::new(BilibiliDownloader),
            };

            let (table, counts) = fetch::fetch(
                table,
                &output_root,
                cap,
                ext,
                platform,
                downloader.as_ref(),
            )?;

            table.save(&ledger)?;
            println!("No. of videos downloaded: {}", report::total(&counts));
            report::print_class_counts("No. of videos downloaded by class", &counts);
            Ok(())
        }
    }
}
