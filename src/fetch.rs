use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use miette::{Context, IntoDiagnostic, Result};
use tracing::{debug, info, warn};

use crate::{
    filename::derive_video_name,
    ledger::Ledger,
    outside::download::VideoDownloader,
    report::ClassCount,
    types::{Extension, Platform},
};

/// Attempt to materialize every not-yet-downloaded record under
/// `output_root/<class_id>/`, honoring the optional per-class cap on
/// accumulated successful downloads.
///
/// Files already on disk are marked up front and never re-requested, so
/// re-running the command retries only the previously failed rows. Rows
/// skipped because of the cap stay unmarked: not attempted, not failed.
pub fn fetch(
    mut ledger: Ledger,
    output_root: &Path,
    cap: Option<usize>,
    ext: Extension,
    platform: Platform,
    downloader: &dyn VideoDownloader,
) -> Result<(Ledger, Vec<ClassCount>)> {
    fill_missing_names(&mut ledger, platform);
    mark_existing_files(&mut ledger, output_root)?;

    fs::create_dir_all(output_root)
        .into_diagnostic()
        .wrap_err("Could not create the output root directory")?;

    let mut counts = Vec::new();

    for (class_id, class) in ledger.classes() {
        let class_dir = output_root.join(class_id.to_string());
        fs::create_dir_all(&class_dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not create the directory of class '{class}'"))?;

        let mut achieved = ledger.downloaded_in_class(class_id);

        for record in ledger.records_mut() {
            if record.class_id != class_id {
                continue;
            }
            if cap.is_some_and(|cap| achieved >= cap) {
                break;
            }
            if record.download {
                continue;
            }

            info!("Downloading {} ({})", record.video_name, record.video_url);
            let outcome =
                downloader.download(&record.video_url, &record.video_name, ext, &class_dir);

            if outcome.is_completed() {
                record.download = true;
                achieved += 1;
            } else {
                warn!("Download of {} failed: {outcome:?}", record.video_url);
            }
        }

        // Only removes the directory when it ended up empty
        // (a cap of zero, or every attempt failed)
        let _ = fs::remove_dir(&class_dir);

        counts.push(ClassCount {
            class_id,
            class,
            count: achieved,
        });
    }

    if counts.iter().map(|c| c.count).sum::<usize>() == 0 {
        debug!("Nothing was downloaded, removing the output root");
        let _ = fs::remove_dir(output_root);
    }

    Ok((ledger, counts))
}

/// Ledgers written by older tooling may lack the `video_name` column.
/// Derive the stems before anything touches the filesystem.
fn fill_missing_names(ledger: &mut Ledger, platform: Platform) {
    for record in ledger.records_mut() {
        if record.video_name.is_empty() {
            record.video_name =
                derive_video_name(platform, &record.video_url, &record.video_title);
        }
    }
}

/// Scan the output tree once up front and flag every record whose stem is
/// already present in its class directory, so that no request is ever
/// issued for it.
fn mark_existing_files(ledger: &mut Ledger, output_root: &Path) -> Result<()> {
    if !output_root.is_dir() {
        return Ok(());
    }

    // class_id -> file stems on disk
    let mut on_disk: HashMap<u32, HashSet<String>> = HashMap::new();

    for entry in fs::read_dir(output_root).into_diagnostic()? {
        let entry = entry.into_diagnostic()?;
        let Ok(class_id) = entry.file_name().to_string_lossy().parse::<u32>() else {
            continue;
        };
        if !entry.path().is_dir() {
            continue;
        }

        let stems = on_disk.entry(class_id).or_default();
        for file in fs::read_dir(entry.path()).into_diagnostic()? {
            let file = file.into_diagnostic()?;
            if let Some(stem) = file.path().file_stem().and_then(|s| s.to_str()) {
                stems.insert(stem.to_string());
            }
        }
    }

    for record in ledger.records_mut() {
        if record.download {
            continue;
        }
        if on_disk
            .get(&record.class_id)
            .is_some_and(|stems| stems.contains(&record.video_name))
        {
            debug!(
                "{} is already on disk, marking it as downloaded",
                record.video_name
            );
            record.download = true;
        }
    }

    Ok(())
}
