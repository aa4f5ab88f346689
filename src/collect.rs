use std::{fs, path::Path};

use miette::{Context, IntoDiagnostic, Result};
use tracing::{info, warn};

use crate::{
    filename::derive_video_name,
    ledger::{Ledger, VideoRecord},
    outside::search::SearchBackend,
    report::ClassCount,
    types::Platform,
};

/// Load the class names: one per line, trimmed, blanks dropped, then
/// sorted so that enumeration order (and thus `class_id`) is stable.
pub fn load_classes(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not read classes file {}", path.display()))?;

    let mut classes: Vec<String> = content
        .lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    classes.sort();
    Ok(classes)
}

/// Resolve the per-class target counts: a single value is broadcast to
/// all classes, otherwise exactly one value per class is required.
pub fn resolve_targets(values: &[usize], n_classes: usize) -> Result<Vec<usize>> {
    match values {
        [single] => Ok(vec![*single; n_classes]),
        _ if values.len() == n_classes => Ok(values.to_vec()),
        _ => miette::bail!(
            "Expected 1 or {n_classes} target counts, got {}",
            values.len()
        ),
    }
}

/// Search for candidate videos of every class and append the new ones to
/// the ledger.
///
/// Classes that already meet their target are skipped without a query.
/// A backend error degrades to zero new hits for that class, it never
/// aborts the run.
pub fn collect(
    mut ledger: Ledger,
    classes: &[String],
    targets: &[usize],
    keywords: &str,
    platform: Platform,
    backend: &dyn SearchBackend,
) -> Result<(Ledger, Vec<ClassCount>)> {
    debug_assert_eq!(classes.len(), targets.len());

    let mut counts = Vec::with_capacity(classes.len());

    for (class_id, class) in classes.iter().enumerate() {
        let class_id = class_id as u32;
        let target = targets[class_id as usize];
        let existing = ledger.class_len(class_id);

        if existing >= target {
            info!("Class '{class}' already has {existing} videos, skipping search");
            counts.push(ClassCount {
                class_id,
                class: class.clone(),
                count: existing,
            });
            continue;
        }

        let query = if keywords.is_empty() {
            class.clone()
        } else {
            format!("{class} {keywords}")
        };

        info!("Searching for {} videos of '{query}'", target - existing);

        let omit = ledger.omit_pairs(class_id);
        let hits = match backend.search(&query, target - existing, &omit) {
            Ok(hits) => hits,
            Err(report) => {
                warn!("Search for '{query}' failed: {report}");
                Vec::new()
            }
        };

        let mut seen = omit;
        let mut video_id = ledger.next_video_id(class_id);
        let mut achieved = existing;

        for hit in hits {
            if achieved >= target {
                break;
            }
            // The backend is opaque, enforce the dedup key here as well
            if !seen.insert((hit.title.clone(), hit.url.clone())) {
                continue;
            }

            let video_name = derive_video_name(platform, &hit.url, &hit.title);
            ledger.push(VideoRecord {
                class_id,
                class: class.clone(),
                video_id,
                video_title: hit.title,
                video_url: hit.url,
                video_name,
                download: false,
            });
            video_id += 1;
            achieved += 1;
        }

        counts.push(ClassCount {
            class_id,
            class: class.clone(),
            count: achieved,
        });
    }

    ledger.sort();
    Ok((ledger, counts))
}
