use std::collections::HashSet;

use miette::{Context, IntoDiagnostic, Result};
use tracing::debug;

use super::command::{assert_success_command, run_command, Capture, YT_DL, YT_DLP};
use crate::types::Platform;

/// One scraped search result.
///
/// The `(title, url)` pair is the identity key of a result: the search
/// page does not expose a persistent video id at this level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// Interface for querying a platform for candidate videos
pub trait SearchBackend {
    /// Search for up to `count` videos matching `keywords`, excluding any
    /// hit whose `(title, url)` pair is in `omit`.
    ///
    /// Returning fewer than `count` hits is not an error: the platform may
    /// simply not have that many distinct results.
    fn search(
        &self,
        keywords: &str,
        count: usize,
        omit: &HashSet<(String, String)>,
    ) -> Result<Vec<SearchHit>>;
}

/// Search backed by the downloader's search pseudo-URLs
/// (`ytsearchN:` for YouTube, `bilisearchN:` for Bilibili)
pub struct YtdlSearch {
    program: &'static str,
    prefix: &'static str,
}

impl YtdlSearch {
    /// Verify that the `yt-dlp` or `youtube-dl` binaries are reachable
    pub fn new(platform: Platform) -> Result<Self> {
        let prefix = match platform {
            Platform::Youtube => "ytsearch",
            Platform::Bilibili => "bilisearch",
        };

        // Check `yt-dlp`, then fall back to `youtube-dl`
        if assert_success_command(YT_DLP, |cmd| cmd.arg("--version")).is_ok() {
            Ok(Self {
                program: YT_DLP,
                prefix,
            })
        } else if assert_success_command(YT_DL, |cmd| cmd.arg("--version")).is_ok() {
            Ok(Self {
                program: YT_DL,
                prefix,
            })
        } else {
            miette::bail!("Neither yt-dlp nor youtube-dl found")
        }
    }
}

impl SearchBackend for YtdlSearch {
    fn search(
        &self,
        keywords: &str,
        count: usize,
        omit: &HashSet<(String, String)>,
    ) -> Result<Vec<SearchHit>> {
        // Ask for enough extra results to still reach `count` once the
        // omitted pairs are filtered out
        let requested = count + omit.len();
        let query = format!("{}{}:{}", self.prefix, requested, keywords);

        let res = run_command(
            self.program,
            |cmd| {
                cmd.arg("-q")
                    .arg("--flat-playlist")
                    .arg("-j")
                    .arg("--")
                    .arg(&query)
            },
            Capture::STDOUT,
        )?;

        if !res.status.success() {
            miette::bail!("{} search did run but was not successful", self.program);
        }

        let stdout = String::from_utf8_lossy(&res.stdout);
        parse_hits(&stdout, count, omit)
    }
}

/// Parse the one-JSON-object-per-line output of a flat playlist dump,
/// dropping entries without a URL and omitted `(title, url)` pairs.
fn parse_hits(
    stdout: &str,
    count: usize,
    omit: &HashSet<(String, String)>,
) -> Result<Vec<SearchHit>> {
    let mut seen = omit.clone();
    let mut hits = Vec::new();

    for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
        let json: serde_json::Value = serde_json::from_str(line)
            .into_diagnostic()
            .wrap_err("Could not parse search output as JSON")?;

        let url = json
            .get("url")
            .or_else(|| json.get("webpage_url"))
            .and_then(|v| v.as_str());
        let Some(url) = url else {
            debug!("Skipping a search entry without URL");
            continue;
        };

        let title = json
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        if !seen.insert((title.to_string(), url.to_string())) {
            continue;
        }

        hits.push(SearchHit {
            title: title.to_string(),
            url: url.to_string(),
        });
        if hits.len() >= count {
            break;
        }
    }

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::parse_hits;

    const OUTPUT: &str = concat!(
        r#"{"title": "A cat", "url": "https://www.youtube.com/watch?v=a"}"#,
        "\n",
        r#"{"title": "No url here"}"#,
        "\n",
        r#"{"title": "B cat", "url": "https://www.youtube.com/watch?v=b"}"#,
        "\n",
        r#"{"title": "C cat", "url": "https://www.youtube.com/watch?v=c"}"#,
        "\n",
    );

    #[test]
    fn drops_entries_without_url_and_truncates() {
        let hits = parse_hits(OUTPUT, 2, &HashSet::new()).unwrap();

        let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, ["A cat", "B cat"]);
    }

    #[test]
    fn filters_omitted_pairs() {
        let omit = HashSet::from([(
            "A cat".to_string(),
            "https://www.youtube.com/watch?v=a".to_string(),
        )]);

        let hits = parse_hits(OUTPUT, 5, &omit).unwrap();

        let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, ["B cat", "C cat"]);
    }

    #[test]
    fn deduplicates_repeated_results() {
        let doubled = format!("{OUTPUT}{OUTPUT}");
        let hits = parse_hits(&doubled, 10, &HashSet::new()).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn rejects_malformed_output() {
        assert!(parse_hits("not json", 1, &HashSet::new()).is_err());
    }
}
