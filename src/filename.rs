use heck::ToSnakeCase;
use url::Url;

use crate::types::Platform;

/// Derive the filesystem-safe output filename stem for a video.
///
/// The stem is taken from the platform's video identifier in the URL:
/// - YouTube: the `v` query parameter of a `watch` URL, otherwise the last
///   path segment of the short forms (`youtu.be/<id>`, `/shorts/<id>`,
///   `/embed/<id>`).
/// - Bilibili: the last non-empty path segment (the `BV…` id).
///
/// Malformed URLs, missing identifiers and empty path segments all fall
/// back to the snake_cased video title; an empty title yields `"video"`.
/// The result never contains path separators.
pub fn derive_video_name(platform: Platform, url: &str, title: &str) -> String {
    let from_url = match platform {
        Platform::Youtube => youtube_id(url),
        Platform::Bilibili => last_path_segment(url),
    };

    from_url.unwrap_or_else(|| {
        let slug = title.to_snake_case();
        if slug.is_empty() {
            "video".to_string()
        } else {
            slug
        }
    })
}

fn youtube_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;

    if let Some(id) = parsed
        .query_pairs()
        .find(|(name, _)| name == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
    {
        return Some(id);
    }

    // The short forms keep the id as the last path segment.
    // A bare `watch` URL without its parameter carries no id at all.
    last_parsed_segment(&parsed).filter(|segment| segment != "watch")
}

fn last_path_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    last_parsed_segment(&parsed)
}

fn last_parsed_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}
