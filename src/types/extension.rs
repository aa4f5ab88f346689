use clap::ValueEnum;

/// Container extension for the downloaded video files
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Extension {
    Mp4,
    Mkv,
    Webm,
}

impl Extension {
    /// Return the extension with the leading dot.
    /// e.g. ".ext"
    pub fn with_dot(self) -> &'static str {
        match self {
            Extension::Mp4 => ".mp4",
            Extension::Mkv => ".mkv",
            Extension::Webm => ".webm",
        }
    }
}
