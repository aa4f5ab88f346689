use clap::ValueEnum;

/// Video platform handled by the tool.
///
/// Any other platform name is rejected at argument parsing time,
/// before any ledger or network side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Platform {
    Youtube,
    Bilibili,
}
