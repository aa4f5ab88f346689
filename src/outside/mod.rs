pub mod command;
pub mod download;
pub mod search;
