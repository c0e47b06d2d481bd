pub mod archive;
pub mod backup;
pub mod config;
pub mod constants;
pub mod context;
pub mod downloader;
pub mod error;
pub mod installer;
pub mod lock;
pub mod models;
pub mod release;
pub mod retention;
pub mod settings;
pub mod signature;
pub mod tree;
pub mod version;
pub mod webhook;

#[cfg(test)]
mod test_support;

pub use error::{Result, UpdaterError};
