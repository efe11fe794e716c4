//! FPKGi - content catalog engine and download lifecycle for a PS4 package browser

pub mod app;
pub mod constants;
pub mod downloads;
pub mod errors;
pub mod loader;
pub mod settings;
pub mod store;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use app::App;
pub use errors::{Error, Result};
