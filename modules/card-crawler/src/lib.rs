pub mod card;
pub mod classifier;
pub mod config;
pub mod emitter;
pub mod error;
pub mod feed;
pub mod images;
pub mod notify;
pub mod scheduler;
pub mod source;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod tracker;
pub mod types;

pub use config::Config;
pub use error::{CrawlError, Result};
