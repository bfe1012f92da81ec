pub mod agents;
#[cfg(feature = "server")]
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod llm;
pub mod tracker;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use config::OutreachConfig;
pub use core::{OutreachEngine, OutreachPipeline, OutreachRunner, RunSummary};
pub use utils::error::{OutreachError, Result};
