//! CLI command implementations.

mod ask;
mod config;
mod delete;
mod list;
mod process;
mod search;
mod serve;
mod stats;
mod summary;

pub use ask::run_ask;
pub use config::run_config;
pub use delete::run_delete;
pub use list::run_list;
pub use process::run_process;
pub use search::run_search;
pub use serve::run_serve;
pub use stats::run_stats;
pub use summary::run_summary;
