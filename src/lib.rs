//! webroot library
//!
//! Builds a web UI into a fixed output directory. Every module is routed
//! into an output chunk by an ordered, inspectable rule table (see
//! [`router`]); the rest of the crate walks the module graph, writes the
//! chunks and serves them during development.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod resolver;
pub mod router;
pub mod server;
pub mod utils;

pub use bundler::Bundler;
pub use cli::Cli;
pub use config::Config;
pub use router::{route, PartitionName, RoutingDecision, RuleTable};
