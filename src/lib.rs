//! Fleet: a compiler and execution protocol for repository agents.
//!
//! A set of agent definitions compiles into one CI workflow document. At
//! run time the document's nodes call back into this crate to decide which
//! agents an event admits, to apply the actions agents propose through a
//! validated output protocol, and to assemble an audit manifest of
//! everything that happened.

pub mod agent;
pub mod audit;
pub mod cli;
pub mod commands;
pub mod concurrency;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod exit_codes;
pub mod fs;
pub mod git;
pub mod github;
pub mod graph;
pub mod logging;
pub mod outputs;
pub mod permissions;
pub mod triggers;

#[cfg(test)]
pub(crate) mod test_support;
