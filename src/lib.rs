//! pollgate library
//!
//! In-memory polls with a single live vote per voter, an HTTP API over them,
//! and Slack delivery of new polls with interactive voting.

pub mod channels;
pub mod cli;
pub mod config;
pub mod logging;
pub mod polls;
pub mod server;
