//! The lead auction & delivery engine: resolves which buyers may bid on a
//! lead, runs a concurrent bidding round against them, delivers the lead
//! to the winner and fails over down the ranking when delivery fails.
//! Every attempt is recorded in the append-only transaction ledger.

pub mod arguments;
pub mod domain;
pub mod infra;
mod metrics;
pub mod run;
pub mod run_loop;

pub use run::run;
