//! Two-tier content-addressed cache in front of the analyzer.
//!
//! Key derivation ([`key`]), the shared tier capability ([`tier`]), the two
//! tiers ([`memory`], [`persistent`]), and the lookup/population orchestration
//! ([`coordinator`]).

pub mod coordinator;
pub mod key;
pub mod memory;
pub mod persistent;
pub mod tier;
