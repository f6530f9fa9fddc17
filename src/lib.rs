//! ruletrader: rules-based technical-analysis strategies.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], orchestration in [`services`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
pub mod services;
