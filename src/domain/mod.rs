//! Core domain types and logic: indicators, rules, the strategy lifecycle
//! and the backtest simulator. Nothing in here performs I/O.

pub mod backtest;
pub mod candle;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod lifecycle;
pub mod metrics;
pub mod position;
pub mod rule;
pub mod rule_eval;
pub mod rule_parser;
pub mod signal;
pub mod strategy;
