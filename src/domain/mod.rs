//! Core domain types and logic.

pub mod asset;
pub mod allocation;
pub mod holdings;
pub mod simulation;
pub mod metrics;
pub mod calendar;
pub mod backtest;
pub mod strategy;
pub mod sweep;
pub mod config_validation;
pub mod error;
