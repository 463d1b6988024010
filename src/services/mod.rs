//! Business logic services

pub mod aggregator;
pub mod demand;
pub mod dispatch;
pub mod export;
pub mod geo;
pub mod geocoding;
pub mod here;
pub mod import;
pub mod run_history;
pub mod simulation;
