//! Type definitions

pub mod schedule;
pub mod simulation;
pub mod site;

pub use schedule::*;
pub use simulation::*;
pub use site::*;
