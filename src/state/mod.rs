//! State module for tracking run progress
//!
//! # Components
//!
//! - `RunPhase`: the phase a crawl run is in, from robots.txt seeding to done

mod run_phase;

pub use run_phase::RunPhase;
