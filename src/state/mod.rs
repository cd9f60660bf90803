//! State module for tracking run progress
//!
//! # Components
//!
//! - `Stage`: The pipeline stage a run is in (SEEDING through DONE)
//! - `RunState`: Stage plus the progress counters reported while crawling

mod run_state;
mod stage;

// Re-export main types
pub use run_state::RunState;
pub use stage::Stage;
