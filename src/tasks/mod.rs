//! Background Tasks Module
//!
//! Contains background tasks that run alongside a cache instance.
//!
//! # Tasks
//! - Sweep: Removes expired cache entries at a configured interval

mod sweeper;

pub use sweeper::{spawn_sweep_task, Sweeper};
