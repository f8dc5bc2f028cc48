//! Debug and inspection utilities
//!
//! Pattern-filtered [`ActionLoggerMiddleware`] with an optional in-memory
//! [`ActionLog`] of recent actions.

pub mod action_logger;

pub use action_logger::{
    glob_match, ActionLog, ActionLogConfig, ActionLogEntry, ActionLoggerConfig,
    ActionLoggerMiddleware,
};
