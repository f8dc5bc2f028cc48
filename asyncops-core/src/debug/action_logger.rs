//! Action logging with pattern-based filtering and in-memory storage
//!
//! Filters action types with glob patterns before tracing them, and can keep
//! the most recent ones in a ring buffer for inspection and test dumps.
//!
//! # Example
//!
//! ```
//! use asyncops_core::debug::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};
//! use asyncops_core::{Middleware, OpAction};
//!
//! // Keep only failures, in memory
//! let config = ActionLogConfig::new(10, ActionLoggerConfig::new(Some("FAILURE*"), None));
//! let mut middleware = ActionLoggerMiddleware::with_log(config);
//!
//! middleware.before(&OpAction::new("OPERATION/save"));
//! middleware.before(&OpAction::new("FAILURE/save"));
//!
//! let log = middleware.log().unwrap();
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.entries().next().unwrap().action_type, "FAILURE/save");
//! ```

use crate::action::ActionSummary;
use crate::store::Middleware;
use std::collections::VecDeque;
use std::time::Instant;

/// Action-type filter built from glob patterns.
///
/// Patterns support:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
/// - Literal text matches exactly
///
/// # Examples
///
/// - `OPERATION*` matches every start action, generic or named
/// - `*/fetchUser` matches every phase of `fetchUser`
/// - `FAILURE` matches only the generic failure token
#[derive(Debug, Clone, Default)]
pub struct ActionLoggerConfig {
    /// If non-empty, only log actions matching these patterns
    pub include_patterns: Vec<String>,
    /// Exclude actions matching these patterns (applied after include)
    pub exclude_patterns: Vec<String>,
}

impl ActionLoggerConfig {
    /// Create a config from comma-separated pattern strings
    ///
    /// # Example
    /// ```
    /// use asyncops_core::debug::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("OPERATION/*,FAILURE*"), Some("*/poll"));
    /// assert!(config.should_log("OPERATION/fetchUser"));
    /// assert!(config.should_log("FAILURE"));
    /// assert!(!config.should_log("OPERATION/poll"));
    /// assert!(!config.should_log("COMPLETE/fetchUser"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include_patterns: include.map(split_patterns).unwrap_or_default(),
            exclude_patterns: exclude.map(split_patterns).unwrap_or_default(),
        }
    }

    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// Only the operation protocol's own actions.
    pub fn operations_only() -> Self {
        Self::with_patterns(
            vec![
                "OPERATION*".to_string(),
                "COMPLETE*".to_string(),
                "FAILURE*".to_string(),
            ],
            Vec::new(),
        )
    }

    /// Check if an action type passes the include/exclude patterns
    pub fn should_log(&self, action_type: &str) -> bool {
        if !self.include_patterns.is_empty()
            && !self
                .include_patterns
                .iter()
                .any(|p| glob_match(p, action_type))
        {
            return false;
        }

        !self
            .exclude_patterns
            .iter()
            .any(|p| glob_match(p, action_type))
    }
}

fn split_patterns(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

// ============================================================================
// In-Memory Action Log
// ============================================================================

/// An entry in the action log
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    pub action_type: String,
    /// From `ActionSummary::summary()`
    pub summary: String,
    pub timestamp: Instant,
    /// Sequence number for ordering
    pub sequence: u64,
    /// Whether the action changed the state (set after the reducer runs)
    pub state_changed: Option<bool>,
}

impl ActionLogEntry {
    pub fn new(action_type: impl Into<String>, summary: String, sequence: u64) -> Self {
        Self {
            action_type: action_type.into(),
            summary,
            timestamp: Instant::now(),
            sequence,
            state_changed: None,
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.timestamp.elapsed()
    }

    /// Format the elapsed time for display (e.g., "2.3s", "150ms")
    pub fn elapsed_display(&self) -> String {
        let elapsed = self.elapsed();
        if elapsed.as_secs() >= 1 {
            format!("{:.1}s", elapsed.as_secs_f64())
        } else {
            format!("{}ms", elapsed.as_millis())
        }
    }
}

/// Configuration for the action log ring buffer
#[derive(Debug, Clone)]
pub struct ActionLogConfig {
    /// Maximum number of entries to keep
    pub capacity: usize,
    pub filter: ActionLoggerConfig,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            filter: ActionLoggerConfig::default(),
        }
    }
}

impl ActionLogConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }
}

/// In-memory ring buffer of recent actions
///
/// Older entries are discarded once capacity is reached.
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    config: ActionLogConfig,
    next_sequence: u64,
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(ActionLogConfig::default())
    }
}

impl ActionLog {
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity),
            config,
            next_sequence: 0,
        }
    }

    /// Log an action if it passes the filter
    ///
    /// Returns the entry if it was logged, None if filtered out.
    pub fn log<A: ActionSummary>(&mut self, action: &A) -> Option<&ActionLogEntry> {
        let action_type = action.action_type();
        if self.config.capacity == 0 || !self.config.filter.should_log(action_type) {
            return None;
        }

        let entry = ActionLogEntry::new(action_type, action.summary(), self.next_sequence);
        self.next_sequence += 1;

        if self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }

        self.entries.push_back(entry);
        self.entries.back()
    }

    /// Update the last entry with state_changed info (called after reducer)
    pub fn update_last_state_changed(&mut self, changed: bool) {
        if let Some(entry) = self.entries.back_mut() {
            entry.state_changed = Some(changed);
        }
    }

    /// All entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// All entries, newest first
    pub fn entries_rev(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev()
    }

    /// The most recent N entries (newest first)
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn config(&self) -> &ActionLogConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ActionLogConfig {
        &mut self.config
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Middleware that logs actions with configurable pattern filtering.
///
/// Supports two modes:
/// - **Tracing only** (default): logs via `tracing::debug!()`
/// - **With storage**: also stores in an [`ActionLog`] for later inspection
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    log: Option<ActionLog>,
    /// Whether the last action was logged (for state_changed updates)
    last_action_logged: bool,
    active: bool,
}

impl ActionLoggerMiddleware {
    /// Tracing only, no in-memory storage
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            log: None,
            last_action_logged: false,
            active: true,
        }
    }

    /// Tracing plus in-memory storage
    pub fn with_log(config: ActionLogConfig) -> Self {
        Self {
            config: config.filter.clone(),
            log: Some(ActionLog::new(config)),
            last_action_logged: false,
            active: true,
        }
    }

    pub fn with_default_log() -> Self {
        Self::with_log(ActionLogConfig::default())
    }

    /// Log all actions, tracing only
    pub fn log_all() -> Self {
        Self::new(ActionLoggerConfig::default())
    }

    /// Set whether the middleware is active.
    ///
    /// When inactive, `before` and `after` are no-ops.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn log(&self) -> Option<&ActionLog> {
        self.log.as_ref()
    }

    pub fn log_mut(&mut self) -> Option<&mut ActionLog> {
        self.log.as_mut()
    }

    pub fn config(&self) -> &ActionLoggerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ActionLoggerConfig {
        &mut self.config
    }
}

impl<A: ActionSummary> Middleware<A> for ActionLoggerMiddleware {
    fn before(&mut self, action: &A) {
        if !self.active {
            return;
        }

        let action_type = action.action_type();
        if self.config.should_log(action_type) {
            tracing::debug!(action = %action_type, summary = %action.summary(), "action");
        }

        self.last_action_logged = false;
        if let Some(ref mut log) = self.log {
            if log.log(action).is_some() {
                self.last_action_logged = true;
            }
        }
    }

    fn after(&mut self, _action: &A, state_changed: bool) {
        if !self.active {
            return;
        }

        // Filtered actions must not overwrite the previous entry's flag
        if self.last_action_logged {
            if let Some(ref mut log) = self.log {
                log.update_last_state_changed(state_changed);
            }
        }
    }
}

/// Simple glob pattern matching supporting `*` and `?`.
///
/// - `*` matches zero or more characters
/// - `?` matches exactly one character
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    glob_match_impl(&pattern, &text)
}

fn glob_match_impl(pattern: &[char], text: &[char]) -> bool {
    let mut pi = 0;
    let mut ti = 0;
    let mut star_pi = None;
    let mut star_ti = 0;

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star_pi = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(spi) = star_pi {
            pi = spi + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }

    pi == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::OpAction;
    use serde_json::json;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("OPERATION", "OPERATION"));
        assert!(!glob_match("OPERATION", "OPERATION/a"));
        assert!(glob_match("OPERATION*", "OPERATION/fetchUser"));
        assert!(glob_match("*/fetchUser", "COMPLETE/fetchUser"));
        assert!(!glob_match("*/fetchUser", "COMPLETE/fetchUsers"));
        assert!(glob_match("*/fetch*", "FAILURE/fetchUser"));
        assert!(glob_match("COMPLETE/?", "COMPLETE/a"));
        assert!(!glob_match("COMPLETE/?", "COMPLETE/ab"));
    }

    #[test]
    fn test_config_include_and_exclude() {
        let config = ActionLoggerConfig::new(Some("*/fetch*"), Some("COMPLETE*"));
        assert!(config.should_log("OPERATION/fetchUser"));
        assert!(config.should_log("FAILURE/fetchUser"));
        assert!(!config.should_log("COMPLETE/fetchUser"));
        assert!(!config.should_log("OPERATION/save"));
    }

    #[test]
    fn test_config_default_logs_everything() {
        let config = ActionLoggerConfig::default();
        assert!(config.should_log("ROUTE_CHANGED"));
        assert!(config.should_log("OPERATION"));

        let blank = ActionLoggerConfig::new(Some(" , "), None);
        assert!(blank.include_patterns.is_empty());
        assert!(blank.should_log("anything"));
    }

    #[test]
    fn test_operations_only() {
        let config = ActionLoggerConfig::operations_only();
        assert!(config.should_log("OPERATION/a"));
        assert!(config.should_log("COMPLETE"));
        assert!(config.should_log("FAILURE/a"));
        assert!(!config.should_log("ROUTE_CHANGED"));
    }

    #[test]
    fn test_action_log_capacity_and_order() {
        let mut log = ActionLog::new(ActionLogConfig::with_capacity(3));
        for name in ["a", "b", "c", "d"] {
            log.log(&OpAction::new(format!("OPERATION/{name}")));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries().next().unwrap().sequence, 1);

        let recent: Vec<_> = log.recent(2).map(|e| e.action_type.as_str()).collect();
        assert_eq!(recent, vec!["OPERATION/d", "OPERATION/c"]);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_action_log_summary() {
        let mut log = ActionLog::default();
        let entry = log
            .log(
                &OpAction::new("COMPLETE/fetch")
                    .with_channel("7")
                    .with_response(json!({"big": "payload"})),
            )
            .unwrap();
        assert_eq!(entry.summary, "COMPLETE/fetch [7] ok");
        assert!(entry.elapsed_display().ends_with("ms") || entry.elapsed_display().ends_with('s'));
    }

    #[test]
    fn test_middleware_filtered_action_does_not_update_state_changed() {
        let config = ActionLogConfig::new(10, ActionLoggerConfig::new(None, Some("TICK")));
        let mut middleware = ActionLoggerMiddleware::with_log(config);

        let start = OpAction::new("OPERATION/a");
        middleware.before(&start);
        middleware.after(&start, true);

        let tick = OpAction::new("TICK");
        middleware.before(&tick);
        middleware.after(&tick, false);

        let log = middleware.log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries().next().unwrap().state_changed, Some(true));
    }

    #[test]
    fn test_inactive_middleware_is_noop() {
        let mut middleware = ActionLoggerMiddleware::with_default_log().active(false);
        middleware.before(&OpAction::new("OPERATION/a"));
        middleware.after(&OpAction::new("OPERATION/a"), true);
        assert!(!middleware.is_active());
        assert!(middleware.log().unwrap().is_empty());
    }
}
