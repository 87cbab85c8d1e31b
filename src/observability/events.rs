//! Observable events for redex
//!
//! Events are explicit and typed; each maps to one stable log event name.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded
    ConfigLoaded,
    /// Schema registered for a namespace
    SchemaRegistered,
    /// Schema removed
    SchemaUnregistered,
    /// Schema rejected at registration
    SchemaRejected,

    // Writes
    /// Record changes committed
    WriteCommit,
    /// Write rejected by a unique constraint
    UniqueViolation,
    /// Optimistic commit lost a race and will retry
    CommitRetry,
    /// Optimistic commit gave up after the retry bound
    CommitConflict,

    // Queries
    /// Query compiled to a plan
    QueryPlanned,
    /// Query executed
    QueryExecuted,
    /// Query rejected during planning
    QueryRejected,
    /// Result cached under an expiring key
    ResultCached,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaRegistered => "SCHEMA_REGISTERED",
            Event::SchemaUnregistered => "SCHEMA_UNREGISTERED",
            Event::SchemaRejected => "SCHEMA_REJECTED",

            Event::WriteCommit => "WRITE_COMMIT",
            Event::UniqueViolation => "UNIQUE_VIOLATION",
            Event::CommitRetry => "COMMIT_RETRY",
            Event::CommitConflict => "COMMIT_CONFLICT",

            Event::QueryPlanned => "QUERY_PLANNED",
            Event::QueryExecuted => "QUERY_COMPLETE",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::ResultCached => "RESULT_CACHED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryPlanned | Event::QueryExecuted | Event::WriteCommit => Severity::Trace,
            Event::UniqueViolation
            | Event::CommitRetry
            | Event::QueryRejected
            | Event::SchemaRejected => Severity::Warn,
            Event::CommitConflict => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::SchemaRegistered,
            Event::SchemaUnregistered,
            Event::SchemaRejected,
            Event::WriteCommit,
            Event::UniqueViolation,
            Event::CommitRetry,
            Event::CommitConflict,
            Event::QueryPlanned,
            Event::QueryExecuted,
            Event::QueryRejected,
            Event::ResultCached,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_severities() {
        assert_eq!(Event::CommitConflict.severity(), Severity::Error);
        assert_eq!(Event::UniqueViolation.severity(), Severity::Warn);
        assert_eq!(Event::SchemaRegistered.severity(), Severity::Info);
        assert_eq!(Event::QueryExecuted.severity(), Severity::Trace);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::QueryExecuted), "QUERY_COMPLETE");
    }
}
