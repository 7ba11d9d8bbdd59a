//! Event classification.
//!
//! One function serves every ingestion route: dedicated routes imply a fixed
//! event type, the unified integration route reads the declared header.

use crate::{EventType, SourceRoute};

/// Determine the logical event type of a delivery.
///
/// - [`SourceRoute::PullRequest`] is always [`EventType::PullRequest`]
/// - [`SourceRoute::IssueComment`] is always [`EventType::IssueComment`]
/// - [`SourceRoute::Integration`] uses `declared_event_header` verbatim when it
///   names a recognised type, and [`EventType::Unknown`] otherwise (including
///   when the header is absent)
///
/// Unrecognised values are not an error. `Unknown` is never admitted.
pub fn classify(route: SourceRoute, declared_event_header: Option<&str>) -> EventType {
    match route {
        SourceRoute::PullRequest => EventType::PullRequest,
        SourceRoute::IssueComment => EventType::IssueComment,
        SourceRoute::Integration => declared_event_header
            .map(EventType::from_event_name)
            .unwrap_or(EventType::Unknown),
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
