//! # Admission Policy
//!
//! Decides whether a classified event produces a job, and with which
//! arguments.
//!
//! Evaluation order is fixed:
//!
//! 1. Bot-sender guard: events sent by the configured bot account are never
//!    admitted, whatever their type
//! 2. The rule bound to the event type in [`RULES`]
//! 3. No rule means no admission
//!
//! Every rule is a pure function of the payload and the policy configuration.

use crate::{webhook::EventPayload, EventType, JobKind, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Default-branch ref admitted for push events
pub const DEFAULT_PUSH_REF: &str = "refs/heads/master";

/// Pull request action admitted by default
pub const DEFAULT_PULL_REQUEST_ACTION: &str = "opened";

// ============================================================================
// Configuration
// ============================================================================

/// Tunable inputs of the admission rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Account ID of the service's own bot; its events are never admitted
    pub bot_user_id: Option<UserId>,

    /// `action` values admitted for `pull_request` events
    pub pull_request_actions: Vec<String>,

    /// `ref` admitted for `push` events
    pub push_ref: String,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            bot_user_id: None,
            pull_request_actions: vec![DEFAULT_PULL_REQUEST_ACTION.to_string()],
            push_ref: DEFAULT_PUSH_REF.to_string(),
        }
    }
}

// ============================================================================
// Decision Types
// ============================================================================

/// Why an event was not admitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The sender is the service's own bot account
    BotSender,
    /// The pull request action is not one of the admitted actions
    ActionNotAdmitted { action: Option<String> },
    /// The pushed ref is not the default branch
    RefNotAdmitted { git_ref: Option<String> },
    /// No rule exists for this event type
    UnhandledEventType { event_type: EventType },
}

impl RejectReason {
    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::BotSender => "bot_sender",
            Self::ActionNotAdmitted { .. } => "action_not_admitted",
            Self::RefNotAdmitted { .. } => "ref_not_admitted",
            Self::UnhandledEventType { .. } => "unhandled_event_type",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BotSender => write!(f, "sent by the bot account"),
            Self::ActionNotAdmitted { action } => {
                write!(f, "action {:?} is not admitted", action.as_deref().unwrap_or(""))
            }
            Self::RefNotAdmitted { git_ref } => {
                write!(f, "ref {:?} is not admitted", git_ref.as_deref().unwrap_or(""))
            }
            Self::UnhandledEventType { event_type } => {
                write!(f, "no rule for event type {}", event_type)
            }
        }
    }
}

/// Outcome of evaluating the admission policy for one payload
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    /// Submit `job` with `arguments`, in order
    Admit {
        job: JobKind,
        arguments: Vec<Value>,
    },
    /// Do not submit anything
    Reject { reason: RejectReason },
}

impl AdmissionDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit { .. })
    }

    /// Arguments for the job; empty for a rejection
    pub fn job_arguments(&self) -> &[Value] {
        match self {
            Self::Admit { arguments, .. } => arguments,
            Self::Reject { .. } => &[],
        }
    }

    pub fn job_kind(&self) -> Option<JobKind> {
        match self {
            Self::Admit { job, .. } => Some(*job),
            Self::Reject { .. } => None,
        }
    }

    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Admit { .. } => None,
            Self::Reject { reason } => Some(reason),
        }
    }
}

// ============================================================================
// Rule Table
// ============================================================================

/// Admission rule for one event type
pub struct EventRule {
    pub event_type: EventType,
    pub job: JobKind,
    admits: fn(&AdmissionConfig, &EventPayload) -> Result<(), RejectReason>,
    arguments: fn(&EventPayload) -> Vec<Value>,
}

/// One rule per recognised event type. Types absent from the table are
/// never admitted.
pub static RULES: [EventRule; 5] = [
    EventRule {
        event_type: EventType::PullRequest,
        job: JobKind::ReceivePullRequestEvent,
        admits: admit_pull_request_action,
        arguments: whole_body,
    },
    EventRule {
        event_type: EventType::IssueComment,
        job: JobKind::ReceiveIssueCommentEvent,
        admits: always,
        arguments: whole_body,
    },
    EventRule {
        event_type: EventType::InstallationRepositories,
        job: JobKind::ReceiveInstallationRepositoriesEvent,
        admits: always,
        arguments: added_repositories_and_installation,
    },
    EventRule {
        event_type: EventType::Push,
        job: JobKind::ReceivePushEvent,
        admits: admit_push_ref,
        arguments: whole_body,
    },
    EventRule {
        event_type: EventType::PullRequestReview,
        job: JobKind::ReceivePullRequestReviewEvent,
        admits: always,
        arguments: whole_body,
    },
];

/// Rule bound to an event type
pub fn rule_for(event_type: EventType) -> Option<&'static EventRule> {
    RULES.iter().find(|rule| rule.event_type == event_type)
}

fn always(_config: &AdmissionConfig, _payload: &EventPayload) -> Result<(), RejectReason> {
    Ok(())
}

fn admit_pull_request_action(
    config: &AdmissionConfig,
    payload: &EventPayload,
) -> Result<(), RejectReason> {
    match payload.str_field("action") {
        Some(action) if config.pull_request_actions.iter().any(|a| a == action) => Ok(()),
        action => Err(RejectReason::ActionNotAdmitted {
            action: action.map(String::from),
        }),
    }
}

fn admit_push_ref(config: &AdmissionConfig, payload: &EventPayload) -> Result<(), RejectReason> {
    match payload.str_field("ref") {
        Some(git_ref) if git_ref == config.push_ref => Ok(()),
        git_ref => Err(RejectReason::RefNotAdmitted {
            git_ref: git_ref.map(String::from),
        }),
    }
}

fn whole_body(payload: &EventPayload) -> Vec<Value> {
    vec![payload.body_value()]
}

// Two discrete arguments; a missing field is passed as null.
fn added_repositories_and_installation(payload: &EventPayload) -> Vec<Value> {
    vec![
        payload
            .field(&["repositories_added"])
            .cloned()
            .unwrap_or(Value::Null),
        payload
            .field(&["installation", "id"])
            .cloned()
            .unwrap_or(Value::Null),
    ]
}

// ============================================================================
// Policy
// ============================================================================

/// Admission policy evaluated for every authenticated delivery
#[derive(Debug, Clone, Default)]
pub struct AdmissionPolicy {
    config: AdmissionConfig,
}

impl AdmissionPolicy {
    pub fn new(config: AdmissionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Decide whether `payload` produces a job.
    pub fn evaluate(&self, payload: &EventPayload) -> AdmissionDecision {
        let event_type = payload.event_type();

        if self.is_bot_sender(payload) {
            debug!(event_type = %event_type, "Event sent by bot account; not admitted");
            return AdmissionDecision::Reject {
                reason: RejectReason::BotSender,
            };
        }

        let Some(rule) = rule_for(event_type) else {
            debug!(event_type = %event_type, "No admission rule for event type");
            return AdmissionDecision::Reject {
                reason: RejectReason::UnhandledEventType { event_type },
            };
        };

        match (rule.admits)(&self.config, payload) {
            Ok(()) => AdmissionDecision::Admit {
                job: rule.job,
                arguments: (rule.arguments)(payload),
            },
            Err(reason) => {
                debug!(event_type = %event_type, reason = %reason, "Event not admitted");
                AdmissionDecision::Reject { reason }
            }
        }
    }

    fn is_bot_sender(&self, payload: &EventPayload) -> bool {
        match (self.config.bot_user_id, payload.sender_id()) {
            (Some(bot), Some(sender)) => bot == sender,
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
