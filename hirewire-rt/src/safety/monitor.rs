//! Observe-only audit trail of content violations

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use hirewire_common::events::{EventBus, InterviewEvent};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::{filter_response, FilterAction, FilterResult};

/// Characters of the original text kept per violation
pub const EXCERPT_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub timestamp: DateTime<Utc>,
    pub terms: Vec<String>,
    /// Truncated original text
    pub excerpt: String,
    pub action: FilterAction,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyStats {
    pub total: usize,
    pub by_term: BTreeMap<String, usize>,
    pub last_at: Option<DateTime<Utc>>,
}

/// Accumulates violations; never blocks or alters the flow it observes
#[derive(Debug, Default)]
pub struct SafetyMonitor {
    session_id: Option<Uuid>,
    events: Option<EventBus>,
    violations: Mutex<Vec<Violation>>,
}

impl SafetyMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also publish `ContentViolation` events for this session
    pub fn with_events(session_id: Uuid, events: EventBus) -> Self {
        Self {
            session_id: Some(session_id),
            events: Some(events),
            violations: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Violation>> {
        self.violations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, original: &str, terms: Vec<String>, action: FilterAction) {
        let timestamp = Utc::now();
        warn!(
            session_id = ?self.session_id,
            terms = ?terms,
            action = ?action,
            "Content violation filtered"
        );

        if let (Some(session_id), Some(events)) = (self.session_id, &self.events) {
            events.emit_lossy(InterviewEvent::ContentViolation {
                session_id,
                terms: terms.clone(),
                timestamp,
            });
        }

        self.lock().push(Violation {
            timestamp,
            terms,
            excerpt: excerpt(original),
            action,
        });
    }

    /// Filter a response and record it when anything was found
    pub fn check(&self, text: &str, originating_question: Option<&str>) -> FilterResult {
        let result = filter_response(text, originating_question);
        if !result.terms.is_empty() {
            self.record(text, result.terms.clone(), result.action);
        }
        result
    }

    pub fn violations(&self) -> Vec<Violation> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> SafetyStats {
        let violations = self.lock();
        let mut by_term = BTreeMap::new();
        for term in violations.iter().flat_map(|v| v.terms.iter()) {
            *by_term.entry(term.clone()).or_insert(0) += 1;
        }
        SafetyStats {
            total: violations.len(),
            by_term,
            last_at: violations.last().map(|v| v.timestamp),
        }
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(EXCERPT_CHARS).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_responses_are_not_recorded() {
        let monitor = SafetyMonitor::new();
        monitor.check("Describe how you would shard this table.", None);
        assert_eq!(monitor.count(), 0);
        assert_eq!(monitor.stats(), SafetyStats::default());
    }

    #[test]
    fn violations_accumulate_with_stats() {
        let monitor = SafetyMonitor::new();
        monitor.check("ChatGPT says hello to you and welcomes you here.", None);
        monitor.check("As far as ChatGPT knows, OpenAI trains it. What else?", None);

        assert_eq!(monitor.count(), 2);
        let stats = monitor.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_term.get("chatgpt"), Some(&2));
        assert_eq!(stats.by_term.get("openai"), Some(&1));
        assert!(stats.last_at.is_some());

        monitor.clear();
        assert_eq!(monitor.count(), 0);
    }

    #[test]
    fn excerpt_is_truncated() {
        let monitor = SafetyMonitor::new();
        let long = format!("Claude {}", "x".repeat(500));
        monitor.check(&long, None);
        let violation = &monitor.violations()[0];
        assert_eq!(violation.excerpt.chars().count(), EXCERPT_CHARS + 1);
    }

    #[tokio::test]
    async fn violations_are_published() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let session_id = Uuid::new_v4();
        let monitor = SafetyMonitor::with_events(session_id, bus);

        monitor.check("I'm an AI. That is all I can say on the topic.", None);

        match rx.recv().await.unwrap() {
            InterviewEvent::ContentViolation { session_id: id, terms, .. } => {
                assert_eq!(id, session_id);
                assert!(!terms.is_empty());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
