//! Bounded per-repository record of generation events

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationEvent {
    pub timestamp: String,
    pub repository: String,
    pub event: Option<String>,
    pub preset: Option<String>,
    pub provider: String,
    pub model: String,
    pub valid: bool,
    pub fallback: bool,
    pub error_fallback: bool,
    pub cached: bool,
    pub duration_ms: u64,
}

pub struct GenerationHistory {
    limit: usize,
    events: Mutex<HashMap<String, VecDeque<GenerationEvent>>>,
}

impl Default for GenerationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl GenerationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            events: Mutex::new(HashMap::new()),
        }
    }

    /// Append, dropping the oldest event of the repository past the limit
    pub fn record(&self, event: GenerationEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let queue = events.entry(event.repository.clone()).or_default();
        queue.push_back(event);
        while queue.len() > self.limit {
            queue.pop_front();
        }
    }

    /// Events of `repository`, oldest first
    pub fn for_repository(&self, repository: &str) -> Vec<GenerationEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events
            .get(repository)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn repositories(&self) -> Vec<String> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = events.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(repo: &str, n: u64) -> GenerationEvent {
        GenerationEvent {
            timestamp: String::new(),
            repository: repo.to_string(),
            event: None,
            preset: None,
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            valid: true,
            fallback: false,
            error_fallback: false,
            cached: false,
            duration_ms: n,
        }
    }

    #[test]
    fn test_oldest_events_are_evicted() {
        let history = GenerationHistory::new(3);
        for n in 0..5 {
            history.record(event("acme/widgets", n));
        }
        history.record(event("acme/gears", 9));

        let kept: Vec<u64> = history
            .for_repository("acme/widgets")
            .iter()
            .map(|e| e.duration_ms)
            .collect();
        assert_eq!(kept, vec![2, 3, 4]);
        assert_eq!(history.for_repository("acme/gears").len(), 1);
        assert_eq!(history.repositories(), vec!["acme/gears", "acme/widgets"]);
        assert!(history.for_repository("other/repo").is_empty());
    }
}
