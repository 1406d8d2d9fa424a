//! Per-vendor, per-day usage accounting.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::traits::Usage;

/// Aggregate counters for one provider on one day.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageEntry {
    /// Prompt tokens consumed
    pub prompt_tokens: u64,
    /// Completion tokens generated
    pub completion_tokens: u64,
    /// Total tokens
    pub total_tokens: u64,
    /// Number of successful requests
    pub request_count: u64,
}

/// Token/request ledger keyed by (provider id, day).
///
/// Owned by the application's startup sequence and injected into the factory
/// and adapters; not ambient global state. Adapters record after every
/// successful chat call; independent conversations may record concurrently,
/// so the read-modify-write happens under the lock. Persistence is the
/// host's job - [`UsageLedger::snapshot`] exposes the counters for it.
#[derive(Debug, Default)]
pub struct UsageLedger {
    entries: Mutex<HashMap<(String, NaiveDate), UsageEntry>>,
}

impl UsageLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Additively record a successful call for `provider` under today's date.
    pub fn record(&self, provider: &str, usage: &Usage) {
        self.record_on(provider, Utc::now().date_naive(), usage);
    }

    /// Record under an explicit date.
    pub fn record_on(&self, provider: &str, date: NaiveDate, usage: &Usage) {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry((provider.to_string(), date)).or_default();
        entry.prompt_tokens += u64::from(usage.prompt_tokens);
        entry.completion_tokens += u64::from(usage.completion_tokens);
        entry.total_tokens += u64::from(usage.total_tokens);
        entry.request_count += 1;
    }

    /// Counters for a provider on a given day.
    pub fn entry(&self, provider: &str, date: NaiveDate) -> Option<UsageEntry> {
        self.entries
            .lock()
            .unwrap()
            .get(&(provider.to_string(), date))
            .copied()
    }

    /// Counters for a provider today.
    pub fn today(&self, provider: &str) -> Option<UsageEntry> {
        self.entry(provider, Utc::now().date_naive())
    }

    /// All entries, for external persistence.
    pub fn snapshot(&self) -> Vec<((String, NaiveDate), UsageEntry)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(key, entry)| (key.clone(), *entry))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(prompt: u32, completion: u32) -> Usage {
        Usage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    #[test]
    fn test_two_calls_accumulate() {
        let ledger = UsageLedger::new();
        ledger.record("openai", &usage(100, 20));
        ledger.record("openai", &usage(50, 10));

        let entry = ledger.today("openai").unwrap();
        assert_eq!(entry.request_count, 2);
        assert_eq!(entry.prompt_tokens, 150);
        assert_eq!(entry.completion_tokens, 30);
        assert_eq!(entry.total_tokens, 180);
    }

    #[test]
    fn test_providers_tracked_separately() {
        let ledger = UsageLedger::new();
        ledger.record("openai", &usage(10, 5));
        ledger.record("anthropic", &usage(7, 3));

        assert_eq!(ledger.today("openai").unwrap().request_count, 1);
        assert_eq!(ledger.today("anthropic").unwrap().total_tokens, 10);
        assert!(ledger.today("gemini").is_none());
    }

    #[test]
    fn test_days_tracked_separately() {
        let ledger = UsageLedger::new();
        let yesterday = NaiveDate::from_ymd_opt(2026, 8, 27).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();

        ledger.record_on("xai", yesterday, &usage(10, 1));
        ledger.record_on("xai", today, &usage(20, 2));

        assert_eq!(ledger.entry("xai", yesterday).unwrap().prompt_tokens, 10);
        assert_eq!(ledger.entry("xai", today).unwrap().prompt_tokens, 20);
        assert_eq!(ledger.snapshot().len(), 2);
    }
}
