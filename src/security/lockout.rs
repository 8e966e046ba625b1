use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use log::warn;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct AttemptRecord {
    failures: u32,
    first_failure: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
}

/// Result of recording a failed login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Remaining(u32),
    Locked { retry_after_secs: u64 },
}

impl FailureOutcome {
    /// The error a failed login answers with.
    pub fn into_error(self) -> AppError {
        match self {
            FailureOutcome::Remaining(remaining) => AppError::Unauthorized {
                message: "Invalid credentials".to_string(),
                attempts_remaining: Some(remaining),
            },
            FailureOutcome::Locked { retry_after_secs } => {
                AppError::TooManyAttempts { retry_after_secs }
            }
        }
    }
}

/// Counts failed logins per account key and locks the key once the limit is hit.
pub struct LoginAttemptTracker {
    max_attempts: u32,
    lockout: Duration,
    records: Mutex<HashMap<String, AttemptRecord>>,
}

impl LoginAttemptTracker {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn key(email: &str) -> String {
        email.trim().to_lowercase()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, AttemptRecord>> {
        // A poisoned map only holds counters; keep serving with whatever is there.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn check(&self, key: &str) -> AppResult<()> {
        self.check_at(key, Utc::now())
    }

    pub fn check_at(&self, key: &str, now: DateTime<Utc>) -> AppResult<()> {
        let mut records = self.records();
        let Some(locked_until) = records.get(key).map(|r| r.locked_until) else {
            return Ok(());
        };
        match locked_until {
            Some(until) if until > now => Err(AppError::TooManyAttempts {
                retry_after_secs: seconds_until(now, until),
            }),
            Some(_) => {
                records.remove(key);
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn record_failure(&self, key: &str) -> FailureOutcome {
        self.record_failure_at(key, Utc::now())
    }

    pub fn record_failure_at(&self, key: &str, now: DateTime<Utc>) -> FailureOutcome {
        let mut records = self.records();
        records.retain(|_, record| !self.is_stale(record, now));
        let record = records.entry(key.to_string()).or_default();

        if let Some(until) = record.locked_until {
            if until > now {
                return FailureOutcome::Locked {
                    retry_after_secs: seconds_until(now, until),
                };
            }
            *record = AttemptRecord::default();
        }

        // Stale failures from an earlier window do not count.
        if record
            .first_failure
            .is_some_and(|first| now - first > self.lockout)
        {
            *record = AttemptRecord::default();
        }

        record.failures += 1;
        record.first_failure.get_or_insert(now);

        if record.failures >= self.max_attempts {
            let until = now + self.lockout;
            warn!("Locking login for {} until {}", key, until);
            *record = AttemptRecord {
                failures: 0,
                first_failure: None,
                locked_until: Some(until),
            };
            FailureOutcome::Locked {
                retry_after_secs: seconds_until(now, until),
            }
        } else {
            FailureOutcome::Remaining(self.max_attempts - record.failures)
        }
    }

    pub fn record_success(&self, key: &str) {
        self.records().remove(key);
    }

    /// Number of keys currently holding failures or a lock.
    pub fn tracked(&self) -> usize {
        self.records().len()
    }

    /// Expired locks and failure windows that have run out carry no state.
    fn is_stale(&self, record: &AttemptRecord, now: DateTime<Utc>) -> bool {
        match (record.locked_until, record.first_failure) {
            (Some(until), _) => until <= now,
            (None, Some(first)) => now - first > self.lockout,
            (None, None) => true,
        }
    }
}

fn seconds_until(now: DateTime<Utc>, until: DateTime<Utc>) -> u64 {
    (until - now).num_seconds().max(1) as u64
}
