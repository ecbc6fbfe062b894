use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Cached credential state for one user session.
///
/// Either absent or complete: every field is written in one `set` call and
/// partial records never persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime granted by the authority at issuance, in minutes.
    pub expire_minutes: i64,
    /// Absolute expiry as a Unix timestamp. Always derived from the issuance
    /// instant plus `expire_minutes`, never client-supplied.
    pub valid_until: i64,
}

impl TokenRecord {
    pub fn is_valid(&self) -> bool {
        self.valid_until > Utc::now().timestamp()
    }
}

/// Session-keyed token storage, injected into the token manager so the
/// caching policy is not tied to any web framework.
pub trait SessionStore: Send + Sync {
    fn get(&self, session_id: &str) -> Option<TokenRecord>;
    fn set(&self, session_id: &str, record: TokenRecord);
    fn clear(&self, session_id: &str);
}

struct Entry {
    record: TokenRecord,
    touched: Instant,
}

/// In-memory store. DashMap serializes concurrent access per entry, which is
/// all the locking two racing requests on the same session need.
pub struct MemorySessionStore {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(session_minutes: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_secs(session_minutes * 60),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str) -> Option<TokenRecord> {
        let expired = match self.entries.get(session_id) {
            Some(entry) => {
                if entry.touched.elapsed() < self.ttl {
                    return Some(entry.record.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            // The guard is dropped above; removing here cannot deadlock
            self.entries.remove(session_id);
        }
        None
    }

    fn set(&self, session_id: &str, record: TokenRecord) {
        // Writes double as the sweep point: abandoned sessions are never
        // read again, so drop every stale entry before adding this one
        self.entries
            .retain(|_, entry| entry.touched.elapsed() < self.ttl);
        self.entries.insert(
            session_id.to_string(),
            Entry {
                record,
                touched: Instant::now(),
            },
        );
    }

    fn clear(&self, session_id: &str) {
        self.entries.remove(session_id);
    }
}
