//! Credential gate: one-shot secret leases for quick connections.
//!
//! A lease is consumed by removal, so two callers can never both observe
//! the same secret. Expiry is a second, time-based way for a lease to die.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use secrecy::SecretString;

/// Default lease lifetime when the vault owner does not pick one.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(300);

struct Lease {
    secret: SecretString,
    created: Instant,
}

/// Holds at most one pending secret per server id.
pub struct CredentialVault {
    leases: HashMap<String, Lease>,
    ttl: Option<Duration>,
}

impl CredentialVault {
    /// `ttl = None` disables time-based expiry; leases still die on first
    /// consume.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            leases: HashMap::new(),
            ttl,
        }
    }

    /// Deposit a secret for `server_id`, replacing any pending lease.
    pub fn store(&mut self, server_id: &str, secret: SecretString) {
        self.leases.insert(
            server_id.to_string(),
            Lease {
                secret,
                created: Instant::now(),
            },
        );
    }

    /// Take the secret for `server_id`. Returns it exactly once; later
    /// calls (and calls after expiry) yield `None`.
    pub fn consume(&mut self, server_id: &str) -> Option<SecretString> {
        let lease = self.leases.remove(server_id)?;
        if let Some(ttl) = self.ttl {
            if lease.created.elapsed() > ttl {
                return None;
            }
        }
        Some(lease.secret)
    }
}

impl Default for CredentialVault {
    fn default() -> Self {
        Self::new(Some(DEFAULT_LEASE_TTL))
    }
}
