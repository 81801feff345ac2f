//! Credential storage scoped by host and port.
//!
//! Lookups happen on every request with preemptive auth enabled while
//! writes are rare, so the cache sits on a sharded `DashMap` and never holds
//! a lock across an await point.

use base64::{engine::general_purpose, Engine as _};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// Authentication scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// Basic authentication (base64 encoded)
    Basic,
    /// Bearer token; the password field holds the token
    Bearer,
}

/// Cached authentication entry.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthEntry {
    /// Authentication scheme
    pub scheme: AuthScheme,
    /// Realm the credentials were issued for, if known
    pub realm: Option<String>,
    /// Username
    pub username: String,
    /// Password or token
    pub password: String,
}

impl fmt::Debug for AuthEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthEntry")
            .field("scheme", &self.scheme)
            .field("realm", &self.realm)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AuthEntry {
    /// Create a new basic auth entry.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            scheme: AuthScheme::Basic,
            realm: None,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create a bearer token entry.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            scheme: AuthScheme::Bearer,
            realm: None,
            username: String::new(),
            password: token.into(),
        }
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    /// Generate the Authorization header value.
    pub fn to_header_value(&self) -> String {
        match self.scheme {
            AuthScheme::Basic => {
                let creds = format!("{}:{}", self.username, self.password);
                format!("Basic {}", general_purpose::STANDARD.encode(creds))
            }
            AuthScheme::Bearer => format!("Bearer {}", self.password),
        }
    }
}

/// Source of credentials for a host and port.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self, host: &str, port: u16) -> Option<AuthEntry>;
}

/// Thread-safe authentication cache.
/// Keys entries by lowercase host and port.
#[derive(Clone, Default)]
pub struct AuthCache {
    entries: Arc<DashMap<(String, u16), AuthEntry>>,
}

impl fmt::Debug for AuthCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl AuthCache {
    /// Create a new empty auth cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(host: &str, port: u16) -> (String, u16) {
        (host.to_ascii_lowercase(), port)
    }

    /// Store credentials for a host, replacing any previous entry.
    pub fn store(&self, host: &str, port: u16, entry: AuthEntry) {
        tracing::debug!(host = %host, port, scheme = ?entry.scheme, "storing credentials");
        self.entries.insert(Self::key(host, port), entry);
    }

    /// Remove credentials for a host.
    pub fn remove(&self, host: &str, port: u16) -> Option<AuthEntry> {
        self.entries
            .remove(&Self::key(host, port))
            .map(|(_, entry)| entry)
    }

    /// Clear all cached credentials.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialStore for AuthCache {
    fn lookup(&self, host: &str, port: u16) -> Option<AuthEntry> {
        self.entries
            .get(&Self::key(host, port))
            .map(|e| e.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_lookup() {
        let cache = AuthCache::new();
        cache.store("api.example.com", 8080, AuthEntry::basic("user", "pass"));

        let found = cache.lookup("api.example.com", 8080).unwrap();
        assert_eq!(found.username, "user");
        assert_eq!(found.password, "pass");
    }

    #[test]
    fn test_lookup_not_found() {
        let cache = AuthCache::new();
        assert!(cache.lookup("unknown.com", 80).is_none());
    }

    #[test]
    fn test_ports_are_separate_scopes() {
        let cache = AuthCache::new();
        cache.store("api.com", 80, AuthEntry::basic("user1", "pass1"));
        cache.store("api.com", 8080, AuthEntry::basic("user2", "pass2"));

        assert_eq!(cache.lookup("api.com", 80).unwrap().username, "user1");
        assert_eq!(cache.lookup("api.com", 8080).unwrap().username, "user2");
        assert!(cache.lookup("api.com", 443).is_none());
    }

    #[test]
    fn test_case_insensitive_host() {
        let cache = AuthCache::new();
        cache.store("Api.COM", 80, AuthEntry::basic("u", "p"));

        assert!(cache.lookup("api.com", 80).is_some());
        assert!(cache.lookup("API.COM", 80).is_some());
    }

    #[test]
    fn test_replace_and_remove() {
        let cache = AuthCache::new();
        cache.store("a.com", 80, AuthEntry::basic("old", "p"));
        cache.store("a.com", 80, AuthEntry::basic("new", "p"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup("a.com", 80).unwrap().username, "new");

        assert!(cache.remove("a.com", 80).is_some());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_to_header_value() {
        // base64("user:pass") = "dXNlcjpwYXNz"
        assert_eq!(
            AuthEntry::basic("user", "pass").to_header_value(),
            "Basic dXNlcjpwYXNz"
        );
        assert_eq!(AuthEntry::bearer("t0k3n").to_header_value(), "Bearer t0k3n");
    }

    #[test]
    fn test_debug_redacts_password() {
        let entry = AuthEntry::basic("user", "hunter2").with_realm("admin");
        let printed = format!("{:?}", entry);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("admin"));
    }

    #[test]
    fn test_clear() {
        let cache = AuthCache::new();
        cache.store("a.com", 80, AuthEntry::basic("u", "p"));
        cache.store("b.com", 80, AuthEntry::basic("u", "p"));

        cache.clear();

        assert!(cache.is_empty());
    }
}
