//! # Authentication Module
//!
//! API key authentication with per-key permissions.
//!
//! ## Configuration
//!
//! - `GRAPHMEM_AUTH_ENABLED`: "true"/"1" to require a key on every request
//! - `GRAPHMEM_API_KEYS`: key table, `key:name:perm,perm|key2:name2:perm`
//! - `GRAPHMEM_API_KEY`: single-key fallback (granted admin) when the
//!   table is not set
//!
//! ## Usage
//!
//! Send the key in either header; `X-API-Key` wins when both are present:
//! ```text
//! X-API-Key: <your-api-key>
//! Authorization: Bearer <your-api-key>
//! ```

use super::error::ApiError;
use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header checked before the Authorization bearer token.
const API_KEY_HEADER: &str = "x-api-key";

// =============================================================================
// PERMISSIONS
// =============================================================================

/// Actions a key can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    Admin,
}

impl Permission {
    /// Parse one table token; unknown tokens are rejected.
    fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }
}

/// The caller identity resolved by the gate, inserted into request
/// extensions for handlers that want to log or re-check it.
#[derive(Debug, Clone)]
pub struct Principal {
    pub name: String,
    permissions: Vec<Permission>,
}

impl Principal {
    /// Anonymous identity used when the gate is disabled.
    fn anonymous() -> Self {
        Self {
            name: "anonymous".to_string(),
            permissions: vec![Permission::Admin],
        }
    }

    /// Admin implies everything.
    #[must_use]
    pub fn allows(&self, needed: Permission) -> bool {
        self.permissions
            .iter()
            .any(|p| *p == needed || *p == Permission::Admin)
    }
}

// =============================================================================
// AUTH GATE
// =============================================================================

struct KeyEntry {
    key: String,
    principal: Principal,
}

/// Key table built once at startup.
pub struct AuthGate {
    enabled: bool,
    keys: Vec<KeyEntry>,
}

impl AuthGate {
    /// Build a gate from explicit entries. Used directly by tests.
    #[must_use]
    pub fn new(enabled: bool, entries: Vec<(String, String, Vec<Permission>)>) -> Self {
        let keys = entries
            .into_iter()
            .filter(|(key, _, _)| !key.is_empty())
            .map(|(key, name, permissions)| KeyEntry {
                key,
                principal: Principal { name, permissions },
            })
            .collect();
        Self { enabled, keys }
    }

    /// Build the gate from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let enabled = std::env::var("GRAPHMEM_AUTH_ENABLED")
            .map(|v| matches!(v.trim(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let mut entries = std::env::var("GRAPHMEM_API_KEYS")
            .ok()
            .map(|table| Self::parse_table(&table))
            .unwrap_or_default();

        // Single-key dev fallback, admin scope.
        if entries.is_empty()
            && let Ok(key) = std::env::var("GRAPHMEM_API_KEY")
            && !key.is_empty()
        {
            entries.push((key, "default".to_string(), vec![Permission::Admin]));
        }

        if enabled && entries.is_empty() {
            tracing::warn!(
                "GRAPHMEM_AUTH_ENABLED is set but no keys are configured; \
                 every request will be rejected"
            );
        }
        if !enabled {
            tracing::warn!(
                "API key authentication DISABLED - all endpoints are publicly accessible! \
                 Set GRAPHMEM_AUTH_ENABLED=true to enable authentication."
            );
        }

        Self::new(enabled, entries)
    }

    /// Parse `key:name:perm,perm|key2:name2:perm`. Malformed segments are
    /// skipped with a warning rather than failing startup.
    fn parse_table(table: &str) -> Vec<(String, String, Vec<Permission>)> {
        table
            .split('|')
            .filter(|seg| !seg.trim().is_empty())
            .filter_map(|seg| {
                let mut parts = seg.trim().splitn(3, ':');
                let key = parts.next()?.to_string();
                let name = parts.next()?.to_string();
                let perms: Vec<Permission> = parts
                    .next()?
                    .split(',')
                    .filter_map(Permission::parse)
                    .collect();
                if key.is_empty() || perms.is_empty() {
                    tracing::warn!(segment = seg, "ignoring malformed API key entry");
                    return None;
                }
                Some((key, name, perms))
            })
            .collect()
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Resolve a provided key to a principal.
    ///
    /// Every configured key is compared in constant time over padded
    /// buffers, and all entries are always scanned, so neither key length
    /// nor table position leaks through timing.
    #[must_use]
    pub fn authorize(&self, provided: &str) -> Option<Principal> {
        let mut matched: Option<&Principal> = None;
        for entry in &self.keys {
            if constant_time_eq(provided.as_bytes(), entry.key.as_bytes()) {
                matched = Some(&entry.principal);
            }
        }
        matched.cloned()
    }
}

/// Constant-time byte comparison with length padding.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let max_len = a.len().max(b.len());
    let mut padded_a = vec![0u8; max_len];
    let mut padded_b = vec![0u8; max_len];
    padded_a[..a.len()].copy_from_slice(a);
    padded_b[..b.len()].copy_from_slice(b);

    let bytes_match: bool = padded_a.ct_eq(&padded_b).into();
    bytes_match && a.len() == b.len()
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Middleware state: which gate, and which permission this route group
/// needs.
#[derive(Clone)]
pub struct AuthRequirement {
    pub gate: Arc<AuthGate>,
    pub needed: Permission,
}

/// Extract the key from `X-API-Key` or `Authorization: Bearer`.
fn extract_key(request: &Request<Body>) -> Option<&str> {
    if let Some(key) = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(key);
    }
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
}

/// Authenticate the request and check the route group's permission.
///
/// On success the resolved [`Principal`] is inserted into request
/// extensions.
pub async fn require_permission(
    State(requirement): State<AuthRequirement>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !requirement.gate.enabled() {
        request.extensions_mut().insert(Principal::anonymous());
        return Ok(next.run(request).await);
    }

    let Some(provided) = extract_key(&request) else {
        tracing::warn!(
            event = "auth_failure",
            reason = "missing_credential",
            path = %request.uri().path(),
            "request without API key"
        );
        return Err(ApiError::Unauthenticated);
    };

    let Some(principal) = requirement.gate.authorize(provided) else {
        tracing::warn!(
            event = "auth_failure",
            reason = "invalid_api_key",
            path = %request.uri().path(),
            "invalid API key"
        );
        return Err(ApiError::Unauthenticated);
    };

    if !principal.allows(requirement.needed) {
        tracing::warn!(
            event = "auth_failure",
            reason = "insufficient_permissions",
            principal = %principal.name,
            needed = requirement.needed.as_str(),
            "key lacks required permission"
        );
        return Err(ApiError::Forbidden {
            needed: requirement.needed.as_str(),
        });
    }

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> AuthGate {
        AuthGate::new(
            true,
            vec![
                (
                    "reader-key".to_string(),
                    "reader".to_string(),
                    vec![Permission::Read],
                ),
                (
                    "admin-key".to_string(),
                    "root".to_string(),
                    vec![Permission::Admin],
                ),
            ],
        )
    }

    #[test]
    fn test_authorize_known_key() {
        let principal = gate().authorize("reader-key");
        assert!(principal.is_some_and(|p| p.name == "reader"));
    }

    #[test]
    fn test_authorize_unknown_key() {
        assert!(gate().authorize("wrong-key").is_none());
    }

    #[test]
    fn test_admin_implies_all() {
        let principal = gate().authorize("admin-key").map(|p| {
            assert!(p.allows(Permission::Read));
            assert!(p.allows(Permission::Write));
            assert!(p.allows(Permission::Admin));
        });
        assert!(principal.is_some());
    }

    #[test]
    fn test_read_does_not_imply_write() {
        let principal = gate().authorize("reader-key").map(|p| {
            assert!(p.allows(Permission::Read));
            assert!(!p.allows(Permission::Write));
            assert!(!p.allows(Permission::Admin));
        });
        assert!(principal.is_some());
    }

    #[test]
    fn test_parse_table() {
        let entries =
            AuthGate::parse_table("k1:alice:read,write|k2:bob:admin|broken|k3:carol:bogus");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, "alice");
        assert_eq!(entries[0].2, vec![Permission::Read, Permission::Write]);
        assert_eq!(entries[1].2, vec![Permission::Admin]);
    }

    #[test]
    fn test_constant_time_eq_lengths() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secre"));
        assert!(!constant_time_eq(b"secret", b"secretx"));
        assert!(!constant_time_eq(b"", b"secret"));
    }
}
