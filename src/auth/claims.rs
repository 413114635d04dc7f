//! JWT claims carried by access and refresh tokens.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Distinguishes refresh tokens from access tokens signed with the same key
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims set for both token kinds
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the owning user's id
    pub user_id: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique token id, so two tokens issued in the same second differ
    pub jti: String,
    pub kind: TokenKind,
}

impl Claims {
    /// Create claims expiring `expiry_seconds` from now. The expiry saturates
    /// at `i64::MAX`.
    pub fn new(user_id: i64, kind: TokenKind, expiry_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self::with_expiry(user_id, kind, now, now.saturating_add(expiry_seconds))
    }

    /// Like [`Claims::new`], but `None` when the expiry overflows
    pub fn try_new(user_id: i64, kind: TokenKind, expiry_seconds: i64) -> Option<Self> {
        let now = chrono::Utc::now().timestamp();
        let exp = now.checked_add(expiry_seconds)?;
        Some(Self::with_expiry(user_id, kind, now, exp))
    }

    /// Create claims with explicit timestamps
    pub fn with_expiry(user_id: i64, kind: TokenKind, iat: i64, exp: i64) -> Self {
        Self {
            user_id,
            exp,
            iat,
            jti: Uuid::new_v4().to_string(),
            kind,
        }
    }

    /// Expired at or before `now`
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    pub fn is_refresh(&self) -> bool {
        self.kind == TokenKind::Refresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(7, TokenKind::Access, 3600);

        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.is_expired());
        assert!(!claims.is_refresh());
    }

    #[test]
    fn test_overflowing_expiry() {
        assert!(Claims::try_new(1, TokenKind::Access, i64::MAX).is_none());
        assert!(Claims::try_new(1, TokenKind::Access, 60).is_some());

        let saturated = Claims::new(1, TokenKind::Refresh, i64::MAX);
        assert_eq!(saturated.exp, i64::MAX);
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let claims = Claims::with_expiry(1, TokenKind::Access, 100, 200);

        assert!(!claims.is_expired_at(199));
        assert!(claims.is_expired_at(200));
        assert!(claims.is_expired_at(201));
    }

    #[test]
    fn test_jti_is_unique() {
        let a = Claims::with_expiry(1, TokenKind::Refresh, 0, 10);
        let b = Claims::with_expiry(1, TokenKind::Refresh, 0, 10);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_kind_serializes_as_tag() {
        let claims = Claims::with_expiry(3, TokenKind::Refresh, 0, 10);
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["kind"], "refresh");
        assert_eq!(json["user_id"], 3);
    }
}
