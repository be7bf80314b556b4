//! Server-side sessions and the per-session shopping cart.
//!
//! A login creates a session record in an in-memory cache and hands the
//! client a signed token naming it. The cart lives inside the record, so it
//! dies with the session and is never shared across devices. Cart mutation
//! is read-modify-write with last-write-wins; a session has a single user
//! behind it, so overlapping requests are not coordinated.

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::utils::create_id;

/// Product id -> desired quantity, plus optional free-text add-on notes per
/// product. Present entries always have quantity > 0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cart {
    quantities: HashMap<String, u32>,
    addons: HashMap<String, String>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    pub fn quantity(&self, product_id: &str) -> u32 {
        self.quantities.get(product_id).copied().unwrap_or(0)
    }

    pub fn addons(&self, product_id: &str) -> Option<&str> {
        self.addons.get(product_id).map(String::as_str)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.quantities.contains_key(product_id)
    }

    pub fn product_ids(&self) -> Vec<String> {
        self.quantities.keys().cloned().collect()
    }

    /// Adds to any existing quantity. A non-empty add-ons note replaces the
    /// stored one; an absent note leaves it alone.
    pub fn add(&mut self, product_id: &str, quantity: u32, addons: Option<&str>) {
        if quantity == 0 {
            return;
        }
        *self.quantities.entry(product_id.to_string()).or_insert(0) += quantity;
        if let Some(note) = addons {
            let note = note.trim();
            if !note.is_empty() {
                self.addons.insert(product_id.to_string(), note.to_string());
            }
        }
    }

    pub fn increment(&mut self, product_id: &str) {
        if let Some(qty) = self.quantities.get_mut(product_id) {
            *qty += 1;
        }
    }

    /// Dropping below one removes the entry and its add-ons note.
    pub fn decrement(&mut self, product_id: &str) {
        let Some(qty) = self.quantities.get_mut(product_id) else {
            return;
        };
        if *qty <= 1 {
            self.quantities.remove(product_id);
            self.addons.remove(product_id);
        } else {
            *qty -= 1;
        }
    }

    pub fn clear(&mut self) {
        self.quantities.clear();
        self.addons.clear();
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: String,
    pub expires_at: NaiveDateTime,
    pub cart: Cart,
}

/// In-memory session records keyed by session id.
pub struct SessionStore {
    sessions: moka::sync::Cache<String, Session>,
}

impl SessionStore {
    pub fn new(max_ttl: StdDuration) -> Self {
        Self {
            sessions: moka::sync::Cache::builder()
                .max_capacity(100_000)
                .time_to_live(max_ttl)
                .build(),
        }
    }

    pub fn create(&self, user_id: &str, ttl: Duration) -> String {
        let session_id = create_id();
        let session = Session {
            user_id: user_id.to_string(),
            expires_at: Utc::now().naive_utc() + ttl,
            cart: Cart::default(),
        };
        self.sessions.insert(session_id.clone(), session);
        session_id
    }

    /// Expired records are dropped on read; the cache TTL only bounds the
    /// longest-lived ("remember me") sessions.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let session = self.sessions.get(session_id)?;
        if session.expires_at < Utc::now().naive_utc() {
            self.sessions.invalidate(session_id);
            return None;
        }
        Some(session)
    }

    pub fn put(&self, session_id: &str, session: Session) {
        self.sessions.insert(session_id.to_string(), session);
    }

    pub fn remove(&self, session_id: &str) {
        self.sessions.invalidate(session_id);
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    /// Session id, resolved against the [`SessionStore`]
    pub sid: String,
    pub exp: i64,
}

/// HS256 keys for minting and checking session tokens.
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(
        &self,
        user_id: &str,
        session_id: &str,
        expires_at: NaiveDateTime,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            exp: expires_at.and_utc().timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        let data = decode::<SessionClaims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_add_accumulates() {
        let mut cart = Cart::default();
        cart.add("p1", 2, None);
        cart.add("p1", 3, Some("extra garlic"));
        assert_eq!(cart.quantity("p1"), 5);
        assert_eq!(cart.addons("p1"), Some("extra garlic"));
    }

    #[test]
    fn test_cart_add_keeps_existing_addons() {
        let mut cart = Cart::default();
        cart.add("p1", 1, Some("no onions"));
        cart.add("p1", 1, None);
        cart.add("p1", 1, Some("   "));
        assert_eq!(cart.addons("p1"), Some("no onions"));
    }

    #[test]
    fn test_cart_decrement_to_zero_removes_entry_and_addons() {
        let mut cart = Cart::default();
        cart.add("p1", 2, Some("spicy"));
        cart.decrement("p1");
        assert_eq!(cart.quantity("p1"), 1);
        assert_eq!(cart.addons("p1"), Some("spicy"));
        cart.decrement("p1");
        assert!(!cart.contains("p1"));
        assert_eq!(cart.addons("p1"), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_decrement_unknown_is_noop() {
        let mut cart = Cart::default();
        cart.decrement("missing");
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_increment_only_touches_present_entries() {
        let mut cart = Cart::default();
        cart.increment("p1");
        assert!(!cart.contains("p1"));
        cart.add("p1", 1, None);
        cart.increment("p1");
        assert_eq!(cart.quantity("p1"), 2);
    }

    #[test]
    fn test_cart_clear_empties_both_maps() {
        let mut cart = Cart::default();
        cart.add("p1", 1, Some("extra rice"));
        cart.add("p2", 4, None);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.addons("p1"), None);
    }

    #[test]
    fn test_session_store_roundtrip() {
        let store = SessionStore::new(StdDuration::from_secs(3600));
        let sid = store.create("user-1", Duration::hours(1));
        let session = store.get(&sid).unwrap();
        assert_eq!(session.user_id, "user-1");
        store.remove(&sid);
        assert!(store.get(&sid).is_none());
    }

    #[test]
    fn test_session_store_drops_expired_records() {
        let store = SessionStore::new(StdDuration::from_secs(3600));
        let sid = store.create("user-1", Duration::seconds(-1));
        assert!(store.get(&sid).is_none());
    }

    #[test]
    fn test_session_token_roundtrip() {
        let keys = SessionKeys::new("secret");
        let expires_at = Utc::now().naive_utc() + Duration::hours(1);
        let token = keys.issue("user-1", "sid-1", expires_at).unwrap();
        let claims = keys.validate(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.sid, "sid-1");
    }

    #[test]
    fn test_session_token_rejects_expired_and_foreign_tokens() {
        let keys = SessionKeys::new("secret");
        let expired = keys
            .issue("user-1", "sid-1", Utc::now().naive_utc() - Duration::hours(1))
            .unwrap();
        assert!(keys.validate(&expired).is_err());

        let other = SessionKeys::new("other-secret");
        let foreign = other
            .issue("user-1", "sid-1", Utc::now().naive_utc() + Duration::hours(1))
            .unwrap();
        assert!(keys.validate(&foreign).is_err());
    }
}
