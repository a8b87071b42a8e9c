//! Per-session table from opaque event keys to server-held handlers.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{BeyondError, Result};
use crate::handler::Handler;

/// Attempts made to mint a key that is not already in the table before the
/// render is abandoned.
pub const MAX_KEY_ATTEMPTS: usize = 255;

/// A random 128-bit token, hex encoded.
pub fn random_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Event keys of one render. Replaced wholesale by the next render, so keys
/// handed to the client are only valid until the page is pushed again.
#[derive(Debug)]
pub struct EventTable<M> {
    handlers: HashMap<String, Handler<M>>,
}

impl<M> Default for EventTable<M> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<M> EventTable<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Handler<M>> {
        self.handlers.get(key)
    }

    /// Stores `handler` under a fresh key drawn from `source` and returns it.
    pub fn bind(
        &mut self,
        handler: Handler<M>,
        source: &mut dyn FnMut() -> String,
    ) -> Result<String> {
        let key = generate_unique_key(self, source)?;
        self.handlers.insert(key.clone(), handler);
        Ok(key)
    }
}

pub fn generate_unique_key<M>(
    table: &EventTable<M>,
    source: &mut dyn FnMut() -> String,
) -> Result<String> {
    for _ in 0..MAX_KEY_ATTEMPTS {
        let key = source();
        if !table.contains_key(&key) {
            return Ok(key);
        }
    }
    Err(BeyondError::KeyspaceExhausted {
        attempts: MAX_KEY_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerFuture;
    use crate::session::{Event, Session};

    fn noop(_session: &mut Session<()>, _event: Event) -> HandlerFuture<'_> {
        Box::pin(async { Ok(()) })
    }

    #[test]
    fn random_keys_are_hex_tokens() {
        let key = random_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, random_key());
    }

    #[test]
    fn bind_retries_on_collision() {
        let mut table: EventTable<()> = EventTable::new();
        let mut fixed = || "taken".to_string();
        table.bind(Handler::new(noop), &mut fixed).expect("first bind");

        let mut calls = 0;
        let mut source = || {
            calls += 1;
            if calls < 3 {
                "taken".to_string()
            } else {
                "fresh".to_string()
            }
        };
        let key = table.bind(Handler::new(noop), &mut source).expect("second bind");
        assert_eq!(key, "fresh");
        assert_eq!(calls, 3);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn exhausted_keyspace_is_an_error() {
        let mut table: EventTable<()> = EventTable::new();
        let mut fixed = || "same".to_string();
        table.bind(Handler::new(noop), &mut fixed).expect("first bind");

        let mut attempts = 0;
        let mut source = || {
            attempts += 1;
            "same".to_string()
        };
        let err = table
            .bind(Handler::new(noop), &mut source)
            .expect_err("every candidate collides");
        assert!(matches!(
            err,
            BeyondError::KeyspaceExhausted { attempts: MAX_KEY_ATTEMPTS }
        ));
        assert_eq!(attempts, MAX_KEY_ATTEMPTS);
        assert_eq!(table.len(), 1);
    }
}
