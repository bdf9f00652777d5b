//! Token Registry
//!
//! Maps bearer tokens to caller identities. Only sha256 hashes of tokens
//! are held in memory; the raw token exists nowhere but the client.
//! Issuing and rotating tokens is an operator concern outside this crate.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::domain::CallerIdentity;

/// Compute the lowercase hex sha256 of a raw token
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)
}

/// In-memory registry of token hash -> caller identity
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    by_hash: HashMap<String, CallerIdentity>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a caller under an already-hashed token
    pub fn insert_hash(&mut self, token_hash: impl Into<String>, caller: CallerIdentity) {
        self.by_hash.insert(token_hash.into().to_lowercase(), caller);
    }

    /// Register a caller under a raw token (hashes it first)
    pub fn insert_token(&mut self, token: &str, caller: CallerIdentity) {
        self.insert_hash(hash_token(token), caller);
    }

    /// Resolve a presented raw token to its caller, if registered
    pub fn resolve(&self, token: &str) -> Option<CallerIdentity> {
        self.by_hash.get(&hash_token(token)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }
}
