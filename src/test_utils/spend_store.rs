//! Spend store for testing purposes.
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::{SpendStore, TokenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpendState {
    Reserved,
    Committed,
}

/// Store that tracks redeemed tokens in memory.
#[derive(Default, Debug)]
pub struct MemorySpendStore {
    tokens: Mutex<HashMap<TokenId, SpendState>>,
}

impl MemorySpendStore {
    /// Returns true if the token has been committed as spent.
    pub async fn is_spent(&self, token_id: &TokenId) -> bool {
        self.tokens.lock().await.get(token_id) == Some(&SpendState::Committed)
    }
}

#[async_trait]
impl SpendStore for MemorySpendStore {
    async fn reserve(&self, token_id: &TokenId) -> bool {
        use std::collections::hash_map::Entry;
        match self.tokens.lock().await.entry(*token_id) {
            Entry::Vacant(e) => {
                e.insert(SpendState::Reserved);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    async fn commit(&self, token_id: &TokenId) {
        let mut tokens = self.tokens.lock().await;
        if let Some(state) = tokens.get_mut(token_id)
            && *state == SpendState::Reserved
        {
            *state = SpendState::Committed;
        }
    }

    async fn release(&self, token_id: &TokenId) {
        let mut tokens = self.tokens.lock().await;
        if tokens.get(token_id) == Some(&SpendState::Reserved) {
            tokens.remove(token_id);
        }
    }
}
