use serde::Serialize;

use crate::domain::DomainError;

/// Continuation-token chain for one store's document listing.
///
/// `tokens[0]` is always `None` (first page). A token is appended only after
/// the page before it was fetched and reported it, so walking back and forth
/// over known pages never needs to re-discover tokens.
///
/// `generation` is the store's document-set generation the tokens were
/// collected under; tokens from an older generation are not reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    tokens: Vec<Option<String>>,
    current_index: usize,
    generation: u64,
}

impl PageCursor {
    pub fn new() -> Self {
        Self {
            tokens: vec![None],
            current_index: 0,
            generation: 0,
        }
    }

    pub fn current_token(&self) -> Option<&str> {
        self.tokens
            .get(self.current_index)
            .and_then(|t| t.as_deref())
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn tokens(&self) -> &[Option<String>] {
        &self.tokens
    }

    pub fn has_previous(&self) -> bool {
        self.current_index > 0
    }

    /// Moves to the page identified by `next_token`, the token reported by the
    /// current page.
    pub fn advance(&mut self, next_token: Option<&str>) -> Result<(), DomainError> {
        let next = next_token.ok_or_else(|| DomainError::validation("already on the last page"))?;

        if self.tokens.get(self.current_index + 1).is_none() {
            self.tokens.push(Some(next.to_string()));
        }
        self.current_index += 1;
        Ok(())
    }

    pub fn retreat(&mut self) -> Result<(), DomainError> {
        if self.current_index == 0 {
            return Err(DomainError::validation("already on the first page"));
        }
        self.current_index -= 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.tokens.clear();
        self.tokens.push(None);
        self.current_index = 0;
    }

    /// Adopts `generation`, rewinding to the first page if it differs from the
    /// one the chain was built under. Returns whether the chain was dropped.
    pub fn rebase(&mut self, generation: u64) -> bool {
        if self.generation == generation {
            return false;
        }
        let dropped = !self.is_initial();
        self.reset();
        self.generation = generation;
        dropped
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_initial(&self) -> bool {
        self.current_index == 0 && self.tokens.len() == 1 && self.tokens[0].is_none()
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}
