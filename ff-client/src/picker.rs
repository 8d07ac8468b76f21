//! Type-ahead selection of a recipe's ingredients.
//!
//! Every query change issues a new search; nothing is cancelled. Each search
//! carries the sequence number it was issued under and its results are only
//! applied if no later query change happened in the meantime, so a slow early
//! response can never overwrite a newer one.

use ff::basic_models::{EntityId, Ingredient};

use crate::backend::{Backend, Query};
use crate::errors::BackendResult;

/// Queries shorter than this (after trimming) do not search.
pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_RESULTS: usize = 10;

/// An issued search, to be run and then handed back to [`IngredientPicker::apply_results`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub seq: u64,
    pub text: String,
}

impl SearchTicket {
    pub fn query(&self) -> Query {
        Query::new().contains("name", &self.text).limit(MAX_RESULTS)
    }

    pub async fn fetch<B: Backend>(&self, backend: &B) -> BackendResult<Vec<Ingredient>> {
        Ok(backend.list::<Ingredient>(&self.query()).await?.data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientPicker {
    query: String,
    results: Vec<Ingredient>,
    selected: Vec<Ingredient>,
    /// Sequence number of the latest query change.
    issued: u64,
}

impl IngredientPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing selection, e.g. a recipe being edited.
    pub fn with_selection(ingredients: impl IntoIterator<Item = Ingredient>) -> Self {
        let mut picker = Self::new();
        for ingredient in ingredients {
            picker.add(ingredient);
        }
        picker
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[Ingredient] {
        &self.results
    }

    pub fn selected(&self) -> &[Ingredient] {
        &self.selected
    }

    pub fn selected_ids(&self) -> Vec<EntityId> {
        self.selected.iter().map(|i| i.id).collect()
    }

    /// Record a query change. Returns the search to run, if the query is long enough.
    pub fn set_query(&mut self, text: &str) -> Option<SearchTicket> {
        self.query = text.to_string();
        self.issued += 1;
        let trimmed = text.trim();
        if trimmed.chars().count() >= MIN_QUERY_LEN {
            Some(SearchTicket {
                seq: self.issued,
                text: trimmed.to_string(),
            })
        } else {
            self.results.clear();
            None
        }
    }

    /// Apply the results of a search. Returns false if they were stale and dropped.
    pub fn apply_results(&mut self, seq: u64, results: Vec<Ingredient>) -> bool {
        if seq != self.issued {
            tracing::warn!(seq, latest = self.issued, "Dropping stale ingredient results");
            return false;
        }
        self.results = results;
        true
    }

    /// Change the query and, if it is long enough, search and apply the results.
    ///
    /// A failed search keeps the previous results.
    pub async fn on_query_change<B: Backend>(&mut self, backend: &B, text: &str) -> BackendResult<()> {
        let Some(ticket) = self.set_query(text) else {
            return Ok(());
        };
        match ticket.fetch(backend).await {
            Ok(results) => {
                self.apply_results(ticket.seq, results);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Ingredient search for {:?} failed: {}", ticket.text, e);
                Err(e)
            }
        }
    }

    fn add(&mut self, ingredient: Ingredient) {
        if !self.selected.iter().any(|i| i.id == ingredient.id) {
            self.selected.push(ingredient);
        }
    }

    /// Add an ingredient to the selection and close the search.
    pub fn select(&mut self, ingredient: Ingredient) {
        self.add(ingredient);
        self.query.clear();
        self.results.clear();
        // Anything still in flight belongs to the closed search
        self.issued += 1;
    }

    /// Select the `index`th search result. Returns false if there is no such result.
    pub fn select_result(&mut self, index: usize) -> bool {
        match self.results.get(index).cloned() {
            Some(ingredient) => {
                self.select(ingredient);
                true
            }
            None => false,
        }
    }

    /// Remove an ingredient from the selection. Unknown ids are ignored.
    pub fn deselect(&mut self, id: EntityId) {
        self.selected.retain(|i| i.id != id);
    }
}
