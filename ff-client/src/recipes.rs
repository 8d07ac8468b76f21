use ff::basic_models::{EntityId, Recipe, User};

use crate::backend::{Backend, Direction, Query};
use crate::errors::BackendResult;

/// Shown in place of a recipe photo when there is none.
pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/400x400/e2e8f0/64748b?text=No+Image";

/// Every recipe with its chef and ingredients, newest first.
///
/// Not scoped to an owner: filtering happens in [`RecipeList::owned_by`].
pub fn all_recipes_query() -> Query {
    Query::new()
        .include("chef")
        .include("ingredients")
        .sort("createdAt", Direction::Desc)
}

pub fn thumbnail_or_placeholder(recipe: &Recipe) -> &str {
    recipe.thumbnail_url().unwrap_or(PLACEHOLDER_IMAGE)
}

#[derive(Debug, Clone, Default)]
pub struct RecipeList {
    recipes: Vec<Recipe>,
    loading: bool,
}

impl RecipeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the whole collection. On failure the list is left empty.
    pub async fn load<B: Backend>(&mut self, backend: &B) -> BackendResult<()> {
        self.loading = true;
        let result = backend.list::<Recipe>(&all_recipes_query()).await;
        self.loading = false;
        match result {
            Ok(page) => {
                tracing::info!("Loaded {} recipes", page.data.len());
                self.recipes = page.data;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load recipes: {}", e);
                self.recipes.clear();
                Err(e)
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn all(&self) -> &[Recipe] {
        &self.recipes
    }

    /// The recipes `chef` owns, in the order they were loaded.
    pub fn owned_by<'a>(&'a self, chef: &'a User) -> impl Iterator<Item = &'a Recipe> + 'a {
        self.recipes.iter().filter(move |r| r.is_owned_by(chef))
    }

    pub fn find_owned(&self, chef: &User, id: EntityId) -> Option<&Recipe> {
        self.recipes
            .iter()
            .find(|r| r.id == id && r.is_owned_by(chef))
    }
}
