use std::sync::Arc;

use ff::basic_models::{EntityId, Recipe, User};

use crate::backend::Backend;
use crate::errors::{BackendError, FormError, FormResult};
use crate::form::RecipeForm;
use crate::prompt::{Notice, Prompt};
use crate::recipes::RecipeList;
use crate::session::Connectivity;

pub const DELETE_QUESTION: &str = "Are you sure you want to delete this recipe?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    List,
    Create,
    Edit,
}

/// The signed-in chef's workspace: their recipe list and the recipe form.
pub struct Dashboard<B> {
    backend: Arc<B>,
    chef: User,
    view: View,
    recipes: RecipeList,
    form: RecipeForm,
    selected: Option<EntityId>,
    /// Set once the backend refuses this chef's session.
    expired: bool,
    /// What the last backend call said about reachability, not yet reported.
    connectivity: Option<Connectivity>,
}

impl<B: Backend> Dashboard<B> {
    pub fn new(backend: Arc<B>, chef: User) -> Self {
        Self {
            backend,
            chef,
            view: View::List,
            recipes: RecipeList::new(),
            form: RecipeForm::new(),
            selected: None,
            expired: false,
            connectivity: None,
        }
    }

    /// Build the dashboard and load the recipe list.
    pub async fn open(backend: Arc<B>, chef: User) -> Self {
        let mut dashboard = Self::new(backend, chef);
        dashboard.reload().await;
        dashboard
    }

    pub fn chef(&self) -> &User {
        &self.chef
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn recipes(&self) -> &RecipeList {
        &self.recipes
    }

    /// What the list view shows: only this chef's recipes, newest first.
    pub fn my_recipes(&self) -> Vec<&Recipe> {
        self.recipes.owned_by(&self.chef).collect()
    }

    pub fn form(&self) -> &RecipeForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut RecipeForm {
        &mut self.form
    }

    pub fn selected_recipe(&self) -> Option<&Recipe> {
        self.selected
            .and_then(|id| self.recipes.find_owned(&self.chef, id))
    }

    /// True once a call failed because the session is no longer valid.
    pub fn session_expired(&self) -> bool {
        self.expired
    }

    /// Take the reachability seen since the last call to this.
    pub fn take_connectivity(&mut self) -> Option<Connectivity> {
        self.connectivity.take()
    }

    /// Record the outcome of a backend call. `None` means it succeeded.
    fn observe(&mut self, error: Option<&BackendError>) {
        self.connectivity = Some(match error {
            Some(BackendError::Connectivity(_)) => Connectivity::Offline,
            _ => Connectivity::Online,
        });
        if let Some(BackendError::Auth(e)) = error {
            tracing::warn!("Session rejected by the backend: {}", e);
            self.expired = true;
        }
    }

    pub async fn reload(&mut self) {
        let result = self.recipes.load(&*self.backend).await;
        self.observe(result.as_ref().err());
    }

    pub fn open_create(&mut self) {
        self.selected = None;
        self.form.begin_create();
        self.view = View::Create;
    }

    /// Open one of this chef's recipes for editing. Returns false if it is not theirs.
    pub fn open_edit(&mut self, recipe_id: EntityId) -> bool {
        let Some(recipe) = self.recipes.find_owned(&self.chef, recipe_id) else {
            return false;
        };
        self.form.begin_edit(recipe);
        self.selected = Some(recipe_id);
        self.view = View::Edit;
        true
    }

    /// Leave the form, dropping the draft.
    pub fn back_to_list(&mut self) {
        self.form.discard();
        self.selected = None;
        self.view = View::List;
    }

    /// Change the ingredient search text, searching when it is long enough.
    pub async fn search_ingredients(&mut self, text: &str) {
        let result = self
            .form
            .picker_mut()
            .on_query_change(&*self.backend, text)
            .await;
        if let Err(e) = result {
            self.observe(Some(&e));
        }
    }

    /// Submit the form; on success return to a freshly loaded list.
    pub async fn save(&mut self) -> FormResult<Recipe> {
        let result = self.form.submit(&*self.backend, &self.chef).await;
        match &result {
            Err(FormError::Backend(e)) => self.observe(Some(e)),
            Err(_) => {}
            Ok(_) => self.observe(None),
        }
        let recipe = result?;
        self.selected = None;
        self.view = View::List;
        self.reload().await;
        Ok(recipe)
    }

    /// Delete the recipe being edited, after asking.
    pub async fn delete_selected(&mut self, prompt: &mut impl Prompt) -> bool {
        match self.selected {
            Some(id) => self.delete_recipe(id, prompt).await,
            None => false,
        }
    }

    /// Delete a recipe after confirmation. Nothing is sent if the user declines.
    pub async fn delete_recipe(&mut self, recipe_id: EntityId, prompt: &mut impl Prompt) -> bool {
        if !prompt.confirm(DELETE_QUESTION).await {
            return false;
        }
        match self.backend.delete_by_id::<Recipe>(recipe_id).await {
            Ok(()) => {
                tracing::info!(recipe_id, "Deleted recipe");
                self.observe(None);
                self.back_to_list();
                self.reload().await;
                true
            }
            Err(e) => {
                tracing::error!("Failed to delete recipe: {}", e);
                self.observe(Some(&e));
                prompt.alert(Notice::DeleteFailed);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::form::Phase;
    use crate::prompt::ScriptedPrompt;
    use ff::basic_models::Role;

    async fn dashboard_with_recipe() -> (Arc<MemoryBackend>, Dashboard<MemoryBackend>, EntityId) {
        let backend = Arc::new(MemoryBackend::new());
        let ann = backend.add_user("Ann", "ann@example.com", "pw", Role::Chef);
        let mut dashboard = Dashboard::open(backend.clone(), ann).await;
        dashboard.open_create();
        dashboard.form_mut().set_field("title", "Toast").unwrap();
        let recipe = dashboard.save().await.unwrap();
        (backend, dashboard, recipe.id)
    }

    #[tokio::test]
    async fn save_returns_to_reloaded_list() {
        let (_, dashboard, id) = dashboard_with_recipe().await;
        assert_eq!(dashboard.view(), View::List);
        assert_eq!(dashboard.form().phase(), Phase::Idle);
        let ids: Vec<_> = dashboard.my_recipes().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![id]);
    }

    #[tokio::test]
    async fn declined_delete_sends_nothing() {
        let (backend, mut dashboard, id) = dashboard_with_recipe().await;
        assert!(dashboard.open_edit(id));
        let mut prompt = ScriptedPrompt::answering([false]);
        assert!(!dashboard.delete_selected(&mut prompt).await);
        assert_eq!(prompt.questions, [DELETE_QUESTION]);
        assert_eq!(backend.calls("delete_by_id"), 0);
        assert_eq!(dashboard.view(), View::Edit);
        assert_eq!(dashboard.form().phase(), Phase::Editing);
    }

    #[tokio::test]
    async fn confirmed_delete_reloads() {
        let (backend, mut dashboard, id) = dashboard_with_recipe().await;
        assert!(dashboard.open_edit(id));
        let mut prompt = ScriptedPrompt::answering([true]);
        assert!(dashboard.delete_selected(&mut prompt).await);
        assert_eq!(dashboard.view(), View::List);
        assert!(dashboard.my_recipes().is_empty());
        assert_eq!(backend.count(ff::EntityName::Recipe), 0);
    }

    #[tokio::test]
    async fn failed_delete_alerts_and_stays() {
        let (backend, mut dashboard, id) = dashboard_with_recipe().await;
        assert!(dashboard.open_edit(id));
        backend.reject("delete_by_id");
        let mut prompt = ScriptedPrompt::answering([true]);
        assert!(!dashboard.delete_selected(&mut prompt).await);
        assert_eq!(prompt.alerts, [Notice::DeleteFailed]);
        assert_eq!(dashboard.view(), View::Edit);
        assert_eq!(dashboard.selected_recipe().map(|r| r.id), Some(id));
    }

    #[tokio::test]
    async fn cannot_edit_someone_elses_recipe() {
        let (backend, mut dashboard, _) = dashboard_with_recipe().await;
        let bob = backend.add_user("Bob", "bob@example.com", "pw", Role::Chef);
        let mut bobs = Dashboard::open(backend.clone(), bob).await;
        bobs.open_create();
        bobs.form_mut().set_field("title", "Bob's stew").unwrap();
        let stew = bobs.save().await.unwrap();

        dashboard.reload().await;
        assert_eq!(dashboard.recipes().all().len(), 2);
        assert!(!dashboard.open_edit(stew.id));
        assert_eq!(dashboard.view(), View::List);
    }

    #[tokio::test]
    async fn back_discards_draft() {
        let (_, mut dashboard, _) = dashboard_with_recipe().await;
        dashboard.open_create();
        dashboard.form_mut().set_field("title", "Half-written").unwrap();
        dashboard.back_to_list();
        assert_eq!(dashboard.view(), View::List);
        assert!(!dashboard.form().is_open());
        dashboard.open_create();
        assert_eq!(dashboard.form().draft().title, "");
    }
}
