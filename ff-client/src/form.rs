//! The recipe create/edit form.
//!
//! Lifecycle: `Idle -> Editing -> Submitting -> Idle`, or `Editing -> Idle` when
//! the draft is discarded. A failed submit returns to `Editing` with the draft
//! untouched.

use std::path::Path;

use ff::basic_models::{Difficulty, EntityId, Photo, Recipe, RecipeForUpload, User};
use strum::{Display, EnumString, IntoStaticStr};

use crate::backend::Backend;
use crate::errors::{FormError, FormResult};
use crate::picker::IngredientPicker;
use crate::preview::{read_photo, AttachedPhoto};

pub const DEFAULT_PREP_TIME: u32 = 30;
pub const DEFAULT_COOK_TIME: u32 = 45;
pub const DEFAULT_SERVINGS: u32 = 4;

/// Editable fields, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum DraftField {
    Title,
    Description,
    PrepTime,
    CookTime,
    Servings,
    Difficulty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DraftPhoto {
    #[default]
    None,
    /// Already stored by the backend (editing a recipe that has a photo).
    Existing(Photo),
    /// Picked locally, uploaded on submit.
    Attached(AttachedPhoto),
}

impl DraftPhoto {
    /// What to show in the photo slot: a remote thumbnail or a local data URL.
    pub fn preview(&self) -> Option<&str> {
        match self {
            DraftPhoto::None => None,
            DraftPhoto::Existing(photo) => Some(photo.thumbnail_url()),
            DraftPhoto::Attached(attached) => Some(&attached.preview),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub description: String,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub photo: DraftPhoto,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            prep_time: DEFAULT_PREP_TIME,
            cook_time: DEFAULT_COOK_TIME,
            servings: DEFAULT_SERVINGS,
            difficulty: Difficulty::Medium,
            photo: DraftPhoto::None,
        }
    }
}

impl Draft {
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self {
            title: recipe.title.clone(),
            description: recipe.description.clone().unwrap_or_default(),
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            servings: recipe.servings,
            difficulty: recipe.difficulty,
            photo: recipe
                .photo
                .clone()
                .map_or(DraftPhoto::None, DraftPhoto::Existing),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Editing,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit {
        recipe_id: EntityId,
        chef_id: EntityId,
    },
}

fn parse_count(field: DraftField, value: &str) -> FormResult<u32> {
    value.trim().parse().map_err(|_| FormError::NotANumber {
        field: field.into(),
        input: value.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct RecipeForm {
    phase: Phase,
    mode: FormMode,
    draft: Draft,
    picker: IngredientPicker,
}

impl Default for RecipeForm {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipeForm {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            mode: FormMode::Create,
            draft: Draft::default(),
            picker: IngredientPicker::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn picker(&self) -> &IngredientPicker {
        &self.picker
    }

    pub fn picker_mut(&mut self) -> &mut IngredientPicker {
        &mut self.picker
    }

    pub fn is_open(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Open a blank draft.
    pub fn begin_create(&mut self) {
        self.mode = FormMode::Create;
        self.draft = Draft::default();
        self.picker = IngredientPicker::new();
        self.phase = Phase::Editing;
    }

    /// Open a draft seeded from an existing recipe.
    pub fn begin_edit(&mut self, recipe: &Recipe) {
        self.mode = FormMode::Edit {
            recipe_id: recipe.id,
            chef_id: recipe.chef_id,
        };
        self.draft = Draft::from_recipe(recipe);
        self.picker = IngredientPicker::with_selection(recipe.ingredients.iter().cloned());
        self.phase = Phase::Editing;
    }

    /// Drop the draft and close the form.
    pub fn discard(&mut self) {
        *self = Self::new();
    }

    fn ensure_open(&self) -> FormResult<()> {
        if self.phase == Phase::Editing {
            Ok(())
        } else {
            Err(FormError::NotEditing)
        }
    }

    /// Set a field from user input.
    ///
    /// Invalid input is rejected and the field keeps its previous value.
    pub fn set_field(&mut self, name: &str, value: &str) -> FormResult<()> {
        self.ensure_open()?;
        let field: DraftField = name
            .parse()
            .map_err(|_| FormError::UnknownField(name.to_string()))?;
        match field {
            DraftField::Title => self.draft.title = value.to_string(),
            DraftField::Description => self.draft.description = value.to_string(),
            DraftField::PrepTime => self.draft.prep_time = parse_count(field, value)?,
            DraftField::CookTime => self.draft.cook_time = parse_count(field, value)?,
            DraftField::Servings => self.draft.servings = parse_count(field, value)?,
            DraftField::Difficulty => {
                self.draft.difficulty = value
                    .trim()
                    .parse()
                    .map_err(|_| FormError::UnknownDifficulty(value.to_string()))?
            }
        }
        Ok(())
    }

    /// Read a local image and hold it for upload, with a preview.
    pub async fn attach_photo(&mut self, path: impl AsRef<Path>) -> FormResult<()> {
        self.ensure_open()?;
        let attached = read_photo(path).await?;
        self.draft.photo = DraftPhoto::Attached(attached);
        Ok(())
    }

    pub fn remove_photo(&mut self) {
        self.draft.photo = DraftPhoto::None;
    }

    /// Compose the attributes to send. Ingredient ids always come from the selection.
    pub fn payload(&self, chef_id: EntityId, photo: Option<Photo>) -> FormResult<RecipeForUpload> {
        if self.draft.title.trim().is_empty() {
            return Err(FormError::MissingTitle);
        }
        Ok(RecipeForUpload {
            title: self.draft.title.clone(),
            description: self.draft.description.clone(),
            photo,
            prep_time: self.draft.prep_time,
            cook_time: self.draft.cook_time,
            servings: self.draft.servings,
            difficulty: self.draft.difficulty,
            chef_id,
            ingredient_ids: self.picker.selected_ids(),
        })
    }

    /// Save the draft as a new recipe owned by `chef`.
    pub async fn submit_create<B: Backend>(&mut self, backend: &B, chef: &User) -> FormResult<Recipe> {
        if self.mode != FormMode::Create {
            return Err(FormError::NotEditing);
        }
        self.submit_with(backend, chef.id, None).await
    }

    /// Save the draft over the recipe being edited. The owner never changes.
    pub async fn submit_edit<B: Backend>(&mut self, backend: &B) -> FormResult<Recipe> {
        let FormMode::Edit { recipe_id, chef_id } = self.mode else {
            return Err(FormError::NotEditing);
        };
        self.submit_with(backend, chef_id, Some(recipe_id)).await
    }

    /// Submit in whichever mode the form was opened.
    pub async fn submit<B: Backend>(&mut self, backend: &B, chef: &User) -> FormResult<Recipe> {
        match self.mode {
            FormMode::Create => self.submit_create(backend, chef).await,
            FormMode::Edit { .. } => self.submit_edit(backend).await,
        }
    }

    async fn submit_with<B: Backend>(
        &mut self,
        backend: &B,
        chef_id: EntityId,
        recipe_id: Option<EntityId>,
    ) -> FormResult<Recipe> {
        self.ensure_open()?;
        // Validate before touching the backend
        self.payload(chef_id, None)?;
        self.phase = Phase::Submitting;
        let result = self.send(backend, chef_id, recipe_id).await;
        match &result {
            Ok(recipe) => {
                tracing::info!(recipe_id = recipe.id, "Saved recipe {:?}", recipe.title);
                self.discard();
            }
            Err(e) => {
                tracing::error!("Failed to save recipe: {}", e);
                self.phase = Phase::Editing;
            }
        }
        result
    }

    async fn send<B: Backend>(
        &mut self,
        backend: &B,
        chef_id: EntityId,
        recipe_id: Option<EntityId>,
    ) -> FormResult<Recipe> {
        let photo = match &self.draft.photo {
            DraftPhoto::None => None,
            DraftPhoto::Existing(photo) => Some(photo.clone()),
            DraftPhoto::Attached(attached) => {
                let photo = backend
                    .upload_image::<Recipe>("photo", &attached.upload)
                    .await?;
                // A retry after a failed save must not upload the image again
                self.draft.photo = DraftPhoto::Existing(photo.clone());
                Some(photo)
            }
        };
        let upload = self.payload(chef_id, photo)?;
        let recipe = match recipe_id {
            None => backend.create::<Recipe, _>(&upload).await?,
            Some(id) => backend.update::<Recipe, _>(id, &upload).await?,
        };
        Ok(recipe)
    }
}
