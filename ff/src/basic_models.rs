use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::schema::{Entity, EntityName};

/// Identifier assigned by the backend to every stored entity.
pub type EntityId = i64;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[default]
    Chef,
    Admin,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: EntityId,
    pub name: String,
}

/// One rendition of an uploaded image.
///
/// The backend reports sizes either as a bare URL or as an object carrying one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhotoSize {
    Url(String),
    Object { url: String },
}

impl PhotoSize {
    pub fn url(&self) -> &str {
        match self {
            PhotoSize::Url(url) => url,
            PhotoSize::Object { url } => url,
        }
    }
}

/// An image stored by the backend, keyed by size name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub thumbnail: PhotoSize,
    #[serde(flatten)]
    pub other_sizes: BTreeMap<String, PhotoSize>,
}

impl Photo {
    pub fn thumbnail_url(&self) -> &str {
        self.thumbnail.url()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub photo: Option<Photo>,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub chef_id: EntityId,
    /// Only present when the `chef` relation was included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chef: Option<User>,
    /// Only populated when the `ingredients` relation was included.
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Recipe {
    /// Minutes from start to plate.
    pub fn total_time(&self) -> u32 {
        self.prep_time.saturating_add(self.cook_time)
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.photo.as_ref().map(Photo::thumbnail_url)
    }

    pub fn ingredient_ids(&self) -> Vec<EntityId> {
        self.ingredients.iter().map(|i| i.id).collect()
    }

    pub fn is_owned_by(&self, user: &User) -> bool {
        self.chef_id == user.id
    }
}

impl Entity for User {
    const NAME: EntityName = EntityName::User;
}

impl Entity for Recipe {
    const NAME: EntityName = EntityName::Recipe;
}

impl Entity for Ingredient {
    const NAME: EntityName = EntityName::Ingredient;
}

/// Attributes sent when creating or replacing a recipe.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeForUpload {
    pub title: String,
    pub description: String,
    pub photo: Option<Photo>,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub chef_id: EntityId,
    pub ingredient_ids: Vec<EntityId>,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct SignupForUpload {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl std::fmt::Debug for SignupForUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignupForUpload")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// A local image file waiting to be uploaded.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ImageForUpload {
    pub file_name: String,
    pub mime_type: String,
    pub content_bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageForUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageForUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("content_bytes", &self.content_bytes.len())
            .finish()
    }
}
