//! The schema contract shared by every backend implementation.
//!
//! The backend generates its REST collections from a declared schema. This
//! module is the client's copy of that declaration: which entities exist, the
//! collection slug each one lives under, and how relations are resolved when a
//! query asks for them to be included.

use serde::de::DeserializeOwned;
use strum::{Display, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, IntoStaticStr)]
pub enum EntityName {
    User,
    Recipe,
    Ingredient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// A single related record whose id is stored in `foreign_key`.
    BelongsTo { foreign_key: &'static str },
    /// Many related records whose ids are stored in `ids_field`.
    BelongsToMany { ids_field: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub target: EntityName,
    pub kind: RelationKind,
}

const RECIPE_RELATIONS: &[Relation] = &[
    Relation {
        name: "chef",
        target: EntityName::User,
        kind: RelationKind::BelongsTo {
            foreign_key: "chefId",
        },
    },
    Relation {
        name: "ingredients",
        target: EntityName::Ingredient,
        kind: RelationKind::BelongsToMany {
            ids_field: "ingredientIds",
        },
    },
];

impl EntityName {
    /// Collection path segment, e.g. `/api/collections/recipes`.
    pub fn slug(self) -> &'static str {
        match self {
            EntityName::User => "users",
            EntityName::Recipe => "recipes",
            EntityName::Ingredient => "ingredients",
        }
    }

    pub fn relations(self) -> &'static [Relation] {
        match self {
            EntityName::Recipe => RECIPE_RELATIONS,
            EntityName::User | EntityName::Ingredient => &[],
        }
    }

    pub fn relation(self, name: &str) -> Option<&'static Relation> {
        self.relations().iter().find(|r| r.name == name)
    }
}

/// A record type stored in one of the backend's collections.
pub trait Entity: DeserializeOwned + Send + Sync + 'static {
    const NAME: EntityName;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_relations_are_declared() {
        let chef = EntityName::Recipe.relation("chef").unwrap();
        assert_eq!(chef.target, EntityName::User);
        assert_eq!(
            EntityName::Recipe.relation("ingredients").unwrap().kind,
            RelationKind::BelongsToMany {
                ids_field: "ingredientIds"
            }
        );
        assert!(EntityName::Ingredient.relation("chef").is_none());
    }

    #[test]
    fn slugs_are_plural() {
        assert_eq!(EntityName::User.slug(), "users");
        assert_eq!(EntityName::Recipe.slug(), "recipes");
        assert_eq!(EntityName::Ingredient.slug(), "ingredients");
    }
}
