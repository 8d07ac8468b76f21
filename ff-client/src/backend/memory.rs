//! An in-process backend honouring the same schema contract as the real one.
//!
//! Records are kept as JSON objects, the way a schemaless store keeps them, and
//! only turned into typed entities on the way out. Relations are resolved from
//! [`EntityName::relations`], so the stub and the client agree on the schema.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ff::basic_models::{
    EntityId, ImageForUpload, Ingredient, Photo, PhotoSize, Role, SignupForUpload, User,
};
use ff::schema::RelationKind;
use ff::{Entity, EntityName};
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{Backend, Direction, Filter, Page, Query};
use crate::errors::{BackendError, BackendResult};

/// Logical clock start, so creation order is stable however fast tests run.
const EPOCH: i64 = 1_700_000_000;

#[derive(Default)]
struct Store {
    tables: BTreeMap<EntityName, Vec<Map<String, Value>>>,
    passwords: BTreeMap<String, (String, EntityId)>,
    session: Option<EntityId>,
    next_id: EntityId,
    ticks: i64,
    calls: Vec<&'static str>,
    offline: bool,
    expired: bool,
    rejecting: HashSet<&'static str>,
}

/// Calls that work without a live session.
const SESSIONLESS: [&str; 5] = ["authenticate", "signup", "current_session", "end_session", "health"];

impl Store {
    fn next_id(&mut self) -> EntityId {
        self.next_id += 1;
        self.next_id
    }

    fn now(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        DateTime::from_timestamp(EPOCH + self.ticks, 0).unwrap_or_default()
    }

    /// Record a call and apply any injected failure for it.
    fn enter(&mut self, op: &'static str) -> BackendResult<()> {
        self.calls.push(op);
        if self.offline {
            return Err(BackendError::Connectivity("memory backend is offline".into()));
        }
        if self.expired && !SESSIONLESS.contains(&op) {
            return Err(BackendError::Auth("session expired".into()));
        }
        if self.rejecting.contains(op) {
            return Err(BackendError::operation(500, format!("{op} rejected")));
        }
        Ok(())
    }

    fn table(&mut self, name: EntityName) -> &mut Vec<Map<String, Value>> {
        self.tables.entry(name).or_default()
    }

    fn find(&self, name: EntityName, id: EntityId) -> Option<&Map<String, Value>> {
        self.tables
            .get(&name)?
            .iter()
            .find(|row| row.get("id").and_then(Value::as_i64) == Some(id))
    }

    fn insert(&mut self, name: EntityName, attributes: Value) -> BackendResult<Map<String, Value>> {
        let Value::Object(mut row) = attributes else {
            return Err(BackendError::operation(400, "attributes must be an object"));
        };
        let id = self.next_id();
        let created_at = self.now();
        row.insert("id".into(), json!(id));
        row.insert("createdAt".into(), json!(created_at));
        self.table(name).push(row.clone());
        Ok(row)
    }

    /// Attach the requested relations to a copy of `row`.
    fn resolve(&self, name: EntityName, row: &Map<String, Value>, include: &[&str]) -> Value {
        let mut out = row.clone();
        for relation in include.iter().filter_map(|r| name.relation(r)) {
            let related = match relation.kind {
                RelationKind::BelongsTo { foreign_key } => row
                    .get(foreign_key)
                    .and_then(Value::as_i64)
                    .and_then(|id| self.find(relation.target, id))
                    .map(|r| Value::Object(r.clone()))
                    .unwrap_or(Value::Null),
                RelationKind::BelongsToMany { ids_field } => Value::Array(
                    row.get(ids_field)
                        .and_then(Value::as_array)
                        .into_iter()
                        .flatten()
                        .filter_map(Value::as_i64)
                        .filter_map(|id| self.find(relation.target, id))
                        .map(|r| Value::Object(r.clone()))
                        .collect(),
                ),
            };
            out.insert(relation.name.into(), related);
        }
        Value::Object(out)
    }
}

fn matches(row: &Map<String, Value>, filter: &Filter) -> bool {
    match filter {
        Filter::Contains { field, value } => row
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|s| s.to_lowercase().contains(&value.to_lowercase())),
        Filter::Equals { field, value } => row.get(*field) == Some(value),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn decode<E: Entity>(value: Value) -> BackendResult<E> {
    serde_json::from_value(value).map_err(|e| BackendError::operation(500, e.to_string()))
}

/// In-memory stand-in for the remote backend.
#[derive(Default)]
pub struct MemoryBackend {
    store: Mutex<Store>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an account directly, bypassing signup.
    pub fn add_user(&self, name: &str, email: &str, password: &str, role: Role) -> User {
        let mut store = self.lock();
        let id = store.next_id();
        let user = User {
            id,
            name: name.into(),
            email: email.into(),
            role,
        };
        store
            .passwords
            .insert(email.into(), (password.into(), id));
        let row = json!(user).as_object().cloned().unwrap_or_default();
        store.table(EntityName::User).push(row);
        user
    }

    pub fn add_ingredients(&self, names: &[&str]) -> Vec<Ingredient> {
        let mut store = self.lock();
        names
            .iter()
            .map(|name| {
                let id = store.next_id();
                let ingredient = Ingredient {
                    id,
                    name: name.to_string(),
                };
                let row = json!(ingredient).as_object().cloned().unwrap_or_default();
                store.table(EntityName::Ingredient).push(row);
                ingredient
            })
            .collect()
    }

    /// Store a raw record, as an admin would through the admin panel.
    pub fn insert(&self, name: EntityName, attributes: Value) -> EntityId {
        self.lock()
            .insert(name, attributes)
            .ok()
            .and_then(|row| row.get("id").and_then(Value::as_i64))
            .unwrap_or_default()
    }

    /// Raw stored record, without relations.
    pub fn record(&self, name: EntityName, id: EntityId) -> Option<Value> {
        self.lock().find(name, id).cloned().map(Value::Object)
    }

    pub fn count(&self, name: EntityName) -> usize {
        self.lock().tables.get(&name).map_or(0, Vec::len)
    }

    /// How many times `op` has been called (e.g. `"create"`, `"delete_by_id"`).
    pub fn calls(&self, op: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    pub fn signed_in(&self) -> Option<EntityId> {
        self.lock().session
    }

    /// Make every call fail with a connectivity error.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Expire the current session: everything but signing in again fails with `Auth`.
    pub fn expire_session(&self) {
        let mut store = self.lock();
        store.session = None;
        store.expired = true;
    }

    /// Make calls to `op` fail with an operation error.
    pub fn reject(&self, op: &'static str) {
        self.lock().rejecting.insert(op);
    }

    pub fn accept(&self, op: &'static str) {
        self.lock().rejecting.remove(op);
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn authenticate(&self, email: &str, password: &str) -> BackendResult<()> {
        let mut store = self.lock();
        store.enter("authenticate")?;
        let id = match store.passwords.get(email) {
            Some((expected, id)) if expected == password => *id,
            _ => return Err(BackendError::Auth("invalid credentials".into())),
        };
        store.session = Some(id);
        store.expired = false;
        Ok(())
    }

    async fn current_session(&self) -> BackendResult<User> {
        let mut store = self.lock();
        store.enter("current_session")?;
        let id = store.session.ok_or(BackendError::NotFound)?;
        let row = store
            .find(EntityName::User, id)
            .cloned()
            .ok_or(BackendError::NotFound)?;
        decode(Value::Object(row))
    }

    async fn signup(&self, signup: &SignupForUpload) -> BackendResult<User> {
        {
            let mut store = self.lock();
            store.enter("signup")?;
            if store.passwords.contains_key(&signup.email) {
                return Err(BackendError::Auth("email already in use".into()));
            }
        }
        Ok(self.add_user(&signup.name, &signup.email, &signup.password, signup.role))
    }

    async fn end_session(&self) -> BackendResult<()> {
        let mut store = self.lock();
        store.enter("end_session")?;
        store.session = None;
        Ok(())
    }

    async fn list<E: Entity>(&self, query: &Query) -> BackendResult<Page<E>> {
        let mut store = self.lock();
        store.enter("list")?;
        let mut rows: Vec<&Map<String, Value>> = store
            .tables
            .get(&E::NAME)
            .into_iter()
            .flatten()
            .filter(|row| query.filters.iter().all(|f| matches(row, f)))
            .collect();
        if let Some(sort) = &query.sort {
            // Ties fall back to insertion order, like a database's primary key
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(sort.field), b.get(sort.field))
                    .then_with(|| compare(a.get("id"), b.get("id")));
                match sort.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }
        let data = rows
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|row| decode(store.resolve(E::NAME, row, &query.include)))
            .collect::<BackendResult<Vec<E>>>()?;
        Ok(Page::new(data))
    }

    async fn create<E, A>(&self, attributes: &A) -> BackendResult<E>
    where
        E: Entity,
        A: Serialize + Sync,
    {
        let attributes =
            serde_json::to_value(attributes).map_err(|e| BackendError::operation(400, e.to_string()))?;
        let mut store = self.lock();
        store.enter("create")?;
        let row = store.insert(E::NAME, attributes)?;
        decode(Value::Object(row))
    }

    async fn update<E, A>(&self, id: EntityId, attributes: &A) -> BackendResult<E>
    where
        E: Entity,
        A: Serialize + Sync,
    {
        let Value::Object(attributes) =
            serde_json::to_value(attributes).map_err(|e| BackendError::operation(400, e.to_string()))?
        else {
            return Err(BackendError::operation(400, "attributes must be an object"));
        };
        let mut store = self.lock();
        store.enter("update")?;
        let row = store
            .table(E::NAME)
            .iter_mut()
            .find(|row| row.get("id").and_then(Value::as_i64) == Some(id))
            .ok_or(BackendError::NotFound)?;
        for (key, value) in attributes {
            // Identity and creation time are owned by the backend
            if key != "id" && key != "createdAt" {
                row.insert(key, value);
            }
        }
        decode(Value::Object(row.clone()))
    }

    async fn delete_by_id<E: Entity>(&self, id: EntityId) -> BackendResult<()> {
        let mut store = self.lock();
        store.enter("delete_by_id")?;
        let table = store.table(E::NAME);
        let before = table.len();
        table.retain(|row| row.get("id").and_then(Value::as_i64) != Some(id));
        if table.len() == before {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn upload_image<E: Entity>(
        &self,
        property: &str,
        image: &ImageForUpload,
    ) -> BackendResult<Photo> {
        let mut store = self.lock();
        store.enter("upload_image")?;
        let id = store.next_id();
        let base = format!("memory://{}/{}/{}", E::NAME.slug(), property, id);
        Ok(Photo {
            thumbnail: PhotoSize::Url(format!("{base}/thumbnail-{}", image.file_name)),
            other_sizes: BTreeMap::from([(
                "large".to_string(),
                PhotoSize::Url(format!("{base}/large-{}", image.file_name)),
            )]),
        })
    }

    async fn health(&self) -> BackendResult<()> {
        self.lock().enter("health")
    }
}
