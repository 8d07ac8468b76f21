use async_trait::async_trait;
use ff::basic_models::{EntityId, ImageForUpload, Photo, SignupForUpload, User};
use ff::Entity;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;

use super::{Backend, Direction, Filter, Page, Query};
use crate::errors::{BackendError, BackendResult};

/// The authenticatable entity every session belongs to.
const AUTH_SLUG: &str = "users";

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// HTTP client for a Manifest backend.
///
/// Holds the bearer token of the current session; all other state is remote.
pub struct ManifestClient {
    base_url: String,
    http: Client,
    token: RwLock<Option<String>>,
}

impl ManifestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            token: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and turn unsuccessful statuses into errors.
    async fn send(&self, request: RequestBuilder, auth_route: bool) -> BackendResult<Response> {
        let resp = self.authorized(request).await.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), %body, "Backend rejected request");
            Err(BackendError::from_status(status.as_u16(), body, auth_route))
        }
    }

    async fn store_token(&self, resp: Response) -> BackendResult<()> {
        let TokenResponse { token } = resp.json().await?;
        *self.token.write().await = Some(token);
        Ok(())
    }
}

/// Translate a [`Query`] into the backend's list query string.
pub fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![];
    if !query.include.is_empty() {
        params.push(("relations".to_string(), query.include.join(",")));
    }
    for filter in &query.filters {
        match filter {
            Filter::Contains { field, value } => {
                params.push((format!("{field}_like"), format!("%{value}%")));
            }
            Filter::Equals { field, value } => {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                params.push((format!("{field}_eq"), value));
            }
        }
    }
    if let Some(sort) = &query.sort {
        params.push(("orderBy".to_string(), sort.field.to_string()));
        let order = match sort.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        params.push(("order".to_string(), order.to_string()));
    }
    if let Some(limit) = query.limit {
        params.push(("perPage".to_string(), limit.to_string()));
    }
    params
}

#[async_trait]
impl Backend for ManifestClient {
    async fn authenticate(&self, email: &str, password: &str) -> BackendResult<()> {
        let request = self
            .http
            .post(self.url(&format!("auth/{AUTH_SLUG}/login")))
            .json(&json!({ "email": email, "password": password }));
        let resp = self.send(request, true).await?;
        self.store_token(resp).await
    }

    async fn current_session(&self) -> BackendResult<User> {
        if self.token.read().await.is_none() {
            return Err(BackendError::NotFound);
        }
        let request = self.http.get(self.url(&format!("auth/{AUTH_SLUG}/me")));
        match self.send(request, true).await {
            Ok(resp) => Ok(resp.json().await?),
            // An expired token is the same as no session at all
            Err(BackendError::Auth(_)) => Err(BackendError::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn signup(&self, signup: &SignupForUpload) -> BackendResult<User> {
        let request = self
            .http
            .post(self.url(&format!("auth/{AUTH_SLUG}/signup")))
            .json(signup);
        let resp = self.send(request, true).await?;
        self.store_token(resp).await?;
        self.current_session().await
    }

    async fn end_session(&self) -> BackendResult<()> {
        self.token.write().await.take();
        Ok(())
    }

    async fn list<E: Entity>(&self, query: &Query) -> BackendResult<Page<E>> {
        let request = self
            .http
            .get(self.url(&format!("collections/{}", E::NAME.slug())))
            .query(&query_params(query));
        Ok(self.send(request, false).await?.json().await?)
    }

    async fn create<E, A>(&self, attributes: &A) -> BackendResult<E>
    where
        E: Entity,
        A: Serialize + Sync,
    {
        let request = self
            .http
            .post(self.url(&format!("collections/{}", E::NAME.slug())))
            .json(attributes);
        Ok(self.send(request, false).await?.json().await?)
    }

    async fn update<E, A>(&self, id: EntityId, attributes: &A) -> BackendResult<E>
    where
        E: Entity,
        A: Serialize + Sync,
    {
        let request = self
            .http
            .put(self.url(&format!("collections/{}/{}", E::NAME.slug(), id)))
            .json(attributes);
        Ok(self.send(request, false).await?.json().await?)
    }

    async fn delete_by_id<E: Entity>(&self, id: EntityId) -> BackendResult<()> {
        let request = self
            .http
            .delete(self.url(&format!("collections/{}/{}", E::NAME.slug(), id)));
        self.send(request, false).await?;
        Ok(())
    }

    async fn upload_image<E: Entity>(
        &self,
        property: &str,
        image: &ImageForUpload,
    ) -> BackendResult<Photo> {
        let part = multipart::Part::bytes(image.content_bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)?;
        let form = multipart::Form::new()
            .part("image", part)
            .text("entity", E::NAME.slug())
            .text("property", property.to_string());
        let request = self.http.post(self.url("upload/image")).multipart(form);
        Ok(self.send(request, false).await?.json().await?)
    }

    async fn health(&self) -> BackendResult<()> {
        self.send(self.http.get(self.url("health")), false).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ff::basic_models::Recipe;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// A request as the fake backend received it.
    #[derive(Debug, Clone)]
    struct Seen {
        line: String,
        /// Request line and headers, lowercased.
        head: String,
        body: Vec<u8>,
    }

    async fn read_request(stream: &mut TcpStream) -> Option<Seen> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
        };
        let raw_head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let head = raw_head.to_lowercase();
        let length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok());
        let chunked = head.contains("transfer-encoding: chunked");
        loop {
            let done = match length {
                Some(length) => buf.len() >= header_end + length,
                None => !chunked || buf.ends_with(b"0\r\n\r\n"),
            };
            if done {
                break;
            }
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        Some(Seen {
            line: raw_head.lines().next()?.to_string(),
            head,
            body: buf[header_end..].to_vec(),
        })
    }

    /// Answer requests whose line starts with a route key ("POST /api/...") with a
    /// canned status and JSON body, 404 otherwise. Every request is recorded.
    async fn fake_backend(routes: Vec<(&'static str, u16, String)>) -> (String, Arc<Mutex<Vec<Seen>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let Some(request) = read_request(&mut stream).await else {
                    continue;
                };
                let (status, body) = routes
                    .iter()
                    .find(|(route, _, _)| request.line.starts_with(route))
                    .map(|(_, status, body)| (*status, body.clone()))
                    .unwrap_or((404, "{}".to_string()));
                log.lock().unwrap().push(request);
                let response = format!(
                    "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        (format!("http://{addr}"), seen)
    }

    fn ann_json() -> serde_json::Value {
        json!({"id": 7, "name": "Ann", "email": "ann@example.com", "role": "chef"})
    }

    fn pasta_json(id: EntityId) -> serde_json::Value {
        json!({
            "id": id, "title": "Pasta", "prepTime": 10, "cookTime": 20, "servings": 2,
            "difficulty": "Easy", "chefId": 7, "chef": ann_json(),
            "ingredients": [{"id": 3, "name": "Egg"}],
            "createdAt": "2024-05-01T12:00:00Z"
        })
    }

    #[tokio::test]
    async fn login_token_is_sent_as_bearer() {
        let (url, seen) = fake_backend(vec![
            ("POST /api/auth/users/login", 200, json!({"token": "t0k"}).to_string()),
            ("GET /api/auth/users/me", 200, ann_json().to_string()),
        ])
        .await;
        let client = ManifestClient::new(url);
        client.authenticate("ann@example.com", "pw").await.unwrap();
        let user = client.current_session().await.unwrap();
        assert_eq!(user.name, "Ann");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let credentials: serde_json::Value = serde_json::from_slice(&seen[0].body).unwrap();
        assert_eq!(credentials, json!({"email": "ann@example.com", "password": "pw"}));
        assert!(!seen[0].head.contains("authorization"));
        assert!(seen[1].head.contains("authorization: bearer t0k"));
    }

    #[tokio::test]
    async fn refused_token_means_no_session() {
        let (url, _) = fake_backend(vec![
            ("POST /api/auth/users/login", 200, json!({"token": "old"}).to_string()),
            ("GET /api/auth/users/me", 401, json!({"message": "Unauthorized"}).to_string()),
        ])
        .await;
        let client = ManifestClient::new(url);
        client.authenticate("ann@example.com", "pw").await.unwrap();
        assert!(matches!(
            client.current_session().await,
            Err(BackendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn bad_credentials_are_an_auth_failure() {
        let (url, _) = fake_backend(vec![(
            "POST /api/auth/users/login",
            401,
            json!({"message": "Invalid credentials"}).to_string(),
        )])
        .await;
        let client = ManifestClient::new(url);
        assert!(matches!(
            client.authenticate("ann@example.com", "nope").await,
            Err(BackendError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn list_decodes_a_page() {
        let page = json!({
            "data": [pasta_json(1)],
            "total": 1, "currentPage": 1, "lastPage": 1, "perPage": 20, "from": 1, "to": 1
        });
        let (url, seen) =
            fake_backend(vec![("GET /api/collections/recipes", 200, page.to_string())]).await;
        let client = ManifestClient::new(url);
        let query = Query::new()
            .include("chef")
            .include("ingredients")
            .sort("createdAt", Direction::Desc);
        let page: Page<Recipe> = client.list(&query).await.unwrap();

        assert_eq!(page.total, Some(1));
        let pasta = &page.data[0];
        assert_eq!(pasta.total_time(), 30);
        assert_eq!(pasta.chef.as_ref().map(|c| c.name.as_str()), Some("Ann"));
        assert_eq!(pasta.ingredients[0].name, "Egg");
        assert!(pasta.created_at.is_some());

        let line = seen.lock().unwrap()[0].line.clone();
        assert!(line.contains("relations=chef%2Cingredients"));
        assert!(line.contains("orderBy=createdAt&order=DESC"));
    }

    #[tokio::test]
    async fn update_puts_and_missing_delete_is_not_found() {
        let (url, seen) = fake_backend(vec![
            ("PUT /api/collections/recipes/5", 200, pasta_json(5).to_string()),
            ("DELETE /api/collections/recipes/9", 404, json!({}).to_string()),
        ])
        .await;
        let client = ManifestClient::new(url);
        let recipe: Recipe = client
            .update(5, &json!({"title": "Pasta"}))
            .await
            .unwrap();
        assert_eq!(recipe.id, 5);
        assert!(matches!(
            client.delete_by_id::<Recipe>(9).await,
            Err(BackendError::NotFound)
        ));
        let body: serde_json::Value =
            serde_json::from_slice(&seen.lock().unwrap()[0].body).unwrap();
        assert_eq!(body, json!({"title": "Pasta"}));
    }

    #[tokio::test]
    async fn upload_sends_multipart_and_decodes_sizes() {
        let sizes = json!({"thumbnail": "http://cdn/t.png", "large": "http://cdn/l.png"});
        let (url, seen) =
            fake_backend(vec![("POST /api/upload/image", 200, sizes.to_string())]).await;
        let client = ManifestClient::new(url);
        let image = ImageForUpload {
            file_name: "pie.png".into(),
            mime_type: "image/png".into(),
            content_bytes: b"\x89PNG\r\n\x1a\n".to_vec(),
        };
        let photo = client.upload_image::<Recipe>("photo", &image).await.unwrap();
        assert_eq!(photo.thumbnail_url(), "http://cdn/t.png");
        assert_eq!(photo.other_sizes["large"].url(), "http://cdn/l.png");

        let seen = seen.lock().unwrap();
        assert!(seen[0].head.contains("content-type: multipart/form-data; boundary="));
        let body = String::from_utf8_lossy(&seen[0].body).to_lowercase();
        assert!(body.contains(r#"name="image"; filename="pie.png""#));
        assert!(body.contains("content-type: image/png"));
        assert!(body.contains("name=\"entity\"\r\n\r\nrecipes\r\n"));
        assert!(body.contains("name=\"property\"\r\n\r\nphoto\r\n"));
    }

    #[test]
    fn recipe_listing_params() {
        let query = Query::new()
            .include("chef")
            .include("ingredients")
            .sort("createdAt", Direction::Desc);
        assert_eq!(
            query_params(&query),
            vec![
                ("relations".to_string(), "chef,ingredients".to_string()),
                ("orderBy".to_string(), "createdAt".to_string()),
                ("order".to_string(), "DESC".to_string()),
            ]
        );
    }

    #[test]
    fn ingredient_search_params() {
        let query = Query::new().contains("name", "egg").equals("id", 3).limit(10);
        assert_eq!(
            query_params(&query),
            vec![
                ("name_like".to_string(), "%egg%".to_string()),
                ("id_eq".to_string(), "3".to_string()),
                ("perPage".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn base_url_is_normalized() {
        let client = ManifestClient::new("http://localhost:1111/");
        assert_eq!(client.base_url(), "http://localhost:1111");
        assert_eq!(
            client.url("collections/recipes"),
            "http://localhost:1111/api/collections/recipes"
        );
    }

    #[tokio::test]
    async fn no_token_means_no_session() {
        let client = ManifestClient::new("http://127.0.0.1:9");
        assert!(matches!(
            client.current_session().await,
            Err(BackendError::NotFound)
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_connectivity_failure() {
        // Port 9 (discard) is closed on test machines
        let client = ManifestClient::new("http://127.0.0.1:9");
        assert!(matches!(
            client.health().await,
            Err(BackendError::Connectivity(_))
        ));
    }
}
