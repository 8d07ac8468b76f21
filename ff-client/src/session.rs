//! Who is signed in, and which screen they are looking at.

use std::sync::Arc;

use ff::basic_models::{Role, SignupForUpload, User};
use strum::Display;

use crate::backend::Backend;
use crate::config::DemoConfig;
use crate::errors::{BackendError, BackendResult};
use crate::prompt::{Notice, Prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Screen {
    Landing,
    Dashboard,
}

/// The backend status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Connectivity {
    Unknown,
    Online,
    Offline,
}

pub struct SessionController<B> {
    backend: Arc<B>,
    user: Option<User>,
    screen: Screen,
    initializing: bool,
    connectivity: Connectivity,
}

impl<B: Backend> SessionController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            user: None,
            screen: Screen::Landing,
            initializing: true,
            connectivity: Connectivity::Unknown,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// True until the startup session check has finished.
    pub fn is_initializing(&self) -> bool {
        self.initializing
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    fn sign_in(&mut self, user: User) {
        tracing::info!("User is logged in: {}", user.email);
        self.user = Some(user);
        self.screen = Screen::Dashboard;
    }

    fn sign_out_locally(&mut self) {
        self.user = None;
        self.screen = Screen::Landing;
    }

    /// Update the status indicator from a call made elsewhere.
    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        self.connectivity = connectivity;
    }

    /// Keep the status indicator in step with what the last call saw.
    fn observe<T>(&mut self, result: &BackendResult<T>) {
        match result {
            Err(BackendError::Connectivity(_)) => self.connectivity = Connectivity::Offline,
            // Any answer at all means the backend is reachable
            _ => self.connectivity = Connectivity::Online,
        }
    }

    /// Startup: probe the backend, then pick up an existing session if there is one.
    ///
    /// No failure here is shown to the user; not being signed in is not an error.
    pub async fn restore_session(&mut self) {
        let health = self.backend.health().await;
        self.observe(&health);
        if let Err(e) = health {
            tracing::error!("Backend connection failed: {}", e);
            self.sign_out_locally();
            self.initializing = false;
            return;
        }
        let session = self.backend.current_session().await;
        self.observe(&session);
        match session {
            Ok(user) => self.sign_in(user),
            Err(e) => {
                tracing::info!("No active session found: {}", e);
                self.sign_out_locally();
            }
        }
        self.initializing = false;
    }

    async fn authenticate(&self, email: &str, password: &str) -> BackendResult<User> {
        self.backend.authenticate(email, password).await?;
        self.backend.current_session().await
    }

    /// Sign in. Returns whether it worked; failures are reported through `prompt`.
    pub async fn login(&mut self, email: &str, password: &str, prompt: &mut impl Prompt) -> bool {
        if email.trim().is_empty() || password.is_empty() {
            prompt.alert(Notice::CredentialsRequired);
            return false;
        }
        let result = self.authenticate(email.trim(), password).await;
        self.observe(&result);
        match result {
            Ok(user) => {
                self.sign_in(user);
                true
            }
            Err(e) => {
                tracing::error!("Login failed: {}", e);
                prompt.alert(Notice::LoginFailed);
                false
            }
        }
    }

    /// Create a chef account and sign straight into it.
    pub async fn signup(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        prompt: &mut impl Prompt,
    ) -> bool {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            prompt.alert(Notice::SignupFieldsRequired);
            return false;
        }
        let signup = SignupForUpload {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
            role: Role::Chef,
        };
        let result = self.backend.signup(&signup).await;
        self.observe(&result);
        if let Err(e) = result {
            tracing::error!("Signup failed: {}", e);
            prompt.alert(Notice::SignupFailed);
            return false;
        }
        self.login(email, password, prompt).await
    }

    /// Sign in as the demo chef.
    pub async fn demo_login(&mut self, demo: &DemoConfig, prompt: &mut impl Prompt) -> bool {
        self.login(&demo.email, &demo.password, prompt).await
    }

    /// The backend stopped accepting the session: drop the dead session and go to landing.
    pub async fn expire(&mut self) {
        if let Some(user) = &self.user {
            tracing::warn!("Session expired for {}", user.email);
        }
        if let Err(e) = self.backend.end_session().await {
            tracing::debug!("Ending the expired session failed: {}", e);
        }
        self.sign_out_locally();
    }

    /// Sign out. Always succeeds locally, whatever the backend says.
    pub async fn logout(&mut self) {
        if let Err(e) = self.backend.end_session().await {
            tracing::warn!("Ending the remote session failed: {}", e);
        }
        self.sign_out_locally();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::prompt::ScriptedPrompt;

    fn backend_with_ann() -> (Arc<MemoryBackend>, User) {
        let backend = Arc::new(MemoryBackend::new());
        let ann = backend.add_user("Ann", "ann@example.com", "pw", Role::Chef);
        (backend, ann)
    }

    #[tokio::test]
    async fn restore_without_session_lands_quietly() {
        let (backend, _) = backend_with_ann();
        let mut session = SessionController::new(backend);
        assert!(session.is_initializing());
        session.restore_session().await;
        assert_eq!(session.screen(), Screen::Landing);
        assert!(session.user().is_none());
        assert!(!session.is_initializing());
        assert_eq!(session.connectivity(), Connectivity::Online);
    }

    #[tokio::test]
    async fn restore_with_session_goes_to_dashboard() {
        let (backend, ann) = backend_with_ann();
        backend.authenticate("ann@example.com", "pw").await.unwrap();
        let mut session = SessionController::new(backend);
        session.restore_session().await;
        assert_eq!(session.screen(), Screen::Dashboard);
        assert_eq!(session.user(), Some(&ann));
    }

    #[tokio::test]
    async fn restore_offline_marks_status() {
        let (backend, _) = backend_with_ann();
        backend.set_offline(true);
        let mut session = SessionController::new(backend.clone());
        session.restore_session().await;
        assert_eq!(session.screen(), Screen::Landing);
        assert_eq!(session.connectivity(), Connectivity::Offline);
        assert_eq!(backend.calls("current_session"), 0);
    }

    #[tokio::test]
    async fn bad_login_alerts_and_stays() {
        let (backend, _) = backend_with_ann();
        let mut session = SessionController::new(backend);
        let mut prompt = ScriptedPrompt::default();
        assert!(!session.login("ann@example.com", "wrong", &mut prompt).await);
        assert_eq!(prompt.alerts, [Notice::LoginFailed]);
        assert_eq!(session.screen(), Screen::Landing);
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn empty_credentials_never_reach_backend() {
        let (backend, _) = backend_with_ann();
        let mut session = SessionController::new(backend.clone());
        let mut prompt = ScriptedPrompt::default();
        assert!(!session.login("", "pw", &mut prompt).await);
        assert!(!session.login("ann@example.com", "", &mut prompt).await);
        assert_eq!(prompt.alerts, [Notice::CredentialsRequired; 2]);
        assert_eq!(backend.calls("authenticate"), 0);
    }

    #[tokio::test]
    async fn signup_creates_chef_and_signs_in() {
        let (backend, _) = backend_with_ann();
        let mut session = SessionController::new(backend);
        let mut prompt = ScriptedPrompt::default();
        assert!(
            session
                .signup("Bob", "bob@example.com", "secret", &mut prompt)
                .await
        );
        let bob = session.user().unwrap();
        assert_eq!(bob.name, "Bob");
        assert_eq!(bob.role, Role::Chef);
        assert_eq!(session.screen(), Screen::Dashboard);
        assert!(prompt.alerts.is_empty());
    }

    #[tokio::test]
    async fn duplicate_signup_alerts() {
        let (backend, _) = backend_with_ann();
        let mut session = SessionController::new(backend);
        let mut prompt = ScriptedPrompt::default();
        assert!(
            !session
                .signup("Ann again", "ann@example.com", "pw", &mut prompt)
                .await
        );
        assert_eq!(prompt.alerts, [Notice::SignupFailed]);
        assert_eq!(session.screen(), Screen::Landing);
    }

    #[tokio::test]
    async fn logout_succeeds_even_if_backend_fails() {
        let (backend, _) = backend_with_ann();
        let mut session = SessionController::new(backend.clone());
        let mut prompt = ScriptedPrompt::default();
        assert!(session.login("ann@example.com", "pw", &mut prompt).await);
        backend.reject("end_session");
        session.logout().await;
        assert_eq!(session.screen(), Screen::Landing);
        assert!(session.user().is_none());
        // The backend refused, so its session is still there
        assert!(backend.signed_in().is_some());
    }

    #[tokio::test]
    async fn expire_signs_out_locally_and_remotely() {
        let (backend, ann) = backend_with_ann();
        let mut session = SessionController::new(backend.clone());
        let mut prompt = ScriptedPrompt::default();
        assert!(session.login("ann@example.com", "pw", &mut prompt).await);
        assert_eq!(backend.signed_in(), Some(ann.id));

        session.expire().await;
        assert_eq!(session.screen(), Screen::Landing);
        assert!(session.user().is_none());
        assert_eq!(backend.signed_in(), None);
    }

    #[tokio::test]
    async fn demo_login_uses_configured_account() {
        let backend = Arc::new(MemoryBackend::new());
        let demo = DemoConfig::default();
        backend.add_user("Demo Chef", &demo.email, &demo.password, Role::Chef);
        let mut session = SessionController::new(backend);
        let mut prompt = ScriptedPrompt::default();
        assert!(session.demo_login(&demo, &mut prompt).await);
        assert_eq!(session.user().unwrap().name, "Demo Chef");
    }
}
