use std::sync::Arc;

use crate::backend::Backend;
use crate::config::DemoConfig;
use crate::dashboard::Dashboard;
use crate::prompt::{Notice, Prompt};
use crate::session::{Screen, SessionController};

/// Top-level application state.
///
/// The dashboard only exists while someone is signed in; signing out drops it,
/// and any draft with it.
pub struct App<B> {
    backend: Arc<B>,
    session: SessionController<B>,
    dashboard: Option<Dashboard<B>>,
}

impl<B: Backend> App<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            session: SessionController::new(backend.clone()),
            backend,
            dashboard: None,
        }
    }

    pub fn session(&self) -> &SessionController<B> {
        &self.session
    }

    pub fn dashboard(&self) -> Option<&Dashboard<B>> {
        self.dashboard.as_ref()
    }

    pub fn dashboard_mut(&mut self) -> Option<&mut Dashboard<B>> {
        self.dashboard.as_mut()
    }

    /// Bring the dashboard in line with the session's screen.
    async fn sync(&mut self) {
        let chef = match self.session.screen() {
            Screen::Dashboard => self.session.user().cloned(),
            Screen::Landing => None,
        };
        match chef {
            Some(chef) if self.dashboard.as_ref().is_some_and(|d| d.chef().id == chef.id) => {}
            Some(chef) => {
                self.dashboard = Some(Dashboard::open(self.backend.clone(), chef).await);
            }
            None => self.dashboard = None,
        }
    }

    pub async fn start(&mut self) {
        self.session.restore_session().await;
        self.sync().await;
    }

    pub async fn login(&mut self, email: &str, password: &str, prompt: &mut impl Prompt) -> bool {
        let ok = self.session.login(email, password, prompt).await;
        self.sync().await;
        ok
    }

    pub async fn signup(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        prompt: &mut impl Prompt,
    ) -> bool {
        let ok = self.session.signup(name, email, password, prompt).await;
        self.sync().await;
        ok
    }

    pub async fn demo_login(&mut self, demo: &DemoConfig, prompt: &mut impl Prompt) -> bool {
        let ok = self.session.demo_login(demo, prompt).await;
        self.sync().await;
        ok
    }

    pub async fn logout(&mut self) {
        self.session.logout().await;
        self.sync().await;
    }

    /// Apply what the dashboard's backend calls reported: the status indicator, and
    /// a fall back to landing if the session was refused. Returns true in that case.
    pub async fn settle(&mut self, prompt: &mut impl Prompt) -> bool {
        let Some(dashboard) = self.dashboard.as_mut() else {
            return false;
        };
        if let Some(connectivity) = dashboard.take_connectivity() {
            self.session.set_connectivity(connectivity);
        }
        if !dashboard.session_expired() {
            return false;
        }
        prompt.alert(Notice::SessionExpired);
        self.session.expire().await;
        self.sync().await;
        true
    }
}
