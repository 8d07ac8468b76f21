use anyhow::Context;
use serde::Deserialize;

/// Environment variable overriding `backend.url`.
pub const BACKEND_URL_VAR: &str = "FLAVORFIND_BACKEND_URL";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

impl Config {
    /// Load the configuration from a YAML file.
    pub fn load(yml_path: &str) -> anyhow::Result<Self> {
        let yml = std::fs::read_to_string(yml_path)?;
        let config = serde_yaml::from_str(&yml)?;
        Ok(config)
    }

    /// Load from `yml_path` if given (defaults otherwise), then apply the environment.
    pub fn from_env(yml_path: Option<&str>) -> anyhow::Result<Self> {
        let config = match yml_path {
            Some(path) => Self::load(path).with_context(|| format!("Loading config from {path}"))?,
            None => Self::default(),
        };
        Ok(config.with_backend_url(dotenvy::var(BACKEND_URL_VAR).ok()))
    }

    pub fn with_backend_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.backend.url = url;
        }
        self
    }

    /// The backend's generated admin panel.
    pub fn admin_panel_url(&self) -> String {
        format!("{}/admin", self.backend.url.trim_end_matches('/'))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BackendConfig {
    pub url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:1111".into(),
        }
    }
}

/// The shared demo chef account offered on the landing screen.
#[derive(Clone, Debug, Deserialize)]
pub struct DemoConfig {
    pub email: String,
    pub password: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            email: "chef@flavorfind.com".into(),
            password: "password".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("backend:\n  url: https://api.flavorfind.app/\n").unwrap();
        assert_eq!(config.backend.url, "https://api.flavorfind.app/");
        assert_eq!(config.admin_panel_url(), "https://api.flavorfind.app/admin");
        assert_eq!(config.demo.email, "chef@flavorfind.com");
    }

    #[test]
    fn override_wins() {
        let config = Config::default().with_backend_url(Some("http://10.0.0.2:1111".into()));
        assert_eq!(config.backend.url, "http://10.0.0.2:1111");
        let config = config.with_backend_url(None);
        assert_eq!(config.backend.url, "http://10.0.0.2:1111");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flavorfind.yml");
        std::fs::write(&path, "demo:\n  email: demo@example.com\n  password: pw\n").unwrap();
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.demo.email, "demo@example.com");
        assert_eq!(config.backend.url, "http://localhost:1111");
        assert!(Config::load("/definitely/not/here.yml").is_err());
    }
}
