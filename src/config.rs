use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4-turbo-preview".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_path: PathBuf,
    pub upstream: UpstreamConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 9000,
            database_path: default_database_path(),
            upstream: UpstreamConfig::default(),
        }
    }
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("faqrelay")
        .join("faqrelay.db")
}

impl AppConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Empty and unparsable values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get("FAQRELAY_PORT").and_then(|v| v.parse::<u16>().ok()) {
            config.server_port = port;
        }
        if let Some(path) = get("FAQRELAY_DATABASE") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(model) = get("FAQRELAY_MODEL") {
            config.upstream.model = model;
        }
        if let Some(base_url) = get("OPENAI_API_BASE_URL") {
            config.upstream.base_url = base_url;
        }
        config.upstream.api_key = get("OPENAI_API_KEY");

        config
    }

    /// Apply overrides stored in the `app_config` table.
    pub async fn overlay_from_db(mut self, pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM app_config")
                .fetch_all(pool)
                .await?;

        for (key, value) in &rows {
            match key.as_str() {
                "server_port" => {
                    if let Ok(port) = value.parse::<u16>() {
                        self.server_port = port;
                    }
                }
                "model" => {
                    if !value.trim().is_empty() {
                        self.upstream.model = value.clone();
                    }
                }
                other => log::debug!("Ignoring unknown app_config key: {}", other),
            }
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.upstream.base_url, "https://api.openai.com/v1");
        assert_eq!(config.upstream.model, "gpt-4-turbo-preview");
        assert!(config.upstream.api_key.is_none());
        assert!(config.database_path.ends_with("faqrelay.db"));
    }

    #[test]
    fn environment_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FAQRELAY_PORT", "8088"),
            ("FAQRELAY_DATABASE", "/tmp/faq.db"),
            ("FAQRELAY_MODEL", "gpt-4o"),
            ("OPENAI_API_BASE_URL", "http://localhost:1234/v1"),
            ("OPENAI_API_KEY", "sk-test"),
        ]));
        assert_eq!(config.server_port, 8088);
        assert_eq!(config.database_path, PathBuf::from("/tmp/faq.db"));
        assert_eq!(config.upstream.model, "gpt-4o");
        assert_eq!(config.upstream.base_url, "http://localhost:1234/v1");
        assert_eq!(config.upstream.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn bad_port_and_blank_key_are_ignored() {
        let config = AppConfig::from_lookup(lookup(&[
            ("FAQRELAY_PORT", "not-a-port"),
            ("OPENAI_API_KEY", "   "),
        ]));
        assert_eq!(config.server_port, 9000);
        assert!(config.upstream.api_key.is_none());
    }

    #[tokio::test]
    async fn database_overrides_apply() {
        let pool = crate::db::init_memory_pool().await.unwrap();
        sqlx::query("INSERT INTO app_config (key, value) VALUES ('server_port', '7000'), ('model', 'gpt-4o-mini'), ('theme', 'dark')")
            .execute(&pool)
            .await
            .unwrap();

        let config = AppConfig::from_lookup(|_| None)
            .overlay_from_db(&pool)
            .await
            .unwrap();
        assert_eq!(config.server_port, 7000);
        assert_eq!(config.upstream.model, "gpt-4o-mini");
    }
}
