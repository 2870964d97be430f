use color_eyre::eyre::{eyre, Result};
use reqwest::Url;
use std::path::PathBuf;

/// Runtime configuration, read from the environment (and `.env` if present).
///
/// | Env var                  | Default             |
/// |--------------------------|---------------------|
/// | `MOOD_DIARY_STORE`       | `mood_entries.json` |
/// | `MOOD_DIARY_WEBHOOK_URL` | unset, sync off     |
/// | `MOOD_DIARY_LOG`         | `mood_diary.log`    |
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_path: PathBuf,
    pub webhook_url: Option<Url>,
    pub log_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store_path = lookup("MOOD_DIARY_STORE")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "mood_entries.json".into());

        let webhook_url = match lookup("MOOD_DIARY_WEBHOOK_URL").filter(|s| !s.trim().is_empty()) {
            Some(raw) => {
                let url = Url::parse(raw.trim())
                    .map_err(|e| eyre!("MOOD_DIARY_WEBHOOK_URL is not a valid URL: {}", e))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(eyre!("MOOD_DIARY_WEBHOOK_URL must be http or https"));
                }
                Some(url)
            }
            None => None,
        };

        let log_path = lookup("MOOD_DIARY_LOG")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "mood_diary.log".into());

        Ok(AppConfig {
            store_path: store_path.into(),
            webhook_url,
            log_path: log_path.into(),
        })
    }
}
