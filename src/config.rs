use std::{env, fmt::Display, str::FromStr};

use bevy::prelude::*;

use crate::theme::Theme;

const DEFAULT_TITLE: &str = "Eve";
const DEFAULT_QUESTION: &str = "¿Nos vemos en Chef Burger?";
const DEFAULT_FAREWELL: &str = "Nos vemos en Chef Burger";

#[derive(Clone, Debug)]
pub struct Config {
    pub store: StoreConfig,
    pub page: PageConfig,
}

#[derive(Resource, Clone, Debug, Default)]
pub struct StoreConfig {
    /// `None` keeps interactions in memory for this run only.
    pub database_url: Option<String>,
    pub max_connections: u32,
}

/// Which parts of the page are switched on.
#[derive(Resource, Clone, Debug)]
pub struct PageConfig {
    pub has_audio: bool,
    pub has_reward_game: bool,
    pub theme: Theme,
    pub title: String,
    pub question: String,
    /// Small print under the thank-you message.
    pub farewell: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            has_audio: true,
            has_reward_game: true,
            theme: Theme::default(),
            title: DEFAULT_TITLE.to_string(),
            question: DEFAULT_QUESTION.to_string(),
            farewell: DEFAULT_FAREWELL.to_string(),
        }
    }
}

impl Config {
    /// Reads the process environment; call after `dotenvy::dotenv()`.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if database_url.is_none() {
            warn!("No DATABASE_URL found in environment, interactions stay in memory");
        }

        let config = Self {
            store: StoreConfig {
                database_url,
                max_connections: try_load(&lookup, "DB_MAX_CONNECTIONS", 5),
            },
            page: PageConfig {
                has_audio: try_load(&lookup, "PAGE_AUDIO", true),
                has_reward_game: try_load(&lookup, "PAGE_REWARDS", true),
                theme: try_load(&lookup, "PAGE_THEME", Theme::default()),
                title: lookup("PAGE_TITLE").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
                question: lookup("PAGE_QUESTION").unwrap_or_else(|| DEFAULT_QUESTION.to_string()),
                farewell: lookup("PAGE_FAREWELL").unwrap_or_else(|| DEFAULT_FAREWELL.to_string()),
            },
        };
        info!(
            "Page variant: audio={} rewards={} theme={:?}",
            config.page.has_audio, config.page.has_reward_game, config.page.theme
        );
        config
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        debug!("{key} not set, using default: {default:?}");
        return default;
    };
    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value '{raw}': {e}, using default: {default:?}");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_full_page_in_memory() {
        let config = config_from(&[]);
        assert!(config.store.database_url.is_none());
        assert_eq!(config.store.max_connections, 5);
        assert!(config.page.has_audio);
        assert!(config.page.has_reward_game);
        assert_eq!(config.page.theme, Theme::Stone);
        assert_eq!(config.page.title, "Eve");
        assert_eq!(config.page.farewell, "Nos vemos en Chef Burger");
    }

    #[test]
    fn reads_variant_switches() {
        let config = config_from(&[
            ("DATABASE_URL", "mysql://root@localhost/proposal"),
            ("PAGE_AUDIO", "false"),
            ("PAGE_THEME", "blossom"),
            ("PAGE_TITLE", "Ada"),
        ]);
        assert_eq!(
            config.store.database_url.as_deref(),
            Some("mysql://root@localhost/proposal")
        );
        assert!(!config.page.has_audio);
        assert!(config.page.has_reward_game);
        assert_eq!(config.page.theme, Theme::Blossom);
        assert_eq!(config.page.title, "Ada");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("DATABASE_URL", "  "),
            ("DB_MAX_CONNECTIONS", "lots"),
            ("PAGE_REWARDS", "maybe"),
            ("PAGE_THEME", "neon"),
        ]);
        assert!(config.store.database_url.is_none());
        assert_eq!(config.store.max_connections, 5);
        assert!(config.page.has_reward_game);
        assert_eq!(config.page.theme, Theme::Stone);
    }
}
