//! Shared bot state and per-guild configuration

use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};

use crate::waiter::EventWaiter;

/// How long menus wait for input when a guild has not configured it.
pub const DEFAULT_MENU_TIMEOUT_SECS: u64 = 60;

/// Per-guild configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildConfig {
    // The ID of the guild
    pub guild_id: u64,
    // Seconds an interactive menu waits for input before closing
    pub menu_timeout_secs: u64,
    // Whether paging menus wrap from the last page back to the first
    pub wrap_page_ends: bool,
    // RFC3339 timestamp of the last change
    pub last_updated: String,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            guild_id: 0,
            menu_timeout_secs: DEFAULT_MENU_TIMEOUT_SECS,
            wrap_page_ends: false,
            last_updated: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

impl Default for Data {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("waiter", &self.waiter)
            .field("guild_configs", &self.guild_configs)
            .finish()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    /// Create a new Data instance with an empty waiter registry
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(DataInner::new()))
    }

    /// Load guild configuration from the YAML file
    pub async fn load() -> Self {
        Self(Arc::new(DataInner::load().await))
    }

    /// Save guild configuration to the YAML file
    ///
    /// # Errors
    /// This function will return an error if:
    /// - The data directory cannot be created
    /// - The guild configurations cannot be serialized to YAML
    /// - The YAML data cannot be written to the config file
    pub async fn save(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.0.save().await
    }

    /// Get the guild configuration for a specific guild
    #[must_use]
    pub fn get_guild_config(&self, guild_id: serenity::GuildId) -> Option<GuildConfig> {
        self.0
            .guild_configs
            .get(&guild_id)
            .map(|entry| entry.value().clone())
    }

    /// How long menus in this guild wait for input. Falls back to the
    /// default outside guilds or when unconfigured.
    #[must_use]
    pub fn menu_timeout(&self, guild_id: Option<serenity::GuildId>) -> Duration {
        let secs = guild_id
            .and_then(|id| self.get_guild_config(id))
            .map_or(DEFAULT_MENU_TIMEOUT_SECS, |config| config.menu_timeout_secs);
        Duration::from_secs(secs)
    }

    /// Whether paging menus in this guild wrap at the ends.
    #[must_use]
    pub fn wrap_page_ends(&self, guild_id: Option<serenity::GuildId>) -> bool {
        guild_id
            .and_then(|id| self.get_guild_config(id))
            .is_some_and(|config| config.wrap_page_ends)
    }

    /// Set the menu timeout for a guild, creating its config if needed
    pub fn set_menu_timeout(&self, guild_id: serenity::GuildId, secs: u64) {
        let mut config = self.get_guild_config(guild_id).unwrap_or_else(|| GuildConfig {
            guild_id: guild_id.get(),
            ..Default::default()
        });
        config.menu_timeout_secs = secs;
        config.last_updated = chrono::Utc::now().to_rfc3339();
        self.0.guild_configs.insert(guild_id, config);
    }

    /// Set page wrapping for a guild, creating its config if needed
    pub fn set_wrap_page_ends(&self, guild_id: serenity::GuildId, wrap: bool) {
        let mut config = self.get_guild_config(guild_id).unwrap_or_else(|| GuildConfig {
            guild_id: guild_id.get(),
            ..Default::default()
        });
        config.wrap_page_ends = wrap;
        config.last_updated = chrono::Utc::now().to_rfc3339();
        self.0.guild_configs.insert(guild_id, config);
    }
}

/// Main centralized data structure for the bot
pub struct DataInner {
    // The process-wide waiter registry fed by the gateway handler
    pub waiter: EventWaiter,
    // Map of guild_id -> guild configuration
    pub guild_configs: DashMap<serenity::GuildId, GuildConfig>,
}

impl Default for DataInner {
    fn default() -> Self {
        Self::new()
    }
}

impl DataInner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            waiter: EventWaiter::new(),
            guild_configs: DashMap::new(),
        }
    }

    /// Load guild configurations from a YAML file.
    /// If the file doesn't exist, returns a new empty instance.
    pub async fn load() -> Self {
        const CONFIG_FILE: &str = "data/guild_config.yaml";

        let data = Self::new();
        if let Ok(file_content) = tokio::fs::read_to_string(CONFIG_FILE).await {
            if let Ok(configs) = serde_yaml::from_str::<Vec<GuildConfig>>(&file_content) {
                for config in configs {
                    let guild_id = serenity::GuildId::new(config.guild_id);
                    data.guild_configs.insert(guild_id, config);
                }
            }
        }
        data
    }

    /// Save all guild configurations to a YAML file, creating the data
    /// directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The data directory cannot be created
    /// - The guild configurations cannot be serialized to YAML
    /// - The YAML data cannot be written to the config file
    pub async fn save(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        const DATA_DIR: &str = "data";
        const CONFIG_FILE: &str = "data/guild_config.yaml";

        if !std::path::Path::new(DATA_DIR).exists() {
            tokio::fs::create_dir_all(DATA_DIR).await?;
        }

        let configs: Vec<GuildConfig> = self
            .guild_configs
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let yaml = serde_yaml::to_string(&configs)?;
        tokio::fs::write(CONFIG_FILE, yaml).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_new() {
        let data = Data::new();
        assert_eq!(data.guild_configs.len(), 0);
        assert_eq!(data.waiter.pending(), 0);
    }

    #[test]
    fn test_guild_config_default() {
        let config = GuildConfig::default();
        assert_eq!(config.guild_id, 0);
        assert_eq!(config.menu_timeout_secs, DEFAULT_MENU_TIMEOUT_SECS);
        assert!(!config.wrap_page_ends);
    }

    #[test]
    fn test_menu_timeout_lookup() {
        let data = Data::new();
        let guild_id = serenity::GuildId::new(12345);

        // Unconfigured guilds and DMs use the default.
        assert_eq!(data.menu_timeout(Some(guild_id)), Duration::from_secs(60));
        assert_eq!(data.menu_timeout(None), Duration::from_secs(60));

        data.set_menu_timeout(guild_id, 120);
        assert_eq!(data.menu_timeout(Some(guild_id)), Duration::from_secs(120));
        assert_eq!(
            data.get_guild_config(guild_id).map(|c| c.guild_id),
            Some(12345)
        );
    }

    #[test]
    fn test_wrap_page_ends_lookup() {
        let data = Data::new();
        let guild_id = serenity::GuildId::new(12345);

        assert!(!data.wrap_page_ends(Some(guild_id)));
        data.set_wrap_page_ends(guild_id, true);
        assert!(data.wrap_page_ends(Some(guild_id)));
        // Setting one field leaves the other at its default.
        assert_eq!(data.menu_timeout(Some(guild_id)), Duration::from_secs(60));
    }

    #[test]
    fn test_guild_config_serialization() {
        let config = GuildConfig {
            guild_id: 12345,
            menu_timeout_secs: 90,
            wrap_page_ends: true,
            ..Default::default()
        };

        let serialized = serde_yaml::to_string(&config).expect("Failed to serialize");
        assert!(serialized.contains("guild_id: 12345"));
        assert!(serialized.contains("menu_timeout_secs: 90"));
        assert!(serialized.contains("wrap_page_ends: true"));

        let deserialized: GuildConfig =
            serde_yaml::from_str(&serialized).expect("Failed to deserialize");
        assert_eq!(deserialized.guild_id, 12345);
        assert_eq!(deserialized.menu_timeout_secs, 90);
        assert!(deserialized.wrap_page_ends);
    }
}
