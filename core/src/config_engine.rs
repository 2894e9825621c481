/*
 * config_engine.rs
 * Copyright (C) 2026 Conduit Contributors
 *
 * This file is part of Conduit, an embeddable HTTP mediation engine.
 *
 * Conduit is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Conduit is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Conduit.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Engine-wide configuration: channel capacities, default handler, log filter.
//!
//! Load order mirrors the credentials-path resolution in the teacher crate's own `config.rs`:
//! an environment variable pointing at an explicit file, falling back to a platform default
//! directory, falling back to built-in defaults. A malformed file is logged and ignored rather
//! than treated as fatal — a config typo must never bring down the host process.

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use serde::Deserialize;

const ENV_CONFIG_PATH: &str = "CONDUIT_CONFIG";
const DEFAULT_COMMAND_CAPACITY: usize = 100;
const DEFAULT_BODY_CAPACITY: usize = 2;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
    #[serde(default = "default_body_capacity")]
    pub body_capacity: usize,
    #[serde(default)]
    pub default_handler_uri: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_command_capacity() -> usize {
    DEFAULT_COMMAND_CAPACITY
}

fn default_body_capacity() -> usize {
    DEFAULT_BODY_CAPACITY
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            body_capacity: DEFAULT_BODY_CAPACITY,
            default_handler_uri: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// `~/.conduit/config.json`, mirroring the teacher's `~/.tagliacarte` convention.
pub fn default_config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .map(|h| h.join(".conduit"))
}

fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|d| d.join("config.json"))
}

fn resolve_config_path() -> Option<PathBuf> {
    std::env::var_os(ENV_CONFIG_PATH)
        .map(PathBuf::from)
        .or_else(default_config_path)
}

fn load_from_disk() -> EngineConfig {
    let Some(path) = resolve_config_path() else {
        return EngineConfig::default();
    };
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "malformed engine config, using defaults");
                EngineConfig::default()
            }
        },
        Err(_) => EngineConfig::default(),
    }
}

/// Process-wide config, parsed once and cached. Infallible to read after startup.
pub fn config() -> &'static EngineConfig {
    static CONFIG: OnceLock<EngineConfig> = OnceLock::new();
    CONFIG.get_or_init(load_from_disk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.command_capacity, 100);
        assert_eq!(cfg.body_capacity, 2);
        assert_eq!(cfg.default_handler_uri, None);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"body_capacity": 8}"#).unwrap();
        assert_eq!(cfg.body_capacity, 8);
        assert_eq!(cfg.command_capacity, 100);
    }
}
