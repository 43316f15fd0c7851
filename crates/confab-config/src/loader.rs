// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-based layered loading.
//!
//! Merge order, later wins:
//! 1. compiled defaults
//! 2. `/etc/confab/confab.toml`
//! 3. `$XDG_CONFIG_HOME/confab/confab.toml`
//! 4. `./confab.toml`
//! 5. `CONFAB_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ConfabConfig;

/// Sections an environment variable may target.
const ENV_SECTIONS: &[&str] = &["agent", "provider", "memory", "stream", "gateway"];

/// Config file locations in merge order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/confab/confab.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("confab/confab.toml"));
    }
    paths.push(PathBuf::from("confab.toml"));
    paths
}

/// Build the full figment without extracting it.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(ConfabConfig::default()));
    for path in config_paths() {
        if path.exists() {
            tracing::debug!(path = %path.display(), "merging config file");
        }
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Load configuration from the standard hierarchy with env overrides.
pub fn load_config() -> Result<ConfabConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML document. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<ConfabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConfabConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file, then apply env overrides.
pub fn load_config_from_path(path: &Path) -> Result<ConfabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConfabConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Maps `CONFAB_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `CONFAB_GATEWAY_BEARER_TOKEN` lands on `gateway.bearer_token`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("CONFAB_").map(|key| {
        let key = key.as_str();
        ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|field| format!("{section}.{field}"))
            })
            .unwrap_or_else(|| key.to_string())
            .into()
    })
}
