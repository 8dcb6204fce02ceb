// SPDX-FileCopyrightText: 2026 crmbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for crmbridge.
//!
//! TOML files in the usual hierarchy plus `CRMBRIDGE_*` environment
//! overrides, strict key checking, and miette diagnostics with typo
//! suggestions.
//!
//! ```no_run
//! use crmbridge_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.server.host, config.server.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    ChatwootConfig, ContactPolicy, CrmBridgeConfig, FormbricksConfig, LoggingConfig, ServerConfig,
    StorageConfig,
};

/// Loads from the file hierarchy and validates.
pub fn load_and_validate() -> Result<CrmBridgeConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => validation::validate_config(&config).map(|()| config),
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &read_sources(&loader::config_paths()),
        )),
    }
}

/// Loads an explicit file (plus env overrides) and validates.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<CrmBridgeConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => validation::validate_config(&config).map(|()| config),
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &read_sources(&[path.to_path_buf()]),
        )),
    }
}

/// Loads an inline TOML string and validates.
pub fn load_and_validate_str(toml_content: &str) -> Result<CrmBridgeConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => validation::validate_config(&config).map(|()| config),
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn read_sources(paths: &[std::path::PathBuf]) -> Vec<(String, String)> {
    paths
        .iter()
        .filter_map(|p| {
            let content = std::fs::read_to_string(p).ok()?;
            let name = std::fs::canonicalize(p)
                .unwrap_or_else(|_| p.clone())
                .display()
                .to_string();
            Some((name, content))
        })
        .collect()
}
