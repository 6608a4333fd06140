//! Browser extension manifest and script registrations.
//!
//! The manifest itself stays small: the background script registers the
//! content scripts at install time, each restricted to the site origins:
//! - `mediator`: relays window messages to the background
//! - `mainWorld`: page-world script with framework access
//! - `features`: the feature engine, in the isolated world

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtrasError, ExtrasResult};

/// Where a content script runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScriptWorld {
    #[default]
    Isolated,
    Main,
}

/// A content script registered at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredScript {
    pub id: String,
    pub js: Vec<String>,
    pub matches: Vec<String>,
    #[serde(default)]
    pub world: ScriptWorld,
}

/// Content scripts to register for `origins`.
pub fn registered_scripts(origins: &[String]) -> Vec<RegisteredScript> {
    let script = |id: &str, js: &str, world| RegisteredScript {
        id: id.to_string(),
        js: vec![js.to_string()],
        matches: origins.to_vec(),
        world,
    };
    vec![
        script("mediator", "mediator.js", ScriptWorld::Isolated),
        script("mainWorld", "content.js", ScriptWorld::Main),
        script("features", "features.js", ScriptWorld::Isolated),
    ]
}

/// Background service worker entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundEntry {
    pub service_worker: String,
}

/// `manifest.json`, manifest version 3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub manifest_version: u32,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub host_permissions: Vec<String>,
    pub background: BackgroundEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_page: Option<String>,
}

impl ExtensionManifest {
    /// The manifest for this crate's extension, granted `origins`.
    pub fn new(origins: &[String]) -> Self {
        Self {
            manifest_version: 3,
            name: "Twitter Extras".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Optional enhancements for twitter.com and x.com.".to_string(),
            permissions: vec![
                "storage".to_string(),
                "downloads".to_string(),
                "scripting".to_string(),
            ],
            host_permissions: origins.to_vec(),
            background: BackgroundEntry {
                service_worker: "background.js".to_string(),
            },
            options_page: Some("options.html".to_string()),
        }
    }

    /// Load `manifest.json` from an extension directory.
    pub fn load(extension_dir: &Path) -> ExtrasResult<Self> {
        let content = std::fs::read_to_string(extension_dir.join("manifest.json"))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn to_json(&self) -> ExtrasResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate required fields and origin patterns.
    pub fn validate(&self) -> ExtrasResult<()> {
        if self.manifest_version != 3 {
            return Err(ExtrasError::Manifest(format!(
                "manifest_version must be 3, got {}",
                self.manifest_version
            )));
        }

        if self.name.is_empty() {
            return Err(ExtrasError::Manifest("name is required".to_string()));
        }

        if self.version.is_empty() {
            return Err(ExtrasError::Manifest("version is required".to_string()));
        }

        if self.host_permissions.is_empty() {
            return Err(ExtrasError::Manifest(
                "at least one host permission is required".to_string(),
            ));
        }

        for pattern in &self.host_permissions {
            if !is_valid_origin_pattern(pattern) {
                return Err(ExtrasError::Manifest(format!(
                    "invalid origin pattern '{}'",
                    pattern
                )));
            }
        }

        Ok(())
    }

    /// Whether `url` falls under one of the host permissions.
    pub fn is_url_allowed(&self, url: &str) -> bool {
        self.host_permissions
            .iter()
            .any(|pattern| origin_matches(pattern, url))
    }
}

fn is_valid_origin_pattern(pattern: &str) -> bool {
    match pattern.split_once("://") {
        Some((scheme, rest)) => {
            matches!(scheme, "https" | "http" | "*") && rest.contains('/') && !rest.starts_with('/')
        }
        None => false,
    }
}

/// Match `url` against a `scheme://host/path*` pattern. A `*.` host prefix
/// also matches the bare domain; a trailing `*` matches any path.
pub fn origin_matches(pattern: &str, url: &str) -> bool {
    let (Some((p_scheme, p_rest)), Some((u_scheme, u_rest))) =
        (pattern.split_once("://"), url.split_once("://"))
    else {
        return false;
    };
    if p_scheme != "*" && p_scheme != u_scheme {
        return false;
    }

    let (p_host, p_path) = p_rest.split_at(p_rest.find('/').unwrap_or(p_rest.len()));
    let (u_host, u_path) = u_rest.split_at(u_rest.find('/').unwrap_or(u_rest.len()));

    let host_ok = if let Some(suffix) = p_host.strip_prefix("*.") {
        u_host == suffix || u_host.ends_with(&format!(".{suffix}"))
    } else {
        p_host == u_host
    };

    let u_path = if u_path.is_empty() { "/" } else { u_path };
    let path_ok = match p_path.strip_suffix('*') {
        Some(prefix) => u_path.starts_with(prefix),
        None => p_path == u_path,
    };

    host_ok && path_ok
}
