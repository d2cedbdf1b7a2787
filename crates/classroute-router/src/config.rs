// File: src/config.rs
// Purpose: Router configuration parsing from classroute.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Selector of the single container the router owns (default: "#app")
    #[serde(default = "default_mount_selector")]
    pub mount_selector: String,

    /// Root folder of convention-based page modules (default: "app")
    #[serde(default = "default_app_dir")]
    pub app_dir: String,

    /// Extension appended to every derived module path (default: "js")
    #[serde(default = "default_module_extension")]
    pub module_extension: String,

    /// Global fallback layout; derived from `app_dir` when absent
    #[serde(default)]
    pub default_layout: Option<String>,

    /// Where unauthenticated users are sent
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Where time-restricted pages redirect outside their window
    #[serde(default = "default_maintenance_path")]
    pub maintenance_path: String,

    /// Fallback redirect for role checks and failing custom middleware
    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,

    /// Whether unregistered paths are looked up by convention
    #[serde(default = "default_true")]
    pub auto_discovery: bool,

    /// Middleware redirects followed per navigation before giving up
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

// Default values
fn default_mount_selector() -> String {
    "#app".to_string()
}

fn default_app_dir() -> String {
    "app".to_string()
}

fn default_module_extension() -> String {
    "js".to_string()
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_maintenance_path() -> String {
    "/maintenance".to_string()
}

fn default_dashboard_path() -> String {
    "/dashboard".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_redirects() -> usize {
    5
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mount_selector: default_mount_selector(),
            app_dir: default_app_dir(),
            module_extension: default_module_extension(),
            default_layout: None,
            login_path: default_login_path(),
            maintenance_path: default_maintenance_path(),
            dashboard_path: default_dashboard_path(),
            auto_discovery: default_true(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl RouterConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            // Return default config if file doesn't exist
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid router configuration")
    }

    /// Logical path of a module below `app_dir`, e.g. `module_path("contact/page")`
    pub fn module_path(&self, relative: &str) -> String {
        let relative = relative.trim_matches('/');
        if relative.is_empty() {
            format!("{}.{}", self.app_dir, self.module_extension)
        } else {
            format!("{}/{}.{}", self.app_dir, relative, self.module_extension)
        }
    }

    /// Logical path of the global fallback layout
    pub fn default_layout_path(&self) -> String {
        self.default_layout
            .clone()
            .unwrap_or_else(|| self.module_path("layout"))
    }

    /// Logical path of the layout for one route group
    pub fn group_layout_path(&self, group: &str) -> String {
        self.module_path(&format!("{}/layout", group))
    }
}
