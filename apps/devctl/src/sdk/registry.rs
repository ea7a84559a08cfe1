//! SDK plugins.
//!
//! A plugin knows how to name and locate a vendor archive for a version and
//! which environment a shell needs once that version is current. `go` and
//! `scala` are built in; `config.yaml` can declare more (see
//! [`crate::config::PluginConfig`]). Config plugins may shadow built-ins.

use std::collections::BTreeMap;

use crate::config::{Config, PluginConfig};
use crate::errors::{DevctlError, Result};
use crate::sdk::paths::validate_sdk;
use crate::sdk::platform::Platform;

/// Behaviour specific to one SDK.
pub trait SdkPlugin: Send + Sync {
    /// The SDK name used on the command line and on disk.
    fn name(&self) -> &str;

    /// One-line description for `devctl sdks`.
    fn description(&self) -> &str;

    /// Download URL of the archive for `version` on `platform`.
    fn download_url(&self, version: &str, platform: Platform) -> String;

    /// File name the archive is cached under: the last path segment of the
    /// download URL, ignoring any query or fragment.
    fn archive_file_name(&self, version: &str, platform: Platform) -> String {
        let url = self.download_url(version, platform);
        reqwest::Url::parse(&url)
            .ok()
            .and_then(|url| {
                url.path_segments()?
                    .next_back()
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("{}-{version}.{}", self.name(), platform.archive_extension()))
    }

    /// Environment variables to export, as paths relative to the current link.
    /// An empty relative path means the link itself.
    fn env(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Directories relative to the current link to prepend to `PATH`.
    fn bin_dirs(&self) -> Vec<String> {
        vec!["bin".to_string()]
    }
}

/// The Go toolchain from `dl.google.com`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoPlugin;

impl SdkPlugin for GoPlugin {
    fn name(&self) -> &str {
        "go"
    }

    fn description(&self) -> &str {
        "Go toolchain (dl.google.com)"
    }

    fn download_url(&self, version: &str, platform: Platform) -> String {
        format!(
            "https://dl.google.com/go/go{version}.{}-{}.{}",
            platform.os_str(),
            platform.arch_str(),
            platform.archive_extension()
        )
    }

    fn env(&self) -> Vec<(String, String)> {
        vec![("GOROOT".to_string(), String::new())]
    }
}

/// Scala 3 distributions from GitHub releases.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalaPlugin;

impl SdkPlugin for ScalaPlugin {
    fn name(&self) -> &str {
        "scala"
    }

    fn description(&self) -> &str {
        "Scala 3 distribution (github.com/scala/scala3)"
    }

    fn download_url(&self, version: &str, platform: Platform) -> String {
        format!(
            "https://github.com/scala/scala3/releases/download/{version}/scala3-{version}.{}",
            platform.archive_extension()
        )
    }

    fn env(&self) -> Vec<(String, String)> {
        vec![("SCALA_HOME".to_string(), String::new())]
    }
}

/// A plugin declared in `config.yaml`.
#[derive(Debug, Clone)]
pub struct TemplatePlugin {
    name: String,
    config: PluginConfig,
}

impl TemplatePlugin {
    /// Creates a plugin named `name` from its config entry.
    ///
    /// # Errors
    ///
    /// Returns [`DevctlError::InvalidIdentifier`] if `name` is not a safe
    /// sdk name.
    pub fn new(name: &str, config: PluginConfig) -> Result<Self> {
        validate_sdk(name)?;
        Ok(Self {
            name: name.to_string(),
            config,
        })
    }
}

impl SdkPlugin for TemplatePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.config
            .description
            .as_deref()
            .unwrap_or("configured in config.yaml")
    }

    fn download_url(&self, version: &str, platform: Platform) -> String {
        render_template(&self.config.url, version, platform)
    }

    fn env(&self) -> Vec<(String, String)> {
        self.config
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn bin_dirs(&self) -> Vec<String> {
        self.config.bin.clone()
    }
}

/// Expands `{version}`, `{os}`, `{arch}` and `{ext}` in a URL template.
#[must_use]
pub fn render_template(template: &str, version: &str, platform: Platform) -> String {
    template
        .replace("{version}", version)
        .replace("{os}", platform.os_str())
        .replace("{arch}", platform.arch_str())
        .replace("{ext}", platform.archive_extension())
}

/// Name-indexed set of plugins.
pub struct Registry {
    plugins: BTreeMap<String, Box<dyn SdkPlugin>>,
}

impl Registry {
    /// A registry holding only the built-in plugins.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self {
            plugins: BTreeMap::new(),
        };
        registry.register(Box::new(GoPlugin));
        registry.register(Box::new(ScalaPlugin));
        registry
    }

    /// Built-ins plus every plugin declared in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured plugin has an unsafe name.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::builtin();
        for (name, plugin) in &config.plugins {
            registry.register(Box::new(TemplatePlugin::new(name, plugin.clone())?));
        }
        Ok(registry)
    }

    /// Adds `plugin`, replacing any plugin with the same name.
    pub fn register(&mut self, plugin: Box<dyn SdkPlugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    /// Looks up a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`DevctlError::UnknownSdk`] if no plugin has that name.
    pub fn get(&self, sdk: &str) -> Result<&dyn SdkPlugin> {
        self.plugins
            .get(sdk)
            .map(Box::as_ref)
            .ok_or_else(|| DevctlError::unknown_sdk(sdk))
    }

    /// Iterates plugins in name order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn SdkPlugin> {
        self.plugins.values().map(Box::as_ref)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.plugins.keys()).finish()
    }
}
