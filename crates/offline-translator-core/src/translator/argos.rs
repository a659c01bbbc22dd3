use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::{LanguagePair, TranslatorConfig};
use crate::error::{Error, Result};
use super::routes::{InstalledRoutes, package_name, parse_package_name};
use super::traits::{EngineInfo, TranslationEngine};

/// Argos Translate, driven through its command line tools.
///
/// `argos-translate` translates text piped on stdin; `argospm` lists and
/// installs language packages named `translate-<from>_<to>`.
#[derive(Debug, Clone)]
pub struct ArgosEngine {
    pub translate_command: String,
    pub package_command: String,
}

impl ArgosEngine {
    pub fn new(translate_command: impl Into<String>, package_command: impl Into<String>) -> Self {
        Self {
            translate_command: translate_command.into(),
            package_command: package_command.into(),
        }
    }

    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self::new(config.translate_command.clone(), config.package_command.clone())
    }

    /// Refresh the remote package index.
    pub async fn update_index(&self) -> Result<()> {
        self.run_package_command(&["update"]).await.map(|_| ())
    }

    /// Download and install one language pair.
    ///
    /// Management operation, never called by the translation pipeline.
    pub async fn install(&self, pair: &LanguagePair) -> Result<()> {
        let package = package_name(pair);
        info!("Installing {}", package);
        self.run_package_command(&["install", &package]).await.map(|_| ())
    }

    async fn run_package_command(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.package_command)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                Error::RouteDiscovery(format!("failed to launch {}: {e}", self.package_command))
            })?;

        if !output.status.success() {
            return Err(Error::RouteDiscovery(format!(
                "{} {} exited with {}: {}",
                self.package_command,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for ArgosEngine {
    fn default() -> Self {
        Self::from_config(&TranslatorConfig::default())
    }
}

#[async_trait]
impl TranslationEngine for ArgosEngine {
    fn info(&self) -> EngineInfo {
        EngineInfo {
            name: "argos",
            offline: true,
        }
    }

    async fn installed_routes(&self) -> Result<InstalledRoutes> {
        let listing = self.run_package_command(&["list"]).await?;
        let routes: InstalledRoutes = listing.lines().filter_map(parse_package_name).collect();
        debug!("{} reports {} installed routes", self.package_command, routes.len());
        Ok(routes)
    }

    async fn translate(&self, pair: &LanguagePair, text: &str) -> Result<String> {
        let failure = |what: &str, e: std::io::Error| {
            Error::TranslationFailure(format!("{what} {}: {e}", self.translate_command))
        };

        let mut child = Command::new(&self.translate_command)
            .args(["--from-lang", pair.source.as_str(), "--to-lang", pair.target.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failure("failed to launch", e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| failure("failed to send text to", e))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| failure("failed waiting for", e))?;

        if !output.status.success() {
            return Err(Error::TranslationFailure(format!(
                "{} exited with {}: {}",
                self.translate_command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let translated = String::from_utf8_lossy(&output.stdout);
        Ok(translated.trim_end_matches(['\r', '\n']).to_string())
    }
}
