use async_trait::async_trait;

use crate::config::LanguagePair;
use crate::error::Result;
use super::routes::InstalledRoutes;

/// Information about a translation engine
#[derive(Debug, Clone)]
pub struct EngineInfo {
    /// Human-readable name
    pub name: &'static str,
    /// Whether translation runs without network access
    pub offline: bool,
}

/// Trait for offline translation engines
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    fn info(&self) -> EngineInfo;

    fn name(&self) -> &'static str {
        self.info().name
    }

    /// List the language pairs currently installed in the engine
    async fn installed_routes(&self) -> Result<InstalledRoutes>;

    /// Translate a whole block of text along an installed pair
    async fn translate(&self, pair: &LanguagePair, text: &str) -> Result<String>;
}
