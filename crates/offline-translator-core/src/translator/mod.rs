mod argos;
mod routes;
mod traits;

pub use argos::ArgosEngine;
pub use routes::{InstalledRoutes, Route, package_name, parse_package_name};
pub use traits::{EngineInfo, TranslationEngine};

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{Lang, LanguagePair, TranslatorConfig};
use crate::error::{Error, Result};
use crate::util::has_visible_text;

/// Translates text along installed language routes.
///
/// Holds an explicit snapshot of the installed routes taken at construction;
/// [`Translator::refresh_routes`] is the only way it changes.
#[derive(Clone)]
pub struct Translator {
    engine: Arc<dyn TranslationEngine>,
    installed: InstalledRoutes,
}

impl Translator {
    pub fn new(engine: Arc<dyn TranslationEngine>, installed: InstalledRoutes) -> Self {
        Self { engine, installed }
    }

    /// Build a translator by asking the engine what is installed.
    pub async fn discover(engine: Arc<dyn TranslationEngine>) -> Result<Self> {
        let installed = engine.installed_routes().await?;
        info!(
            "{} engine has {} installed routes",
            engine.name(),
            installed.len()
        );
        Ok(Self::new(engine, installed))
    }

    pub fn installed(&self) -> &InstalledRoutes {
        &self.installed
    }

    pub fn engine_info(&self) -> EngineInfo {
        self.engine.info()
    }

    /// Re-query the engine, e.g. after installing a pair.
    pub async fn refresh_routes(&mut self) -> Result<()> {
        self.installed = self.engine.installed_routes().await?;
        debug!("Refreshed routes: {} installed", self.installed.len());
        Ok(())
    }

    pub fn resolve_route(&self, source: &Lang, target: &Lang) -> Result<Route> {
        if self.installed.contains(source, target) {
            Ok(Route::new(LanguagePair::new(source.clone(), target.clone())))
        } else {
            Err(Error::NotInstalled {
                source_lang: source.clone(),
                target_lang: target.clone(),
            })
        }
    }

    /// Translate the full text in one engine call; no retries.
    pub async fn translate(&self, route: &Route, text: &str) -> Result<String> {
        info!(
            "Translating {} chars ({}) with {}",
            text.len(),
            route.pair(),
            self.engine.name()
        );
        self.engine.translate(route.pair(), text).await.map_err(|e| match e {
            Error::TranslationFailure(_) => e,
            other => Error::TranslationFailure(other.to_string()),
        })
    }

    /// Resolve and translate a free-standing block of text.
    pub async fn translate_text(&self, source: &Lang, target: &Lang, text: &str) -> Result<String> {
        if !has_visible_text(text) {
            return Err(Error::EmptyInput);
        }
        let route = self.resolve_route(source, target)?;
        self.translate(&route, text).await
    }
}

/// Create the Argos-backed translator from configuration, discovering
/// installed routes.
pub async fn create_translator(config: &TranslatorConfig) -> Result<Translator> {
    Translator::discover(Arc::new(ArgosEngine::from_config(config))).await
}
