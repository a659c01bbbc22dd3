use std::collections::BTreeSet;

use crate::config::{Lang, LanguagePair};

/// Snapshot of the language pairs an engine has installed.
///
/// Immutable once built; refreshing means asking the engine for a new
/// snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledRoutes {
    pairs: BTreeSet<LanguagePair>,
}

impl InstalledRoutes {
    pub fn new(pairs: impl IntoIterator<Item = LanguagePair>) -> Self {
        Self {
            pairs: pairs.into_iter().collect(),
        }
    }

    pub fn contains(&self, source: &Lang, target: &Lang) -> bool {
        self.pairs.iter().any(|p| &p.source == source && &p.target == target)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &LanguagePair> {
        self.pairs.iter()
    }

    /// Every language appearing on either side of an installed pair.
    pub fn languages(&self) -> BTreeSet<&Lang> {
        self.pairs
            .iter()
            .flat_map(|p| [&p.source, &p.target])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<LanguagePair> for InstalledRoutes {
    fn from_iter<I: IntoIterator<Item = LanguagePair>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// A language pair proven to be installed.
///
/// Only [`super::Translator::resolve_route`] can build one, so translating
/// along an uninstalled pair is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pair: LanguagePair,
}

impl Route {
    pub(crate) const fn new(pair: LanguagePair) -> Self {
        Self { pair }
    }

    pub const fn pair(&self) -> &LanguagePair {
        &self.pair
    }
}

/// Parse an Argos package name such as `translate-en_es`.
pub fn parse_package_name(name: &str) -> Option<LanguagePair> {
    let codes = name.trim().strip_prefix("translate-")?;
    let (source, target) = codes.split_once('_')?;
    let valid = |code: &str| {
        !code.is_empty() && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };

    (valid(source) && valid(target)).then(|| LanguagePair::new(source, target))
}

/// Argos package name for a pair.
pub fn package_name(pair: &LanguagePair) -> String {
    format!("translate-{}_{}", pair.source, pair.target)
}
