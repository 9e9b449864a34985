//! Extensible lookups
//!
//! A [`Lookup`] resolves identifiers of one domain through every registered
//! [`Translator`] plus an optional built-in one representing the platform's
//! native resolution path. Registration is copy-on-write: a resolve works on
//! the snapshot taken when it started, so registering a translator never
//! disturbs a lookup already in flight.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tether_types::TranslateResult;
use tracing::debug;

use crate::aggregator::fan_out;
use crate::translator::Translator;

/// A copy-on-write set of translators.
///
/// Duplicates collapse by identity (the same `Arc`); order carries no meaning.
pub struct TranslatorRegistry<I, O> {
    translators: RwLock<Arc<Vec<Arc<dyn Translator<I, O>>>>>,
}

impl<I, O> TranslatorRegistry<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            translators: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Add a translator. Returns `false` if it was already registered.
    pub fn register(&self, translator: Arc<dyn Translator<I, O>>) -> bool {
        let mut current = self.translators.write();
        if current.iter().any(|t| Arc::ptr_eq(t, &translator)) {
            return false;
        }

        let mut next = Vec::with_capacity(current.len() + 1);
        next.extend(current.iter().cloned());
        next.push(translator);
        *current = Arc::new(next);
        true
    }

    /// Remove a translator. Returns `false` if it was not registered.
    pub fn deregister(&self, translator: &Arc<dyn Translator<I, O>>) -> bool {
        let mut current = self.translators.write();
        if !current.iter().any(|t| Arc::ptr_eq(t, translator)) {
            return false;
        }

        let next: Vec<_> = current
            .iter()
            .filter(|t| !Arc::ptr_eq(t, translator))
            .cloned()
            .collect();
        *current = Arc::new(next);
        true
    }

    /// The current set, unaffected by later registrations.
    pub fn snapshot(&self) -> Arc<Vec<Arc<dyn Translator<I, O>>>> {
        self.translators.read().clone()
    }

    pub fn len(&self) -> usize {
        self.translators.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<I, O> Default for TranslatorRegistry<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of translators for one identifier domain plus a fixed built-in.
pub struct Lookup<I, O> {
    name: String,
    builtin: Option<Arc<dyn Translator<I, O>>>,
    registry: TranslatorRegistry<I, O>,
}

impl<I, O> Lookup<I, O>
where
    I: std::fmt::Display + Send + Sync + 'static,
    O: Send + 'static,
{
    /// A lookup with no built-in path; only registered translators answer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            builtin: None,
            registry: TranslatorRegistry::new(),
        }
    }

    /// A lookup that always consults `builtin` alongside registered translators.
    pub fn with_builtin(name: impl Into<String>, builtin: Arc<dyn Translator<I, O>>) -> Self {
        Self {
            name: name.into(),
            builtin: Some(builtin),
            registry: TranslatorRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register(&self, translator: Arc<dyn Translator<I, O>>) -> bool {
        let added = self.registry.register(translator);
        if added {
            debug!(lookup = %self.name, translators = self.registry.len(), "Translator registered");
        }
        added
    }

    pub fn deregister(&self, translator: &Arc<dyn Translator<I, O>>) -> bool {
        self.registry.deregister(translator)
    }

    /// Registered translators, not counting the built-in.
    pub fn registry(&self) -> &TranslatorRegistry<I, O> {
        &self.registry
    }

    /// Resolve `id` through the registry snapshot and the built-in.
    pub async fn resolve(&self, id: &I) -> TranslateResult<O> {
        let snapshot = self.registry.snapshot();
        let mut sources: Vec<Arc<dyn Translator<I, O>>> =
            Vec::with_capacity(snapshot.len() + usize::from(self.builtin.is_some()));
        sources.extend(snapshot.iter().cloned());
        if let Some(builtin) = &self.builtin {
            sources.push(builtin.clone());
        }

        debug!(lookup = %self.name, id = %id, sources = sources.len(), "Resolving");
        fan_out(&sources, id).await
    }
}

#[async_trait]
impl<I, O> Translator<I, O> for Lookup<I, O>
where
    I: std::fmt::Display + Send + Sync + 'static,
    O: Send + 'static,
{
    async fn translate(&self, input: &I) -> TranslateResult<O> {
        self.resolve(input).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
