//! The single-source resolution contract

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use tether_types::TranslateResult;

/// Resolves one identifier to an optional target value.
///
/// Implementations report "not found" as `Ok(None)` and faults as `Err`. They
/// must not block the calling task.
#[async_trait]
pub trait Translator<I, O>: Send + Sync
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    async fn translate(&self, input: &I) -> TranslateResult<O>;

    /// Label used in logs and in aggregated errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Adapts an async closure into a [`Translator`].
pub struct FnTranslator<F, Fut> {
    name: String,
    f: F,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnTranslator<F, Fut> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _future: PhantomData,
        }
    }
}

#[async_trait]
impl<I, O, F, Fut> Translator<I, O> for FnTranslator<F, Fut>
where
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync,
    Fut: Future<Output = TranslateResult<O>> + Send + 'static,
{
    async fn translate(&self, input: &I) -> TranslateResult<O> {
        (self.f)(input.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
