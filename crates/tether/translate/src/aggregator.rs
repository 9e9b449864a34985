//! Multi-source fan-out
//!
//! One query goes to every translator at once; their outcomes are merged into a
//! single result once the last one has reported:
//!
//! 1. No translators at all means "not found", never an error.
//! 2. If any translator produced a value, that value wins. When several did,
//!    the first to *complete* wins. Completion order between concurrent sources
//!    is not deterministic, and callers must not rely on one source being
//!    preferred over another.
//! 3. Otherwise, if any translator failed, every failure is returned together
//!    as [`TranslateError::Aggregate`].
//! 4. Otherwise the result is absent.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tether_types::{TranslateError, TranslateResult};
use tracing::{debug, warn};

use crate::translator::Translator;

/// Run `input` through all `translators` concurrently and merge the outcomes.
pub async fn fan_out<I, O>(translators: &[Arc<dyn Translator<I, O>>], input: &I) -> TranslateResult<O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    if translators.is_empty() {
        return Ok(None);
    }

    let mut pending: FuturesUnordered<_> = translators
        .iter()
        .map(|translator| {
            let name = translator.name().to_string();
            AssertUnwindSafe(translator.translate(input))
                .catch_unwind()
                .map(move |outcome| match outcome {
                    Ok(result) => (name, result),
                    Err(_) => {
                        let error = TranslateError::Panicked {
                            source_name: name.clone(),
                        };
                        (name, Err(error))
                    }
                })
        })
        .collect();

    let mut aggregation = Aggregation::new(translators.len());
    while let Some((name, result)) = pending.next().await {
        aggregation.record(&name, result);
    }

    aggregation.finish()
}

/// Running tally of contributor outcomes.
struct Aggregation<O> {
    remaining: usize,
    found: Option<O>,
    errors: Vec<TranslateError>,
}

impl<O> Aggregation<O> {
    fn new(contributors: usize) -> Self {
        Self {
            remaining: contributors,
            found: None,
            errors: Vec::new(),
        }
    }

    fn record(&mut self, source: &str, result: TranslateResult<O>) {
        self.remaining = self.remaining.saturating_sub(1);
        match result {
            Ok(Some(value)) => {
                if self.found.is_none() {
                    debug!(source, "Translator produced a value");
                    self.found = Some(value);
                }
            }
            Ok(None) => {}
            Err(error) => {
                warn!(source, error = %error, "Translator failed");
                self.errors.push(error);
            }
        }
    }

    fn finish(self) -> TranslateResult<O> {
        debug_assert_eq!(self.remaining, 0);
        if let Some(value) = self.found {
            Ok(Some(value))
        } else if !self.errors.is_empty() {
            Err(TranslateError::Aggregate(self.errors))
        } else {
            Ok(None)
        }
    }
}
