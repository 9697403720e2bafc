use std::marker::PhantomData;

use log::debug;

use super::item::{ItemProcessor, ItemProcessorResult, Processed};
use crate::error::BatchError;

/// Outcome of validating one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected { reason: String },
}

impl ValidationOutcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        ValidationOutcome::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }
}

/// Checks a single item.
///
/// Validators are pure and total: they answer for every well-typed item and
/// never fail. Type errors belong to the reader.
pub trait Validator<T> {
    fn validate(&self, item: &T) -> ValidationOutcome;
}

impl<T, F> Validator<T> for F
where
    F: Fn(&T) -> ValidationOutcome,
{
    fn validate(&self, item: &T) -> ValidationOutcome {
        self(item)
    }
}

/// Runs a [`Validator`] and hands accepted items to a transform function.
///
/// A rejected item becomes [`Processed::Rejected`] and never reaches the
/// transform. The transform is a plain function of the item, so the processor
/// can safely be invoked again on the same item.
///
/// # Examples
///
/// ```
/// use chunk_batch::core::item::{ItemProcessor, Processed};
/// use chunk_batch::core::validator::{ValidatingItemProcessor, ValidationOutcome};
///
/// let validator = |name: &String| {
///     if name.chars().count() >= 2 {
///         ValidationOutcome::Accepted
///     } else {
///         ValidationOutcome::rejected("name is too short")
///     }
/// };
/// let processor = ValidatingItemProcessor::new(validator, |name: &String| Ok(name.to_uppercase()));
///
/// assert_eq!(processor.process(&"ada".to_string()), Ok(Processed::Item("ADA".to_string())));
/// assert!(matches!(processor.process(&"a".to_string()), Ok(Processed::Rejected { .. })));
/// ```
pub struct ValidatingItemProcessor<V, F, I, O> {
    validator: V,
    transform: F,
    _marker: PhantomData<fn(&I) -> O>,
}

impl<V, F, I, O> ValidatingItemProcessor<V, F, I, O>
where
    V: Validator<I>,
    F: Fn(&I) -> Result<O, BatchError>,
{
    pub fn new(validator: V, transform: F) -> Self {
        Self {
            validator,
            transform,
            _marker: PhantomData,
        }
    }
}

impl<V, F, I, O> ItemProcessor<I, O> for ValidatingItemProcessor<V, F, I, O>
where
    V: Validator<I>,
    F: Fn(&I) -> Result<O, BatchError>,
{
    fn process(&self, item: &I) -> ItemProcessorResult<O> {
        match self.validator.validate(item) {
            ValidationOutcome::Accepted => (self.transform)(item).map(Processed::Item),
            ValidationOutcome::Rejected { reason } => {
                debug!("Item rejected by validator: {}", reason);
                Ok(Processed::Rejected { reason })
            }
        }
    }
}
