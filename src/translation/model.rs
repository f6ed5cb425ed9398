/*!
 * Translation model abstractions.
 *
 * A `TranslationModel` converts text for one fixed language pair. Models are
 * obtained through a `ModelResolver`, which every worker calls once at start-up
 * so that loaded model state is never shared between workers.
 */

use std::fmt;

use crate::errors::TranslationError;

/// Ordered (source, target) language codes keying a translation model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguagePair {
    /// Source language code (e.g. "nl")
    pub source: String,
    /// Target language code (e.g. "en")
    pub target: String,
}

impl LanguagePair {
    /// Create a new language pair
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Whether `(from, to)` is exactly this pair
    pub fn matches(&self, from: &str, to: &str) -> bool {
        self.source == from && self.target == to
    }

    pub(crate) fn not_installed(&self) -> TranslationError {
        TranslationError::ModelNotInstalled {
            source_code: self.source.clone(),
            target_code: self.target.clone(),
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// A loaded model able to translate text for one language pair
pub trait TranslationModel {
    /// Translate a single text
    fn translate(&self, text: &str) -> Result<String, TranslationError>;
}

impl<M: TranslationModel + ?Sized> TranslationModel for Box<M> {
    fn translate(&self, text: &str) -> Result<String, TranslationError> {
        (**self).translate(text)
    }
}

/// Loads a translation model for a language pair
///
/// Resolution happens inside each worker, so implementations must be shareable
/// across threads while the models they return need not be.
pub trait ModelResolver: Send + Sync {
    /// Resolve the model for `pair`
    fn resolve(&self, pair: &LanguagePair) -> Result<Box<dyn TranslationModel>, TranslationError>;
}
