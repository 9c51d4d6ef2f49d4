pub mod random;

pub use random::{Alphabet, RandomGenerator};

use snip_core::ShortCode;

/// Length of generated short codes unless configured otherwise.
pub const DEFAULT_ALIAS_LENGTH: usize = 8;

/// Trait for generating candidate short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// A candidate may collide with an existing mapping; callers resolve that
/// through the store's conditional create, not here.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Generates the next candidate short code.
    fn generate(&self) -> Self::Output;
}

impl<T: Generator + ?Sized> Generator for std::sync::Arc<T> {
    type Output = T::Output;

    fn generate(&self) -> Self::Output {
        (**self).generate()
    }
}
