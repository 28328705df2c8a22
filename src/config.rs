//! Tree configuration.

use crate::tracing_helpers::warn_log;

/// Smallest valid minimum degree. A degree-2 tree is a 2-3-4 tree.
pub const MIN_DEGREE: usize = 2;

/// Degree used by [`TreeConfig::default`].
pub const DEFAULT_DEGREE: usize = 16;

/// Configuration for a [`ConcurrentBTree`](crate::ConcurrentBTree).
///
/// The minimum degree `t` bounds every non-root node to `t - 1 ..= 2t - 1`
/// keys. Degrees below [`MIN_DEGREE`] are clamped rather than rejected.
///
/// ```rust
/// use snaptree::TreeConfig;
///
/// let config = TreeConfig::new().with_degree(0);
/// assert_eq!(config.degree(), 2);
/// assert_eq!(config.max_keys(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    degree: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
        }
    }
}

impl TreeConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum degree, clamping it to [`MIN_DEGREE`].
    #[must_use]
    pub fn with_degree(mut self, degree: usize) -> Self {
        if degree < MIN_DEGREE {
            warn_log!(requested = degree, clamped = MIN_DEGREE, "degree below minimum");
        }
        self.degree = degree.max(MIN_DEGREE);
        self
    }

    /// Minimum degree `t`.
    #[must_use]
    #[inline(always)]
    pub const fn degree(&self) -> usize {
        self.degree
    }

    /// Key capacity of a node, `2t - 1`.
    #[must_use]
    #[inline(always)]
    pub const fn max_keys(&self) -> usize {
        2 * self.degree - 1
    }

    /// Minimum key count of a non-root node, `t - 1`.
    #[must_use]
    #[inline(always)]
    pub const fn min_keys(&self) -> usize {
        self.degree - 1
    }
}
