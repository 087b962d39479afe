//! Pass configuration: which [`TypeSystem`](crate::type_system::TypeSystem)
//! realization to run with, and a debug-only iteration cap used to catch a
//! non-terminating solver during development rather than in production.

/// Iteration bound asserted in debug builds only; release builds trust the
/// lattice-height argument in spec.md §4.4 and run to quiescence
/// unconditionally.
#[derive(Clone, Copy, Debug)]
pub struct SccpConfig {
    pub max_iterations: Option<usize>,
}

impl SccpConfig {
    pub fn new() -> Self {
        Self {
            max_iterations: None,
        }
    }

    /// Bound the number of main-loop iterations the analyzer may take
    /// before it is considered non-terminating. Only enforced in debug
    /// builds (`debug_assertions`); intended for development, not as a
    /// production safety valve.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }
}

impl Default for SccpConfig {
    fn default() -> Self {
        Self::new()
    }
}
