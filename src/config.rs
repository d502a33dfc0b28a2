//! Runtime configuration.

/// Limits applied by the interpreter.
///
/// ```
/// use typeforge::RuntimeConfig;
///
/// let config = RuntimeConfig::new().max_call_depth(64).max_stack(256);
/// assert_eq!(config.call_depth_limit(), 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    max_call_depth: usize,
    max_stack: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;
    pub const DEFAULT_MAX_STACK: usize = 1024;

    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum nesting of method calls before `Fault::CallDepthExceeded`.
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Maximum operand stack height of a single frame.
    pub fn max_stack(mut self, slots: usize) -> Self {
        self.max_stack = slots;
        self
    }

    pub fn call_depth_limit(&self) -> usize {
        self.max_call_depth
    }

    pub fn stack_limit(&self) -> usize {
        self.max_stack
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
            max_stack: Self::DEFAULT_MAX_STACK,
        }
    }
}
