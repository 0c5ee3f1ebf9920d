/// Per-engine tunables.
///
/// Every [`Interpreter`](crate::Interpreter) owns one of these; nothing is
/// read from the process environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of nested function activations allowed before a
    /// `RangeError: Maximum call stack size exceeded` is thrown.
    pub max_call_depth: usize,
    /// When set, assigning to an undeclared identifier from sloppy code
    /// creates a property on the global object instead of throwing a
    /// `ReferenceError`. Strict code always throws.
    pub implicit_globals: bool,
    /// Run top-level script code as strict even without a directive.
    pub strict: bool,
}

pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            implicit_globals: false,
            strict: false,
        }
    }
}

impl EngineConfig {
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_implicit_globals(mut self, enabled: bool) -> Self {
        self.implicit_globals = enabled;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
