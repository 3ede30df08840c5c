//! API core configuration.

/// Default number of ids rendered into one `IN (...)` block.
pub const DEFAULT_IN_CHUNK_SIZE: usize = 950;

/// Default maximum depth of nested related-object calls.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 4;

/// Configuration for an [`ApiService`](crate::service::ApiService).
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Id sets larger than this are split into OR'd `IN` blocks.
    pub in_chunk_size: usize,

    /// Nested related-object calls deeper than this fail with an internal error.
    pub max_nesting_depth: usize,

    /// Record mutations to the audit sink.
    pub audit_enabled: bool,
}

impl ApiConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            in_chunk_size: DEFAULT_IN_CHUNK_SIZE,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            audit_enabled: true,
        }
    }

    /// Set the `IN` block size.
    pub fn with_in_chunk_size(mut self, size: usize) -> Self {
        self.in_chunk_size = size.max(1);
        self
    }

    /// Set the maximum nesting depth.
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Disable audit recording.
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new()
    }
}
