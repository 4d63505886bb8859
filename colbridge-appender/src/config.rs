use colbridge_result::{Error, Result};
use colbridge_types::VECTOR_SIZE;

/// Run-time appender configuration (no hidden constants).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppenderConfig {
    /// Rows buffered per chunk before an automatic flush. Must lie in
    /// `1..=VECTOR_SIZE`.
    pub chunk_capacity: usize,
}

impl Default for AppenderConfig {
    fn default() -> Self {
        Self {
            chunk_capacity: VECTOR_SIZE,
        }
    }
}

impl AppenderConfig {
    pub fn with_chunk_capacity(mut self, chunk_capacity: usize) -> Self {
        self.chunk_capacity = chunk_capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_capacity == 0 || self.chunk_capacity > VECTOR_SIZE {
            return Err(Error::InvalidArgumentError(format!(
                "chunk_capacity must be between 1 and {VECTOR_SIZE}, got {}",
                self.chunk_capacity
            )));
        }
        Ok(())
    }
}
