use thiserror::Error;

/// The error type for `gscnn-burn` operations.
///
/// Every variant describes a wiring error: tensors that reach a layer with a
/// shape the layer was not configured for, or a configuration whose parts do
/// not fit together. None of them is meant to be recovered from at runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GscnnError {
    /// Two tensors that must share batch and spatial dimensions do not.
    #[error("Shape mismatch in {operation}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// The fusion point where the mismatch was detected.
        operation: String,
        /// The expected shape.
        expected: String,
        /// The actual shape.
        actual: String,
    },

    /// A layer received a channel count different from the one it was built for.
    #[error("Channel mismatch in {layer}: expected {expected} channels, got {actual}")]
    ChannelMismatch {
        /// The layer that rejected its input.
        layer: String,
        /// The channel count the layer was configured with.
        expected: usize,
        /// The channel count of the input.
        actual: usize,
    },

    /// Error for when an invalid model configuration is provided.
    /// This can happen if configuration parameters are logically inconsistent.
    #[error("Invalid model configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },
}

/// A specialized `Result` type for `gscnn-burn` operations.
pub type GscnnResult<T> = Result<T, GscnnError>;
