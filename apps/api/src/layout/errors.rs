use thiserror::Error;

/// Failures raised by the pagination engine itself.
///
/// Layout-quality problems (overflowing pages, near-empty first pages, long documents)
/// are NOT errors. They are reported as data by the validator. Only configuration and
/// malformed-input problems surface here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// Template is missing or has nonsensical page/typography settings.
    /// Raised at request ingress or startup, never from inside the packing loop.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No live layout surface is available. Callers fall back to estimated heights.
    #[error("Measurement unavailable: {0}")]
    MeasurementUnavailable(String),

    /// The layout surface has not completed a pass for this block yet.
    /// A pending reading is never interpreted as a zero height.
    #[error("Block {block_index} has not been measured yet")]
    NotYetMeasured { block_index: usize },

    #[error("Got {heights} heights for {blocks} blocks")]
    HeightMismatch { blocks: usize, heights: usize },

    #[error("Block {block_index} has invalid height {px}")]
    InvalidHeight { block_index: usize, px: f32 },
}

impl LayoutError {
    /// True for errors caused by caller input rather than engine state.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LayoutError::Configuration(_)
                | LayoutError::HeightMismatch { .. }
                | LayoutError::InvalidHeight { .. }
        )
    }
}
