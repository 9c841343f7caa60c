use crate::source::SourceKey;
use thiserror::Error;

/// Errors raised by the icon model and rendering layer.
///
/// Orchestration code wraps these in [`anyhow::Error`] with additional
/// context; tests match on the variants directly.
#[derive(Debug, Error)]
pub enum IconError {
    /// A width or height was zero, negative, or not an integer at all.
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    /// A size string matched neither `WxH` nor `W:H`.
    #[error("invalid size format: {0:?} (expected \"WxH\" or \"W:H\")")]
    InvalidFormat(String),

    /// The size catalog document does not have the expected shape.
    #[error("size catalog schema error: {0}")]
    Schema(String),

    /// Walking the fallback chain for a key never reached a usable image.
    #[error("could not resolve a source image for '{key}': {reason}")]
    UnresolvableSource { key: SourceKey, reason: String },

    /// The macOS clip mask only works on square targets.
    #[error("macOS clipping needs a square target, got {width}x{height}")]
    NonSquareClip { width: u32, height: u32 },

    /// SVG parsing or rasterization failed.
    #[error("render error: {0}")]
    Render(String),
}
