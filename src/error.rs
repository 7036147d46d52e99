/// Errors surfaced by kernel map construction, pipeline construction and
/// [`PixelSource::copy_pixels`](crate::PixelSource::copy_pixels).
///
/// Nothing in this crate retries: configuration and bounds errors are caller
/// mistakes, and resource errors are not recoverable by repeating the call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResizeError {
    /// No convolution kernel exists for this pixel layout.
    #[error("unsupported pixel format: {0}")]
    UnsupportedFormat(crate::PixelFormat),
    /// A source or target axis has zero length.
    #[error("image axis has zero extent")]
    ZeroExtent,
    /// The filter's support is not a positive finite number, or its
    /// parameters are out of range.
    #[error("invalid interpolation filter: {0}")]
    InvalidFilter(&'static str),
    /// Unsharp mask settings are out of range.
    #[error("invalid unsharp mask settings: {0}")]
    InvalidSharpen(&'static str),
    /// A kernel map's extents disagree with the source it is applied to.
    #[error("kernel map expects {expected} source pixels but the source has {actual}")]
    MapMismatch { expected: usize, actual: usize },
    /// The requested rectangle does not fall within the image.
    #[error("requested rectangle does not fall within the image bounds")]
    OutOfBounds,
    /// The destination buffer cannot hold the requested rectangle.
    #[error("destination buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },
    /// The stride is smaller than one row of the requested rectangle.
    #[error("stride smaller than row width")]
    InvalidStride,
    /// A working buffer could not be allocated.
    #[error("working buffer allocation failed")]
    OutOfMemory,
    /// The pipeline was used after [`dispose`](crate::ConvolutionTransform::dispose).
    #[error("pipeline used after dispose")]
    Disposed,
    /// The upstream pixel source failed.
    #[error("upstream pixel source failed")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}
