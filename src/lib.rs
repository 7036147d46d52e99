//! # sharpscale
//!
//! *Streaming image resampling that keeps its edges.*
//!
//! Resizes images by separable convolution with high-quality interpolation
//! filters (Lanczos, cubic family, linear, box, point), optionally followed by
//! an unsharp mask. Images flow through [`PixelSource`]s: every stage pulls
//! rows from the stage above on demand, so a top-to-bottom read holds only a
//! small window of source rows in memory.
//!
//! Row kernels exist for 1 to 4 channels of `u8`, UQ15 fixed-point `u16`
//! and `f32` samples, with straight or premultiplied alpha. Kernels dispatch
//! to x86-64 AVX2 when available, with automatic fallback to scalar code.
//!
//! ```rust
//! use sharpscale::{ConvolutionTransform, Interpolation, MemorySource, PixelFormat, read_all};
//!
//! let source = MemorySource::packed(PixelFormat::GRAY8, 4, 4, vec![10; 16]).unwrap();
//! let mut half = ConvolutionTransform::new(source, &Interpolation::Box, 2, 2).unwrap();
//! assert_eq!(read_all(&mut half).unwrap(), [10, 10, 10, 10]);
//! ```
//!
//! ## Feature flags
//!
//! - **`std`** (default): forwarded to `archmage/std`. The crate itself
//!   always links the standard library for filter math and the shared
//!   [`BufferPool`], so turning this off only affects archmage.
//! - **`rgb`**: typed pixel layouts for [`rgb`] crate pixel types
//!   (`Rgb<u8>`, `Rgba<u8>`, `Bgra<u8>`, `Gray<f32>`, etc.) via bytemuck.
//! - **`imgref`**: whole-image resizing of [`imgref`] images (`ImgRef` in,
//!   `ImgVec` out). Implies `rgb`.

#![forbid(unsafe_code)]

extern crate alloc;

mod convolve;
mod error;
pub mod filter;
pub mod fixed;
mod format;
pub mod kernel_map;
mod pipeline;
pub mod pool;
mod source;

pub use error::ResizeError;
pub use filter::{Gaussian, Interpolation, InterpolationFilter};
pub use format::{AlphaMode, PixelFormat, PixelRect, SampleType};
pub use kernel_map::{KernelMap, Weight};
pub use pipeline::{ConvolutionTransform, ResizeSettings, UnsharpSettings};
pub use pool::{BufferPool, PooledBuffer};
pub use source::{MemorySource, PixelSource, read_all};

#[cfg(feature = "rgb")]
pub mod typed;

#[cfg(feature = "imgref")]
pub mod img;
