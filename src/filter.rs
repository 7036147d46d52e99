//! Interpolation filters.
//!
//! A filter is a weighting function over the signed distance (in source
//! samples, at 1:1 scale) between a source sample and the point being
//! reconstructed, plus the radius beyond which the weight is zero.
//! [`KernelMap::build`](crate::KernelMap::build) turns a filter into the
//! per-axis weight tables used by the convolution pipeline.

use core::f64::consts::PI;

use crate::ResizeError;

/// A pluggable weighting function.
pub trait InterpolationFilter {
    /// Radius in source samples beyond which [`weight`](Self::weight) is zero.
    fn support(&self) -> f64;

    /// Weight at signed distance `x`.
    fn weight(&self, x: f64) -> f64;

    /// Rejects parameters that would produce a degenerate filter.
    /// [`KernelMap::build`](crate::KernelMap::build) calls this first.
    fn validate(&self) -> Result<(), ResizeError> {
        Ok(())
    }
}

impl<F: InterpolationFilter + ?Sized> InterpolationFilter for &F {
    fn support(&self) -> f64 {
        (**self).support()
    }
    fn weight(&self, x: f64) -> f64 {
        (**self).weight(x)
    }
    fn validate(&self) -> Result<(), ResizeError> {
        (**self).validate()
    }
}

/// The standard filter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interpolation {
    /// Nearest neighbour. Half-open so exactly one tap wins on ties.
    Point,
    /// Box (area average when downscaling).
    Box,
    /// Triangle; bilinear in 2D.
    Linear,
    /// Mitchell-Netravali family cubic with parameters `b` and `c`.
    Cubic { b: f64, c: f64 },
    /// Lanczos-windowed sinc with the given number of lobes.
    Lanczos { lobes: u32 },
}

impl Interpolation {
    pub const CATMULL_ROM: Self = Self::Cubic { b: 0.0, c: 0.5 };
    pub const MITCHELL: Self = Self::Cubic { b: 1.0 / 3.0, c: 1.0 / 3.0 };
    pub const SPLINE: Self = Self::Cubic { b: 1.0, c: 0.0 };
    pub const LANCZOS: Self = Self::Lanczos { lobes: 3 };
}

impl Default for Interpolation {
    fn default() -> Self {
        Self::LANCZOS
    }
}

impl InterpolationFilter for Interpolation {
    /// Cubic `b` and `c` must lie in `[0, 1]`, which covers the whole
    /// Mitchell-Netravali family in use. Lanczos needs at least one lobe.
    fn validate(&self) -> Result<(), ResizeError> {
        match *self {
            Self::Cubic { b, c } if !(0.0..=1.0).contains(&b) || !(0.0..=1.0).contains(&c) => {
                Err(ResizeError::InvalidFilter("cubic parameters must lie in [0, 1]"))
            }
            Self::Lanczos { lobes: 0 } => {
                Err(ResizeError::InvalidFilter("lanczos needs at least one lobe"))
            }
            _ => Ok(()),
        }
    }

    fn support(&self) -> f64 {
        match *self {
            Self::Point | Self::Box => 0.5,
            Self::Linear => 1.0,
            Self::Cubic { .. } => 2.0,
            Self::Lanczos { lobes } => f64::from(lobes),
        }
    }

    #[inline]
    fn weight(&self, x: f64) -> f64 {
        match *self {
            Self::Point | Self::Box => {
                if (-0.5..0.5).contains(&x) {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Linear => {
                let x = x.abs();
                if x < 1.0 { 1.0 - x } else { 0.0 }
            }
            Self::Cubic { b, c } => cubic(x, b, c),
            Self::Lanczos { lobes } => lanczos(x, f64::from(lobes)),
        }
    }
}

#[inline]
fn cubic(x: f64, b: f64, c: f64) -> f64 {
    let x = x.abs();
    let x2 = x * x;
    let x3 = x2 * x;
    if x < 1.0 {
        ((12.0 - 9.0 * b - 6.0 * c) * x3 + (-18.0 + 12.0 * b + 6.0 * c) * x2 + (6.0 - 2.0 * b))
            / 6.0
    } else if x < 2.0 {
        ((-b - 6.0 * c) * x3
            + (6.0 * b + 30.0 * c) * x2
            + (-12.0 * b - 48.0 * c) * x
            + (8.0 * b + 24.0 * c))
            / 6.0
    } else {
        0.0
    }
}

#[inline]
fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-9 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

#[inline]
fn lanczos(x: f64, lobes: f64) -> f64 {
    if x.abs() >= lobes {
        0.0
    } else {
        sinc(x) * sinc(x / lobes)
    }
}

/// Gaussian with standard deviation `sigma`, truncated at three sigma.
/// Used to build the blur maps of the unsharp mask stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian {
    pub sigma: f64,
}

impl InterpolationFilter for Gaussian {
    fn validate(&self) -> Result<(), ResizeError> {
        if self.sigma.is_finite() && self.sigma > 0.0 {
            Ok(())
        } else {
            Err(ResizeError::InvalidFilter("gaussian sigma must be positive"))
        }
    }

    fn support(&self) -> f64 {
        self.sigma * 3.0
    }

    fn weight(&self, x: f64) -> f64 {
        if x.abs() >= self.support() {
            0.0
        } else {
            (-(x * x) / (2.0 * self.sigma * self.sigma)).exp()
        }
    }
}
