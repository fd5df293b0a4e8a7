//! Feature standardization shared by the distance- and margin-based strategies.

use ndarray::{Array1, Array2, ArrayView2, Axis};

/// Per-column standardization fitted on training rows.
///
/// Columns with zero (or undefined) spread are centered only.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl Standardizer {
    /// Column means and sample standard deviations of `x`.
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let n = x.nrows();
        let mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scale = if n > 1 {
            x.std_axis(Axis(0), 1.0)
                .mapv(|sd| if sd.is_finite() && sd > 0.0 { sd } else { 1.0 })
        } else {
            Array1::ones(x.ncols())
        };
        Self { mean, scale }
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        (&x - &self.mean) / &self.scale
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }
}
