//! Linear detrending and least-squares sinusoid fitting.
//!
//! ```text
//! y[k] ≈ a·sin(ω t[k]) + b·cos(ω t[k]) + c + d·k
//! ```
//!
//! The trend is removed from the signal and from both basis columns over
//! the sample index, then `(a, b)` solve the 2×2 normal equations. Fitting
//! the detrended basis gives the same `(a, b)` as fitting all four terms at
//! once, so a sinusoid on a linear drift is recovered exactly.

/// Amplitude and phase of a fitted sinusoid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineFit {
    /// Coefficient of `sin(ωt)`.
    pub a: f64,
    /// Coefficient of `cos(ωt)`.
    pub b: f64,
}

impl SineFit {
    /// `√(a² + b²)`
    #[inline]
    pub fn amplitude(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// `atan2(b, a)` in degrees.
    #[inline]
    pub fn phase_deg(&self) -> f64 {
        self.b.atan2(self.a).to_degrees()
    }
}

/// Least-squares line over the sample index: `(intercept, slope)`.
pub fn linear_trend(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    match n {
        0 => (0.0, 0.0),
        1 => (values[0], 0.0),
        _ => {
            let nf = n as f64;
            let mean_k = (nf - 1.0) / 2.0;
            let mean_v = values.iter().sum::<f64>() / nf;
            let mut cov = 0.0;
            let mut var = 0.0;
            for (k, v) in values.iter().enumerate() {
                let dk = k as f64 - mean_k;
                cov += dk * (v - mean_v);
                var += dk * dk;
            }
            let slope = cov / var;
            (mean_v - slope * mean_k, slope)
        }
    }
}

/// Remove the least-squares line from `values`.
pub fn detrend(values: &[f64]) -> Vec<f64> {
    let (intercept, slope) = linear_trend(values);
    values
        .iter()
        .enumerate()
        .map(|(k, v)| v - (intercept + slope * k as f64))
        .collect()
}

/// Fit `a·sin(ωt) + b·cos(ωt)` to `y` (detrended) sampled at `t`.
///
/// Returns `None` when the normal equations are singular, e.g. fewer than
/// two independent samples or every sample on a zero of the sine.
pub fn fit_sinusoid(t: &[f64], y: &[f64], omega: f64) -> Option<SineFit> {
    let n = t.len().min(y.len());
    if n < 2 {
        return None;
    }
    let sin = detrend(&t[..n].iter().map(|&t| (omega * t).sin()).collect::<Vec<_>>());
    let cos = detrend(&t[..n].iter().map(|&t| (omega * t).cos()).collect::<Vec<_>>());

    let (mut ss, mut cc, mut sc, mut ys, mut yc) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for k in 0..n {
        ss += sin[k] * sin[k];
        cc += cos[k] * cos[k];
        sc += sin[k] * cos[k];
        ys += y[k] * sin[k];
        yc += y[k] * cos[k];
    }

    // Basis values are O(1); a column this small carries no information.
    let floor = 1e-12 * n as f64;
    if !(ss > floor && cc > floor) {
        return None;
    }
    let det = ss * cc - sc * sc;
    if !det.is_finite() || det <= 1e-12 * ss * cc {
        return None;
    }
    Some(SineFit {
        a: (ys * cc - yc * sc) / det,
        b: (yc * ss - ys * sc) / det,
    })
}
