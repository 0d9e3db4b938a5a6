// Spline mathematics backing the snake model: the order-4 exponential
// B-spline basis with its periodic interpolation prefilter, and natural
// cubic spline interpolation on uniform integer knots.

use crate::geometry::Point;

/// Exponential B-spline basis function of order four.
///
/// `omega` is the angular step of the closed contour (2*pi/M for M control
/// points). The basis has compact support on [0, 4] and is zero elsewhere.
pub fn exponential_bspline4(t: f64, omega: f64) -> f64 {
    let eta = 2.0 * (1.0 - omega.cos()) / (omega * omega);
    let value = if (0.0..=1.0).contains(&t) {
        t - (omega * t).sin() / omega
    } else if t > 1.0 && t <= 2.0 {
        2.0 - t + 2.0 * (omega * (t - 1.0)).sin() / omega + (omega * (t - 2.0)).sin() / omega
            - 2.0 * omega.cos() * t
            + 2.0 * omega.cos()
    } else if t > 2.0 && t <= 3.0 {
        t - 2.0 - 4.0 * omega.cos() - 2.0 * (omega * (t - 3.0)).sin() / omega
            + 2.0 * omega.cos() * (t - 1.0)
            - (omega * (t - 2.0)).sin() / omega
    } else if t > 3.0 && t <= 4.0 {
        4.0 - t + (omega * (t - 4.0)).sin() / omega
    } else {
        0.0
    };
    value / (omega * omega * eta)
}

/// Pole of the single-pole interpolation prefilter for the order-4
/// exponential B-spline, derived analytically from the basis value at t=2.
pub fn interpolation_pole(omega: f64) -> f64 {
    let b = exponential_bspline4(2.0, omega);
    (-b + (2.0 * b - 1.0).sqrt()) / (1.0 - b)
}

/// In-place all-pole IIR filter with periodic boundary conditions.
///
/// One causal and one anticausal pass per pole; converts curve samples into
/// the spline knot coefficients that interpolate them.
pub fn all_pole_iir_filter(signal: &mut [f64], poles: &[f64]) {
    let n = signal.len();
    if n == 0 {
        return;
    }
    for &z in poles {
        // causal pass, periodic initialization
        let mut zk = z;
        for k in (1..n).rev() {
            signal[0] += zk * signal[k];
            zk *= z;
        }
        signal[0] /= 1.0 - zk;
        for k in 1..n {
            signal[k] += z * signal[k - 1];
        }

        // anticausal pass, periodic initialization
        let last = n - 1;
        let mut zk = z;
        for k in 0..last {
            signal[last] += zk * signal[k];
            zk *= z;
        }
        signal[last] /= 1.0 - zk;
        let gain = (1.0 - z) * (1.0 - z);
        signal[last] *= gain;
        for k in (0..last).rev() {
            signal[k] = z * signal[k + 1] + gain * signal[k];
        }
    }
}

/// Natural cubic spline through values placed on uniform integer knots
/// 0, 1, ..., n-1. Second derivatives vanish at both ends.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    values: Vec<f64>,
    second_derivatives: Vec<f64>,
}

impl CubicSpline {
    pub fn natural(values: &[f64]) -> CubicSpline {
        let n = values.len();
        debug_assert!(n >= 2);
        let mut m = vec![0.0; n];
        if n > 2 {
            // Thomas algorithm on the tridiagonal system
            // m[i-1] + 4 m[i] + m[i+1] = 6 (y[i+1] - 2 y[i] + y[i-1])
            let unknowns = n - 2;
            let mut diag = vec![4.0; unknowns];
            let mut rhs = vec![0.0; unknowns];
            for i in 0..unknowns {
                rhs[i] = 6.0 * (values[i + 2] - 2.0 * values[i + 1] + values[i]);
            }
            for i in 1..unknowns {
                let w = 1.0 / diag[i - 1];
                diag[i] -= w;
                rhs[i] -= w * rhs[i - 1];
            }
            m[unknowns] = rhs[unknowns - 1] / diag[unknowns - 1];
            for i in (0..unknowns - 1).rev() {
                m[i + 1] = (rhs[i] - m[i + 2]) / diag[i];
            }
        }
        CubicSpline {
            values: values.to_vec(),
            second_derivatives: m,
        }
    }

    /// Evaluates the spline at parameter `t` in [0, n-1]. Values outside the
    /// knot range are clamped to the boundary segments.
    pub fn value(&self, t: f64) -> f64 {
        let n = self.values.len();
        let j = (t.floor() as isize).clamp(0, n as isize - 2) as usize;
        let s = t - j as f64;
        let sm = 1.0 - s;
        self.values[j] * sm
            + self.values[j + 1] * s
            + (sm * sm * sm - sm) * self.second_derivatives[j] / 6.0
            + (s * s * s - s) * self.second_derivatives[j + 1] / 6.0
    }
}

/// Pair of natural cubic splines interpolating a planar anchor chain on
/// uniform integer knots.
#[derive(Debug, Clone)]
pub struct PlanarCubicSpline {
    x: CubicSpline,
    y: CubicSpline,
}

impl PlanarCubicSpline {
    pub fn through(anchors: &[Point]) -> PlanarCubicSpline {
        let xs: Vec<f64> = anchors.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = anchors.iter().map(|p| p.y).collect();
        PlanarCubicSpline {
            x: CubicSpline::natural(&xs),
            y: CubicSpline::natural(&ys),
        }
    }

    pub fn point_at(&self, t: f64) -> Point {
        Point::new(self.x.value(t), self.y.value(t))
    }
}
