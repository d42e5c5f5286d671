//! Globally adaptive Gauss–Kronrod quadrature over a finite interval.
//!
//! Each step bisects the subinterval with the largest error estimate until the
//! summed error meets `max(epsabs, epsrel * |integral|)` or the subdivision
//! limit is reached. The 21-point rule and its error scaling follow QUADPACK's
//! `qk21`.

use log::warn;

use crate::error::{Result, RiskError};

// Kronrod abscissae; odd indices are the 10-point Gauss abscissae.
const XGK: [f64; 11] = [
    0.995657163025808080735527280689003,
    0.973906528517171720077964012084452,
    0.930157491355708226001207180059508,
    0.865063366688984510732096688423493,
    0.780817726586416897063717578345042,
    0.679409568299024406234327365114874,
    0.562757134668604683339000099272694,
    0.433395394129247190799265943165784,
    0.294392862701460198131126603103866,
    0.148874338981631210884826001129720,
    0.000000000000000000000000000000000,
];

const WGK: [f64; 11] = [
    0.011694638867371874278064396062192,
    0.032558162307964727478818972459390,
    0.054755896574351996031381300244580,
    0.075039674810919952767043140916190,
    0.093125454583697605535065465083366,
    0.109387158802297641899210590325805,
    0.123491976262065851077208980878410,
    0.134709217311473325928054001771707,
    0.142775938577060080797094273138717,
    0.147739104901338491374841515972068,
    0.149445554002916905664936468389821,
];

const WG: [f64; 5] = [
    0.066671344308688137593568809893332,
    0.149451349150580593145776339657697,
    0.219086362515982043995534934228163,
    0.269266719309996355091226921569469,
    0.295524224714752870173892994651338,
];

/// Outcome of an adaptive integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrature {
    pub value: f64,
    pub abs_error: f64,
    pub intervals: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussKronrod {
    pub epsabs: f64,
    pub epsrel: f64,
    pub limit: usize,
}

impl Default for GaussKronrod {
    fn default() -> Self {
        GaussKronrod {
            epsabs: 1.49e-8,
            epsrel: 1.49e-8,
            limit: 200,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    error: f64,
}

impl GaussKronrod {
    /// Integrate `f` over `[a, b]`.
    ///
    /// Extra arguments are passed by capturing them in `f`. A non-finite
    /// integrand value anywhere in the rule is reported as
    /// [`RiskError::Numerical`].
    pub fn integrate<F>(&self, f: F, a: f64, b: f64) -> Result<Quadrature>
    where
        F: Fn(f64) -> f64,
    {
        if self.limit == 0 {
            return Err(RiskError::invalid("limit", "quadrature needs at least one interval"));
        }
        let first = qk21(&f, a, b)?;
        let mut segments = vec![first];
        let mut total = first.value;
        let mut total_error = first.error;

        while total_error > f64::max(self.epsabs, self.epsrel * total.abs())
            && segments.len() < self.limit
        {
            let worst = segments
                .iter()
                .enumerate()
                .max_by(|(_, x), (_, y)| x.error.total_cmp(&y.error))
                .map(|(i, _)| i)
                .unwrap_or(0);
            let parent = segments.swap_remove(worst);
            let mid = 0.5 * (parent.a + parent.b);
            let left = qk21(&f, parent.a, mid)?;
            let right = qk21(&f, mid, parent.b)?;
            total += left.value + right.value - parent.value;
            total_error += left.error + right.error - parent.error;
            segments.push(left);
            segments.push(right);
        }

        let value = segments.iter().map(|s| s.value).sum::<f64>();
        let abs_error = segments.iter().map(|s| s.error).sum::<f64>();
        let converged = abs_error <= f64::max(self.epsabs, self.epsrel * value.abs());
        if !converged {
            warn!(
                "quadrature over ({a}, {b}) stopped at {} subintervals with error {abs_error:e}",
                segments.len()
            );
        }
        Ok(Quadrature {
            value,
            abs_error,
            intervals: segments.len(),
            converged,
        })
    }
}

fn qk21<F>(f: &F, a: f64, b: f64) -> Result<Segment>
where
    F: Fn(f64) -> f64,
{
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);
    let abs_half = half.abs();

    let fc = f(center);
    let mut res_g = 0.0;
    let mut res_k = WGK[10] * fc;
    let mut res_abs = res_k.abs();
    let mut fv1 = [0.0; 10];
    let mut fv2 = [0.0; 10];

    for j in 0..5 {
        let jt = 2 * j + 1;
        let dx = half * XGK[jt];
        let f1 = f(center - dx);
        let f2 = f(center + dx);
        fv1[jt] = f1;
        fv2[jt] = f2;
        res_g += WG[j] * (f1 + f2);
        res_k += WGK[jt] * (f1 + f2);
        res_abs += WGK[jt] * (f1.abs() + f2.abs());
    }
    for j in 0..5 {
        let jt = 2 * j;
        let dx = half * XGK[jt];
        let f1 = f(center - dx);
        let f2 = f(center + dx);
        fv1[jt] = f1;
        fv2[jt] = f2;
        res_k += WGK[jt] * (f1 + f2);
        res_abs += WGK[jt] * (f1.abs() + f2.abs());
    }

    let res_k_half = 0.5 * res_k;
    let mut res_asc = WGK[10] * (fc - res_k_half).abs();
    for j in 0..10 {
        res_asc += WGK[j] * ((fv1[j] - res_k_half).abs() + (fv2[j] - res_k_half).abs());
    }

    let value = res_k * half;
    if !value.is_finite() {
        return Err(RiskError::numerical("quadrature rule", value));
    }
    res_abs *= abs_half;
    res_asc *= abs_half;

    let mut error = ((res_k - res_g) * half).abs();
    if res_asc != 0.0 && error != 0.0 {
        error = res_asc * f64::min(1.0, (200.0 * error / res_asc).powf(1.5));
    }
    if res_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        error = f64::max(50.0 * f64::EPSILON * res_abs, error);
    }

    Ok(Segment {
        a,
        b,
        value,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_is_exact() {
        let q = GaussKronrod::default()
            .integrate(|x| 3.0 * x * x - 2.0 * x + 1.0, -1.0, 2.0)
            .unwrap();
        // [x^3 - x^2 + x] from -1 to 2 = 6 - (-3)
        assert!(f64::abs(q.value - 9.0) < 1e-12);
        assert!(q.converged);
        assert_eq!(q.intervals, 1);
    }

    #[test]
    fn test_gaussian_bump() {
        let q = GaussKronrod::default()
            .integrate(|x| f64::exp(-0.5 * (x - 10.0).powi(2)), -20.0, 40.0)
            .unwrap();
        let expected = f64::sqrt(2.0 * std::f64::consts::PI);
        assert!(f64::abs(q.value - expected) < 1e-8);
    }

    #[test]
    fn test_step_function() {
        let q = GaussKronrod::default()
            .integrate(|x| if x < 3.3 { 0.0 } else { 1.0 }, -20.0, 100.0)
            .unwrap();
        assert!(f64::abs(q.value - 96.7) < 1e-6);
    }

    #[test]
    fn test_captured_arguments_pass_through() {
        let args = (2.0, 0.5);
        let q = GaussKronrod::default()
            .integrate(|x| args.0 * f64::exp(-args.1 * x), 0.0, 40.0)
            .unwrap();
        assert!(f64::abs(q.value - 4.0 * (1.0 - f64::exp(-20.0))) < 1e-12);
    }

    #[test]
    fn test_non_finite_integrand_is_an_error() {
        let err = GaussKronrod::default()
            .integrate(|x| 1.0 / x.abs().min(0.0), -1.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, RiskError::Numerical { .. }));
    }

    #[test]
    fn test_limit_reached_still_returns_value() {
        let q = GaussKronrod {
            limit: 2,
            ..GaussKronrod::default()
        }
        .integrate(|x| if x < 3.3 { 0.0 } else { 1.0 }, -20.0, 100.0)
        .unwrap();
        assert_eq!(q.intervals, 2);
        assert!(!q.converged);
    }
}
