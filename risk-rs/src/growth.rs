//! Exponential viral growth.

/// Viral concentration `t` days after the reference infection time.
///
/// `t` may be negative to project backwards. Callers must ensure
/// `doubling_time != 0`.
pub fn concentration(c0: f64, doubling_time: f64, t: f64) -> f64 {
    c0 * 2f64.powf(t / doubling_time)
}
