//! Constructors for one-dimensional grids

use crate::error::{Error, Result};

/// Build a linear grid with `n` equidistant points over `[xmin, xmax]`
///
/// ```rust
/// # use dustrt_numeric::lin_grid;
/// let xv = lin_grid(0.0, 4.0, 5).unwrap();
/// assert_eq!(xv, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
/// ```
pub fn lin_grid(xmin: f64, xmax: f64, n: usize) -> Result<Vec<f64>> {
    check_range(xmin, xmax, n)?;
    let dx = (xmax - xmin) / (n - 1) as f64;
    Ok((0..n).map(|i| xmin + i as f64 * dx).collect())
}

/// Build a logarithmic grid with `n` points over `[xmin, xmax]`
///
/// The points are equidistant in `log x`, so the lower bound must be
/// positive.
///
/// ```rust
/// # use dustrt_numeric::log_grid;
/// let xv = log_grid(1.0, 100.0, 3).unwrap();
/// assert!((xv[1] - 10.0).abs() < 1e-12);
/// ```
pub fn log_grid(xmin: f64, xmax: f64, n: usize) -> Result<Vec<f64>> {
    check_range(xmin, xmax, n)?;
    if xmin <= 0.0 {
        return Err(Error::NonPositiveLogBound(xmin));
    }
    let logxmin = xmin.log10();
    let dlogx = (xmax / xmin).log10() / (n - 1) as f64;
    Ok((0..n)
        .map(|i| 10_f64.powf(logxmin + i as f64 * dlogx))
        .collect())
}

/// Build a power-law grid with `n` bins and a given last/first width ratio
///
/// Returns the `n+1` borders of a grid whose bin widths grow geometrically
/// such that the last bin is `ratio` times wider than the first. A ratio
/// within `1e-3` of one falls back to a linear grid.
///
/// ```rust
/// # use dustrt_numeric::pow_grid;
/// let xv = pow_grid(0.0, 3.0, 3, 1.0).unwrap();
/// assert_eq!(xv, vec![0.0, 1.0, 2.0, 3.0]);
///
/// let xv = pow_grid(0.0, 1.0, 10, 100.0).unwrap();
/// let first = xv[1] - xv[0];
/// let last = xv[10] - xv[9];
/// assert!((last / first - 100.0).abs() < 1e-9);
/// ```
pub fn pow_grid(xmin: f64, xmax: f64, n: usize, ratio: f64) -> Result<Vec<f64>> {
    if (ratio - 1.0).abs() < 1e-3 {
        return lin_grid(xmin, xmax, n + 1);
    }
    check_range(xmin, xmax, n)?;
    let range = xmax - xmin;
    let q = ratio.powf(1.0 / (n - 1) as f64);
    Ok((0..=n)
        .map(|i| xmin + (1.0 - q.powi(i as i32)) / (1.0 - q.powi(n as i32)) * range)
        .collect())
}

fn check_range(xmin: f64, xmax: f64, n: usize) -> Result<()> {
    if xmin >= xmax {
        return Err(Error::InvalidGridRange {
            min: xmin,
            max: xmax,
        });
    }
    if n < 2 {
        return Err(Error::TooFewGridPoints {
            minimum: 2,
            found: n,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_grid_needs_positive_bound() {
        assert_eq!(
            log_grid(0.0, 1.0, 5),
            Err(Error::NonPositiveLogBound(0.0))
        );
    }

    #[test]
    fn pow_grid_endpoints_are_exact() {
        let xv = pow_grid(2.0, 9.0, 17, 25.0).unwrap();
        assert_eq!(xv.len(), 18);
        assert!((xv[0] - 2.0).abs() < 1e-12);
        assert!((xv[17] - 9.0).abs() < 1e-12);
        // borders are strictly ascending
        assert!(xv.windows(2).all(|w| w[0] < w[1]));
    }
}
