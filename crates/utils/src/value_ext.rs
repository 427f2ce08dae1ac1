use crate::f;

/// Extends primitives with more specific formatting options
pub trait ValueExt {
    /// Consistent scientific notation for optical quantities
    ///
    /// Wavelengths, cross sections and opacities span many orders of
    /// magnitude, and the default `LowerExp` formatting neither fixes
    /// the precision nor pads the exponent, so columns of values do not
    /// line up. This helper does both.
    ///
    /// Works for anything implementing the `LowerExp` trait, which is
    /// pretty much every numerical primitive.
    ///
    /// ```rust
    /// # use dustrt_utils::ValueExt;
    /// // a V-band wavelength in metres
    /// assert_eq!((5.5e-7).sci(3, 2), "5.500e-07".to_string());
    /// // a reference extinction opacity in m2/kg
    /// assert_eq!((2.6e3).sci(2, 2), "2.60e+03".to_string());
    /// // a backward asymmetry parameter keeps its sign
    /// assert_eq!((-0.9).sci(1, 2), "-9.0e-01".to_string());
    /// ```
    fn sci(&self, precision: usize, exp_pad: usize) -> String;
}

impl<T: std::fmt::LowerExp> ValueExt for T {
    fn sci(&self, precision: usize, exp_pad: usize) -> String {
        let formatted = f!("{:.precision$e}", self, precision = precision);
        // `{:e}` always emits an exponent marker but only signs
        // negative exponents
        let (mantissa, exponent) = formatted.split_once('e').expect("exponent marker");
        match exponent.strip_prefix('-') {
            Some(digits) => f!("{mantissa}e-{digits:0>exp_pad$}"),
            None => f!("{mantissa}e+{exponent:0>exp_pad$}"),
        }
    }
}
