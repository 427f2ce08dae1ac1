//! Parsers for the tabulated optical-property resource formats
//!
//! Three plain-text formats are supported, with rules that are part of
//! the external contract:
//!
//! - the one-file optical grid (`parse_optical_grid`): header lines start
//!   with `#`; the first non-header number gives the number of grain
//!   sizes, the second the number of wavelengths; then one block per
//!   grain size, each holding the size (micron) followed by one line per
//!   wavelength with `lambda, Qabs, Qsca, g` — wavelengths ascending, or
//!   descending with the `reverse` flag, and up to three dummy columns
//!   controlled by skip flags. Trailing text on any line is ignored.
//! - the DustEM-style three-file layout (`parse_dustem_grids`):
//!   wavelengths, efficiencies and asymmetry parameters in separate
//!   files sharing the grain-size grid.
//! - the Stokes layout (`parse_stokes`): per-(wavelength, size, angle)
//!   Mueller coefficients `S11 S12 S33 S34`.
//!
//! A fourth parser reads enthalpy tables (`parse_enthalpy`). All lengths
//! must be internally consistent; wavelengths and sizes convert from
//! micron to metres and enthalpies from erg/g to J/kg at load time.

use crate::error::{Error, Result};
use dustrt_numeric::{Table2, Table3};
use nom::character::complete::space0;
use nom::number::complete::double;
use nom::sequence::preceded;
use nom::IResult;

/// Optical efficiencies on a (wavelength, size) grid, in SI units
#[derive(Debug, Clone, PartialEq)]
pub struct OpticalGrid {
    /// Wavelengths in metres, ascending
    pub lambdav: Vec<f64>,
    /// Grain sizes in metres, ascending
    pub av: Vec<f64>,
    /// Absorption efficiencies indexed `(wavelength, size)`
    pub qabs: Table2,
    /// Scattering efficiencies indexed `(wavelength, size)`
    pub qsca: Table2,
    /// Asymmetry parameters indexed `(wavelength, size)`
    pub g: Table2,
}

/// Mueller coefficients on a (wavelength, size, angle) grid
#[derive(Debug, Clone, PartialEq)]
pub struct MuellerGrid {
    /// Wavelengths in metres, ascending
    pub lambdav: Vec<f64>,
    /// Grain sizes in metres, ascending
    pub av: Vec<f64>,
    /// Scattering angles in radians, ascending
    pub thetav: Vec<f64>,
    /// The four coefficient tables indexed `(wavelength, size, angle)`
    pub s11: Table3,
    /// See `s11`
    pub s12: Table3,
    /// See `s11`
    pub s33: Table3,
    /// See `s11`
    pub s34: Table3,
}

const MICRON: f64 = 1e-6;
// erg/g expressed in J/kg
const ERG_PER_GRAM: f64 = 1e-4;

// nom: a whitespace-preceded floating point number
fn number(i: &str) -> IResult<&str, f64> {
    preceded(space0, double)(i)
}

// all leading numbers of a line; trailing text is ignored
fn numbers(line: &str) -> Vec<f64> {
    let mut values = Vec::new();
    let mut rest = line;
    while let Ok((tail, value)) = number(rest) {
        values.push(value);
        rest = tail;
    }
    values
}

// walks the non-header, non-empty lines of a resource text
struct LineReader<'a> {
    resource: &'a str,
    lines: std::str::Lines<'a>,
}

impl<'a> LineReader<'a> {
    fn new(resource: &'a str, text: &'a str) -> Self {
        Self {
            resource,
            lines: text.lines(),
        }
    }

    fn next_line(&mut self) -> Result<&'a str> {
        for line in self.lines.by_ref() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            return Ok(line);
        }
        Err(Error::malformed(self.resource, "unexpected end of data"))
    }

    fn first_number(&mut self) -> Result<f64> {
        let line = self.next_line()?;
        number(line)
            .map(|(_, value)| value)
            .map_err(|_| Error::malformed(self.resource, format!("expected a number, found \"{line}\"")))
    }

    fn count(&mut self, what: &str) -> Result<usize> {
        let value = self.first_number()?;
        if value < 1.0 || value.fract() != 0.0 {
            return Err(Error::malformed(
                self.resource,
                format!("invalid {what} count {value}"),
            ));
        }
        Ok(value as usize)
    }

    // collect exactly `n` numbers, consuming as many lines as needed
    fn take_numbers(&mut self, n: usize, what: &str) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(n);
        while values.len() < n {
            let line = self.next_line()?;
            let mut found = numbers(line);
            if found.is_empty() {
                return Err(Error::malformed(
                    self.resource,
                    format!("expected {what} values, found \"{line}\""),
                ));
            }
            found.truncate(n - values.len());
            values.append(&mut found);
        }
        Ok(values)
    }
}

/// Parse the one-file optical grid format
///
/// The skip flags mark the presence of the dummy columns `X1` (before the
/// wavelength), `X2` (between the wavelength and `Qabs`) and `X3`
/// (between `Qsca` and `g`). With `reverse` set the wavelengths within a
/// block run in descending order.
pub fn parse_optical_grid(
    resource: &str,
    text: &str,
    reverse: bool,
    skip1: bool,
    skip2: bool,
    skip3: bool,
) -> Result<OpticalGrid> {
    let mut reader = LineReader::new(resource, text);
    let n_a = reader.count("grain size")?;
    let n_lambda = reader.count("wavelength")?;

    let mut av = Vec::with_capacity(n_a);
    let mut lambdav = vec![0.0; n_lambda];
    let mut qabs = Table2::new(n_lambda, n_a);
    let mut qsca = Table2::new(n_lambda, n_a);
    let mut g = Table2::new(n_lambda, n_a);

    // a data line holds [X1] lambda [X2] Qabs Qsca [X3] g
    let mut columns = Vec::new();
    if skip1 {
        columns.push(None);
    }
    columns.push(Some(0_usize)); // lambda
    if skip2 {
        columns.push(None);
    }
    columns.push(Some(1)); // Qabs
    columns.push(Some(2)); // Qsca
    if skip3 {
        columns.push(None);
    }
    columns.push(Some(3)); // g

    for i in 0..n_a {
        let size = reader.first_number()? * MICRON;
        if let Some(&previous) = av.last() {
            if size <= previous {
                return Err(Error::malformed(resource, "grain sizes must be ascending"));
            }
        }
        av.push(size);

        for line_index in 0..n_lambda {
            let line = reader.next_line()?;
            let values = numbers(line);
            if values.len() < columns.len() {
                return Err(Error::malformed(
                    resource,
                    format!("expected {} columns, found \"{line}\"", columns.len()),
                ));
            }
            // map the physical row to the ascending wavelength index
            let k = if reverse {
                n_lambda - 1 - line_index
            } else {
                line_index
            };
            let mut row = [0.0; 4];
            for (value, column) in values.iter().zip(&columns) {
                if let Some(slot) = column {
                    row[*slot] = *value;
                }
            }
            if i == 0 {
                lambdav[k] = row[0] * MICRON;
            }
            qabs.set(k, i, row[1]);
            qsca.set(k, i, row[2]);
            g.set(k, i, row[3]);
        }
    }

    if lambdav.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::malformed(resource, "wavelengths must be monotonic"));
    }
    Ok(OpticalGrid {
        lambdav,
        av,
        qabs,
        qsca,
        g,
    })
}

/// Parse the DustEM-style three-file layout
pub fn parse_dustem_grids(
    resource: &str,
    lambda_text: &str,
    q_text: &str,
    g_text: &str,
) -> Result<OpticalGrid> {
    // wavelength grid file: one value per non-header line
    let mut reader = LineReader::new(resource, lambda_text);
    let n_lambda = reader.count("wavelength")?;
    let mut lambdav = Vec::with_capacity(n_lambda);
    for _ in 0..n_lambda {
        lambdav.push(reader.first_number()? * MICRON);
    }
    if lambdav.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::malformed(resource, "wavelengths must be ascending"));
    }

    // efficiencies file: sizes, then Qabs and Qsca blocks
    let mut reader = LineReader::new(resource, q_text);
    let n_a = reader.count("grain size")?;
    let av: Vec<f64> = reader
        .take_numbers(n_a, "grain size")?
        .iter()
        .map(|a| a * MICRON)
        .collect();
    if av.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::malformed(resource, "grain sizes must be ascending"));
    }

    let mut qabs = Table2::new(n_lambda, n_a);
    let mut qsca = Table2::new(n_lambda, n_a);
    for table in [&mut qabs, &mut qsca] {
        for k in 0..n_lambda {
            let row = reader.take_numbers(n_a, "efficiency")?;
            for (i, value) in row.iter().enumerate() {
                table.set(k, i, *value);
            }
        }
    }

    // asymmetry file: the same sizes, then the g block
    let mut reader = LineReader::new(resource, g_text);
    let n_a_check = reader.count("grain size")?;
    let av_check: Vec<f64> = reader
        .take_numbers(n_a_check, "grain size")?
        .iter()
        .map(|a| a * MICRON)
        .collect();
    if av_check != av {
        return Err(Error::malformed(
            resource,
            "the size grids of the efficiency and asymmetry files differ",
        ));
    }
    let mut g = Table2::new(n_lambda, n_a);
    for k in 0..n_lambda {
        let row = reader.take_numbers(n_a, "asymmetry")?;
        for (i, value) in row.iter().enumerate() {
            g.set(k, i, *value);
        }
    }

    Ok(OpticalGrid {
        lambdav,
        av,
        qabs,
        qsca,
        g,
    })
}

/// Parse an enthalpy table: a count, then `T h` lines in K and erg/g
pub fn parse_enthalpy(resource: &str, text: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut reader = LineReader::new(resource, text);
    let n_t = reader.count("temperature")?;
    let mut tv = Vec::with_capacity(n_t);
    let mut hv = Vec::with_capacity(n_t);
    for _ in 0..n_t {
        let line = reader.next_line()?;
        let values = numbers(line);
        if values.len() < 2 {
            return Err(Error::malformed(
                resource,
                format!("expected \"T h\" columns, found \"{line}\""),
            ));
        }
        tv.push(values[0]);
        hv.push(values[1] * ERG_PER_GRAM);
    }
    if tv.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::malformed(resource, "temperatures must be ascending"));
    }
    Ok((tv, hv))
}

/// Parse the Stokes-style Mueller coefficient layout
///
/// Counts for sizes, wavelengths and angles come first; then the three
/// grids (sizes and wavelengths in micron, angles in degrees); then one
/// line per `(size, wavelength, angle)` triple — size-major, angle
/// fastest — with the four coefficients `S11 S12 S33 S34`.
pub fn parse_stokes(resource: &str, text: &str) -> Result<MuellerGrid> {
    let mut reader = LineReader::new(resource, text);
    let n_a = reader.count("grain size")?;
    let n_lambda = reader.count("wavelength")?;
    let n_theta = reader.count("angle")?;

    let av: Vec<f64> = reader
        .take_numbers(n_a, "grain size")?
        .iter()
        .map(|a| a * MICRON)
        .collect();
    let lambdav: Vec<f64> = reader
        .take_numbers(n_lambda, "wavelength")?
        .iter()
        .map(|l| l * MICRON)
        .collect();
    let thetav: Vec<f64> = reader
        .take_numbers(n_theta, "angle")?
        .iter()
        .map(|t| t.to_radians())
        .collect();

    let mut s11 = Table3::new(n_lambda, n_a, n_theta);
    let mut s12 = Table3::new(n_lambda, n_a, n_theta);
    let mut s33 = Table3::new(n_lambda, n_a, n_theta);
    let mut s34 = Table3::new(n_lambda, n_a, n_theta);

    for i in 0..n_a {
        for k in 0..n_lambda {
            for d in 0..n_theta {
                let row = reader.take_numbers(4, "Mueller coefficient")?;
                s11.set(k, i, d, row[0]);
                s12.set(k, i, d, row[1]);
                s33.set(k, i, d, row[2]);
                s34.set(k, i, d, row[3]);
            }
        }
    }

    Ok(MuellerGrid {
        lambdav,
        av,
        thetav,
        s11,
        s12,
        s33,
        s34,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_GRID: &str = "\
# toy optical properties
# two sizes, three wavelengths
2
3
0.01
0.1 1.0 0.5 0.6
0.2 0.9 0.4 0.5
0.4 0.8 0.3 0.4
0.10 trailing text is ignored
0.1 2.0 1.0 0.7
0.2 1.8 0.9 0.6
0.4 1.6 0.8 0.5
";

    #[test]
    fn one_file_grid_parses() {
        let grid = parse_optical_grid("toy", SIMPLE_GRID, false, false, false, false).unwrap();
        assert_eq!(grid.av, vec![0.01e-6, 0.10e-6]);
        assert_eq!(grid.lambdav, vec![0.1e-6, 0.2e-6, 0.4e-6]);
        assert_eq!(grid.qabs.get(0, 0), 1.0);
        assert_eq!(grid.qsca.get(2, 1), 0.8);
        assert_eq!(grid.g.get(1, 0), 0.5);
    }

    #[test]
    fn reversed_wavelengths_are_flipped() {
        let reversed = "\
1
2
0.01
0.4 8.0 4.0 0.1
0.1 2.0 1.0 0.2
";
        let grid = parse_optical_grid("toy", reversed, true, false, false, false).unwrap();
        assert_eq!(grid.lambdav, vec![0.1e-6, 0.4e-6]);
        assert_eq!(grid.qabs.get(0, 0), 2.0);
        assert_eq!(grid.qabs.get(1, 0), 8.0);
    }

    #[test]
    fn skip_columns_are_honoured() {
        let skipped = "\
1
1
0.01
9.9 0.1 8.8 2.0 1.0 7.7 0.2
";
        let grid = parse_optical_grid("toy", skipped, false, true, true, true).unwrap();
        assert_eq!(grid.lambdav, vec![0.1e-6]);
        assert_eq!(grid.qabs.get(0, 0), 2.0);
        assert_eq!(grid.qsca.get(0, 0), 1.0);
        assert_eq!(grid.g.get(0, 0), 0.2);
    }

    #[test]
    fn truncated_files_fail_loudly() {
        let truncated = "2\n3\n0.01\n0.1 1.0 0.5 0.6\n";
        assert!(parse_optical_grid("toy", truncated, false, false, false, false).is_err());
    }

    #[test]
    fn dustem_layout_parses() {
        let lambda_text = "# grid\n2\n0.1\n0.2\n";
        let q_text = "2\n0.01 0.1\n1.0 2.0\n3.0 4.0\n0.5 0.6\n0.7 0.8\n";
        let g_text = "2\n0.01 0.1\n0.1 0.2\n0.3 0.4\n";
        let grid = parse_dustem_grids("toy", lambda_text, q_text, g_text).unwrap();
        assert_eq!(grid.lambdav, vec![0.1e-6, 0.2e-6]);
        assert_eq!(grid.qabs.get(1, 0), 3.0);
        assert_eq!(grid.qsca.get(0, 1), 0.6);
        assert_eq!(grid.g.get(1, 1), 0.4);
    }

    #[test]
    fn enthalpy_converts_units() {
        let text = "# h(T)\n2\n10.0 1.0e7\n100.0 1.0e9\n";
        let (tv, hv) = parse_enthalpy("toy", text).unwrap();
        assert_eq!(tv, vec![10.0, 100.0]);
        assert_eq!(hv, vec![1.0e3, 1.0e5]);
    }

    #[test]
    fn stokes_layout_parses() {
        let text = "\
1
1
2
0.01
0.1
0.0 180.0
1.0 0.1 0.2 0.3
2.0 0.4 0.5 0.6
";
        let grid = parse_stokes("toy", text).unwrap();
        assert_eq!(grid.thetav.len(), 2);
        assert!((grid.thetav[1] - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(grid.s11.get(0, 0, 1), 2.0);
        assert_eq!(grid.s34.get(0, 0, 0), 0.3);
    }
}
