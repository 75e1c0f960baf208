//! Trajectory text parsers.
//!
//! Two line-oriented layouts are supported, one sample per line:
//!
//! - [`TrajectoryFormat::Whitespace`]: `x y timestamp`, separated by any
//!   run of whitespace.
//! - [`TrajectoryFormat::Benchmark`]: `id,x,y,timestamp`, comma separated;
//!   the leading id is ignored.
//!
//! Blank lines are skipped and fields after the timestamp are ignored.

use std::str::FromStr;

use mapweave_core::{Trajectory, TrajectoryPoint};

/// Input layout of a trajectory file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrajectoryFormat {
    /// `x y timestamp` per line.
    #[default]
    Whitespace,
    /// `id,x,y,timestamp` per line.
    Benchmark,
}

/// Error from [`parse_trajectory`]. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A line ended before the named field.
    #[error("line {line}: missing {field}")]
    MissingField {
        /// Line number.
        line: usize,
        /// Field name.
        field: &'static str,
    },

    /// A field is not a number.
    #[error("line {line}: invalid {field} {value:?}")]
    InvalidNumber {
        /// Line number.
        line: usize,
        /// Field name.
        field: &'static str,
        /// The offending text.
        value: String,
    },
}

/// Parse trajectory text in `format`.
///
/// # Errors
///
/// Returns [`ParseError`] for the first line with a missing or
/// non-numeric field.
pub fn parse_trajectory(text: &str, format: TrajectoryFormat) -> Result<Trajectory, ParseError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_line(i + 1, line, format))
        .collect()
}

fn parse_line(line: usize, text: &str, format: TrajectoryFormat) -> Result<TrajectoryPoint, ParseError> {
    let mut fields: Box<dyn Iterator<Item = &str>> = match format {
        TrajectoryFormat::Whitespace => Box::new(text.split_whitespace()),
        TrajectoryFormat::Benchmark => {
            let mut fields = text.split(',').map(str::trim);
            fields.next();
            Box::new(fields)
        }
    };
    let x = field(&mut fields, line, "x")?;
    let y = field(&mut fields, line, "y")?;
    let timestamp = field(&mut fields, line, "timestamp")?;
    Ok(TrajectoryPoint::new(x, y, timestamp))
}

fn field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    line: usize,
    name: &'static str,
) -> Result<f64, ParseError> {
    let value = fields
        .next()
        .filter(|v| !v.is_empty())
        .ok_or(ParseError::MissingField { line, field: name })?;
    f64::from_str(value).map_err(|_| ParseError::InvalidNumber {
        line,
        field: name,
        value: value.to_owned(),
    })
}
