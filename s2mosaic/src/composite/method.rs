//! Mosaic method selection and validation.

use std::fmt;

use tracing::warn;

use super::CompositeError;

/// How overlapping observations are combined.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MosaicMethod {
    /// Average of all clear observations.
    #[default]
    Mean,
    /// First clear observation in scene order.
    First,
    /// Per-pixel percentile of clear observations, `0..=100`.
    Percentile(f64),
}

impl MosaicMethod {
    /// Method names accepted by [`MosaicMethod::parse`], besides the
    /// deprecated `median`.
    pub const NAMES: [&'static str; 3] = ["mean", "first", "percentile"];

    /// Resolves a method name and optional percentile.
    ///
    /// `median` is accepted for compatibility and becomes the 50th
    /// percentile. A percentile value is required for `percentile` and
    /// rejected for the other methods.
    pub fn parse(name: &str, percentile: Option<f64>) -> Result<Self, CompositeError> {
        match name {
            "mean" | "first" => {
                if let Some(value) = percentile {
                    return Err(CompositeError::PercentileNotAllowed(value));
                }
                Ok(if name == "mean" {
                    MosaicMethod::Mean
                } else {
                    MosaicMethod::First
                })
            }
            "percentile" => {
                let value = percentile.ok_or(CompositeError::PercentileRequired)?;
                MosaicMethod::Percentile(value).validated()
            }
            "median" => {
                warn!("Median mosaic method is deprecated, use percentile with 50th percentile instead");
                Ok(MosaicMethod::Percentile(50.0))
            }
            other => Err(CompositeError::UnknownMethod(other.to_string())),
        }
    }

    /// Checks the percentile range.
    pub fn validated(self) -> Result<Self, CompositeError> {
        match self {
            MosaicMethod::Percentile(p) if !(0.0..=100.0).contains(&p) => {
                Err(CompositeError::PercentileRange(p))
            }
            other => Ok(other),
        }
    }

    /// Name used in output file names.
    pub fn name(&self) -> &'static str {
        match self {
            MosaicMethod::Mean => "mean",
            MosaicMethod::First => "first",
            MosaicMethod::Percentile(_) => "percentile",
        }
    }

    pub fn percentile(&self) -> Option<f64> {
        match self {
            MosaicMethod::Percentile(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for MosaicMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MosaicMethod::Percentile(p) => write!(f, "percentile ({})", p),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_methods() {
        assert_eq!(MosaicMethod::parse("mean", None), Ok(MosaicMethod::Mean));
        assert_eq!(MosaicMethod::parse("first", None), Ok(MosaicMethod::First));
        assert_eq!(
            MosaicMethod::parse("percentile", Some(25.0)),
            Ok(MosaicMethod::Percentile(25.0))
        );
    }

    #[test]
    fn test_median_is_deprecated_alias() {
        assert_eq!(
            MosaicMethod::parse("median", None),
            Ok(MosaicMethod::Percentile(50.0))
        );
        assert_eq!(
            MosaicMethod::parse("median", Some(10.0)),
            Ok(MosaicMethod::Percentile(50.0))
        );
    }

    #[test]
    fn test_percentile_rules() {
        assert_eq!(
            MosaicMethod::parse("percentile", None),
            Err(CompositeError::PercentileRequired)
        );
        assert_eq!(
            MosaicMethod::parse("percentile", Some(101.0)),
            Err(CompositeError::PercentileRange(101.0))
        );
        assert_eq!(
            MosaicMethod::parse("mean", Some(50.0)),
            Err(CompositeError::PercentileNotAllowed(50.0))
        );
        assert!(MosaicMethod::parse("percentile", Some(0.0)).is_ok());
        assert!(MosaicMethod::parse("percentile", Some(100.0)).is_ok());
    }

    #[test]
    fn test_unknown_method() {
        let err = MosaicMethod::parse("max", None).unwrap_err();
        assert_eq!(err, CompositeError::UnknownMethod("max".to_string()));
        assert!(err.to_string().contains("Invalid mosaic method: max"));
    }
}
