use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// How a palette is extracted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Median cut, single pass.
    Dominant,
    /// Iterative clustering over the color histogram.
    #[default]
    KMeans,
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dominant" | "d" => Ok(Strategy::Dominant),
            "k-means" | "k" => Ok(Strategy::KMeans),
            other => Err(Error::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Dominant => f.write_str("dominant"),
            Strategy::KMeans => f.write_str("k-means"),
        }
    }
}
