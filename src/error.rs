use thiserror::Error;

/// Everything that can go wrong while turning an image into a palette.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no points to cluster")]
    EmptyInput,

    #[error("cannot build {k} clusters from {distinct} distinct points")]
    InvalidClusterCount { k: usize, distinct: usize },

    #[error("cluster {cluster} lost all of its members in iteration {iteration}")]
    EmptyClusterDivideByZero { cluster: usize, iteration: usize },

    #[error("strategy should be dominant or k-means (d or k), got `{0}`")]
    UnknownStrategy(String),

    #[error("color count must be at least 1")]
    InvalidColorCount,

    #[error("convergence threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f64),

    #[error("point {index} has zero weight")]
    ZeroWeight { index: usize },

    #[error("unable to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("PNG encode error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
