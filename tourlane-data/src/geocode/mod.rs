//! Free-text query to coordinate resolution.
//!
//! [`normalise_query`] produces the cache key, [`KeywordScoring`] ranks
//! keyword hits and [`CoordinateResolver`] runs the cascade.

mod normalise;
mod resolver;
mod scoring;

pub use normalise::{normalise_query, strip_parenthetical};
pub use resolver::CoordinateResolver;
pub use scoring::KeywordScoring;
