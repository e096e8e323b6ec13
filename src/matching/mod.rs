//! Pure matching engine: title normalization, show resolution and
//! episode matching. Nothing in here performs I/O.

pub mod matcher;
pub mod normalize;
pub mod resolver;
pub mod similarity;
pub mod special;
pub mod variations;

pub use matcher::EpisodeMatcher;
pub use normalize::normalize;
pub use resolver::{ShowMatch, ShowMatchKind, ShowResolver, rank_library_titles};
pub use similarity::ratio;
pub use special::SpecialCase;
