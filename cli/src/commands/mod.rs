pub mod cache;
pub mod consolidate;
pub mod normalize;

pub use cache::*;
pub use consolidate::*;
pub use normalize::*;
