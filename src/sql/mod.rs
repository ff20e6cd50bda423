//! Safe SQL builder: identifiers from model constants only, values as parameters.

mod builder;
pub mod cache;
pub mod params;
pub use builder::*;
pub use cache::{CachedQuery, QueryCache, TemplateCache};
pub use params::*;
