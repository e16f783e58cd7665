pub mod filter;
pub mod model;

pub use filter::{FilterEngine, FilterState, Matcher, QueryDebouncer};
pub use model::{Record, Table};
