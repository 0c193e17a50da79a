//! Wayline Values
//!
//! Reference-counted value tree shared by search parameters and location
//! state, plus the structural merge that keeps unchanged subtrees
//! identical across navigations.

mod merge;
mod value;

pub use merge::{merge_search, replace_equal_deep};
pub use value::{Map, Opaque, Search, Value};
