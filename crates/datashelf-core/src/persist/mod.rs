//! JSON persistence helpers shared by the store and the HTTP layer.

mod atomic;

pub use atomic::{read_json, to_pretty_json, write_json};
