pub mod review;

pub use review::{DedupKey, Review};
