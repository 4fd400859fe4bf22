mod client;

pub use client::{IdxClient, parse_idx};
