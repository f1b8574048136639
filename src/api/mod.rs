mod client;
pub mod types;

pub use client::{split_batch_input, ApiClient, ApiError};
