//! Storage service REST client and response parsing.

pub mod client;
pub mod xml;

pub use client::{Credentials, RestClient, S3Config};
