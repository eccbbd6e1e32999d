//! Talking to a single mediator endpoint.

pub mod client;

pub use client::{ClientError, MediatorClient};
