//! Asynchronous front of the transfer engine
//!
//! The engine itself is synchronous; these components drive it from a tokio
//! runtime:
//!
//! - **TransferService**: runs one request on the blocking pool under a deadline
//! - **BatchProcessor**: runs batches concurrently, ordered per account

pub mod batch_processor;
pub mod service;

pub use batch_processor::{BatchProcessor, ProcessingResult, SequencedRequest};
pub use service::TransferService;
