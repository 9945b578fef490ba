//! EEG-Core: Foundation types for the band-power streaming pipeline
//!
//! Samples, fixed-size blocks, the five canonical frequency bands and the
//! records that flow out of the pipeline into storage and live subscribers.

pub mod block;
pub mod bands;
pub mod records;
pub mod session;
pub mod error;

pub use block::*;
pub use bands::*;
pub use records::*;
pub use session::*;
pub use error::{EegError, EegResult};
