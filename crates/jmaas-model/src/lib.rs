//! Public value types shared by the jmaas crates.
//!
//! Nothing in here performs I/O: these are the immutable descriptions of a load-test job and the snapshots reported back to callers.

mod domain;
pub use domain::*;

mod error;
pub use error::SpecError;
