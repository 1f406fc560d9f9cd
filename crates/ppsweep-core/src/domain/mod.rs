//! Domain models for ppsweep.
//!
//! - `FilterSpec` / `ParameterAssignment`: what to sweep
//! - `StreamRef`: what to feed the engine
//! - `SweepError`: everything that can go wrong while planning or parsing

pub mod digest;
pub mod error;
pub mod filter;
pub mod stream;

pub use digest::commands_digest;
pub use error::{Result, SweepError};
pub use filter::{FilterSpec, ParamSpec, ParamValue, ParameterAssignment};
pub use stream::{StreamKind, StreamRef};
