//! `probeplan`: a JVM-style in-process hit-counting probe runtime
//! (`probe`) plus an external planner (`planner`) that infers how to
//! reproduce a specific code path over HTTP and verifies the result,
//! without ever needing the target JVM restarted (SPEC_FULL.md §1).

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod planner;
pub mod probe;
pub mod redact;
pub mod resilience;

pub use error::Error;
