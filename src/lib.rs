//! Load Doppler secrets into the process environment at startup, with an
//! encrypted local fallback for when the API cannot be reached.
//!
//! ```no_run
//! # async fn startup() -> Result<(), doppler_bootstrap::BootstrapError> {
//! doppler_bootstrap::load_secrets().await?;
//! // ... continue initialising with the populated environment
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod logging;
pub mod secrets;

pub use secrets::{load_secrets, load_secrets_blocking, BootstrapError, LoadOutcome};
