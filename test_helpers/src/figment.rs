//! Wrapper around `figment::Jail` for tests that touch files or environment.
//!
//! The jail gives each test a private working directory and restores the
//! process environment when it finishes. Failures surface as
//! `anyhow::Error` so callers can use `?` throughout.

use std::cell::RefCell;

use anyhow::{Result, anyhow};

/// Executes `f` inside a [`figment::Jail`], returning the closure's output.
///
/// # Errors
///
/// Returns an error if the jail cannot be initialised or the closure fails.
pub fn with_jail<F, T>(f: F) -> Result<T>
where
    F: FnOnce(&mut figment::Jail) -> Result<T>,
{
    let output = RefCell::new(None);
    figment::Jail::try_with(|j| {
        output.replace(Some(f(j)));
        Ok(())
    })
    .map_err(|err| anyhow!(err.to_string()))?;
    output
        .into_inner()
        .unwrap_or_else(|| Err(anyhow!("jail closure did not produce a result")))
}
