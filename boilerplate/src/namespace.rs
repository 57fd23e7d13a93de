//! Namespace construction.
//!
//! Every render evaluates against one merged namespace. Sources are layered
//! lowest to highest:
//!
//! 1. the caller's namespace
//! 2. built-in values (`year`)
//! 3. the persistent user configuration
//!
//! A caller value whose name collides with a built-in or a configuration key
//! is silently replaced, so callers should pick names that don't collide.

use boilerplate_parser::Namespace;
use chrono::{Datelike, Local};

use crate::{
    config::{self, UserConfig},
    error::Result,
};

/// Name of the built-in holding the current calendar year
pub const YEAR: &str = "year";

/// Values available to every template regardless of caller or configuration.
pub fn builtins() -> Namespace {
    Namespace::new().with(YEAR, Local::now().year().to_string())
}

/// Merges `caller` with the built-ins and the process-wide configuration.
pub fn build(caller: &Namespace) -> Result<Namespace> {
    let config = config::cached()?;
    Ok(build_with(caller, &config))
}

/// Merges `caller` with the built-ins and an explicit configuration.
pub fn build_with(caller: &Namespace, config: &UserConfig) -> Namespace {
    let mut namespace = caller.clone();
    namespace.merge(&builtins());
    namespace.extend(config.iter());
    namespace
}
