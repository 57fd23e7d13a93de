//! Renders the bundled templates into a new project directory.
//!
//! ```text
//! example [NAME] [DEST]
//! ```

use std::{env, path::PathBuf};

use anyhow::Context;
use boilerplate::{Namespace, config};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[cfg(test)]
mod test;

fn templates_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates")
}

fn plan(name: &str) -> Namespace {
    Namespace::new()
        .with("name", name)
        .with("desc", format!("{name}, generated from templates"))
        .with("license", "MIT")
        .with("tests", true)
        .with("deps", vec!["requests"])
}

fn namespace(name: &str) -> Namespace {
    // replaced by the user configuration when it sets `author`
    Namespace::new()
        .with("author", "Unknown author")
        .with("plan", plan(name))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "demo".to_string());
    let dest = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(&name));

    let user = config::cached()?;
    let missing = user.missing_fields();
    if !missing.is_empty() {
        warn!(?missing, "user configuration is incomplete");
    }

    let templates = templates_dir();
    let written = boilerplate::render_directory(&templates, &dest, &namespace(&name))
        .with_context(|| format!("rendering {} into {}", templates.display(), dest.display()))?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
