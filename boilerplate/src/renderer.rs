//! Rendering entry points used by project scaffolding.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use boilerplate_parser::Namespace;
use tempfile::NamedTempFile;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::{
    config::{self, UserConfig},
    error::Result,
    namespace,
};

/// Renders templates against a fixed configuration snapshot.
#[derive(Debug, Clone)]
pub struct Renderer {
    config: Arc<UserConfig>,
}

impl Renderer {
    pub fn new(config: UserConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// A renderer using the process-wide configuration.
    pub fn global() -> Result<Self> {
        Ok(Self {
            config: config::cached()?,
        })
    }

    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    /// The namespace templates see for a given caller namespace.
    pub fn namespace(&self, caller: &Namespace) -> Namespace {
        namespace::build_with(caller, &self.config)
    }

    /// Renders template text.
    pub fn render(&self, text: &str, caller: &Namespace) -> Result<String> {
        render_merged(text, &self.namespace(caller))
    }

    /// Reads a template file and renders it.
    ///
    /// CRLF line endings are read as LF, so the output uses LF throughout.
    pub fn render_file(&self, path: impl AsRef<Path>, caller: &Namespace) -> Result<String> {
        let text = read_template(path.as_ref())?;
        self.render(&text, caller)
    }

    /// Renders `source` and writes the result to `dest`.
    ///
    /// `dest` is replaced only once the whole output has been written; a
    /// failed render or write leaves no new file behind.
    pub fn copy(&self, source: impl AsRef<Path>, dest: impl AsRef<Path>, caller: &Namespace) -> Result<()> {
        copy_merged(source.as_ref(), dest.as_ref(), &self.namespace(caller))
    }

    /// Renders every file under `source_dir` into the same relative path
    /// under `dest_dir`, creating directories as needed.
    ///
    /// Entries are visited in file name order and the written paths are
    /// returned in that order. The first failure stops the walk.
    pub fn render_directory(
        &self,
        source_dir: impl AsRef<Path>,
        dest_dir: impl AsRef<Path>,
        caller: &Namespace,
    ) -> Result<Vec<PathBuf>> {
        let (source_dir, dest_dir) = (source_dir.as_ref(), dest_dir.as_ref());
        let namespace = self.namespace(caller);
        let mut written = Vec::new();
        for entry in WalkDir::new(source_dir).sort_by_file_name() {
            let entry = entry?;
            let Ok(relative) = entry.path().strip_prefix(source_dir) else {
                continue;
            };
            let target = dest_dir.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else if entry.file_type().is_file() {
                copy_merged(entry.path(), &target, &namespace)?;
                written.push(target);
            } else {
                trace!(path = %entry.path().display(), "skipping non-regular file");
            }
        }
        debug!(
            source = %source_dir.display(),
            dest = %dest_dir.display(),
            files = written.len(),
            "rendered template directory"
        );
        Ok(written)
    }
}

fn render_merged(text: &str, namespace: &Namespace) -> Result<String> {
    Ok(boilerplate_parser::render(text, namespace)?)
}

/// Reads template text with CRLF line endings turned into LF.
fn read_template(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)?;
    if text.contains("\r\n") {
        Ok(text.replace("\r\n", "\n"))
    } else {
        Ok(text)
    }
}

fn copy_merged(source: &Path, dest: &Path, namespace: &Namespace) -> Result<()> {
    let rendered = render_merged(&read_template(source)?, namespace)?;
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(rendered.as_bytes())?;
    file.flush()?;
    fs::set_permissions(file.path(), fs::metadata(source)?.permissions())?;
    file.persist(dest).map_err(|err| err.error)?;
    debug!(
        source = %source.display(),
        dest = %dest.display(),
        bytes = rendered.len(),
        "rendered template"
    );
    Ok(())
}

/// Renders template text with the process-wide configuration.
pub fn render(text: &str, caller: &Namespace) -> Result<String> {
    Renderer::global()?.render(text, caller)
}

/// Renders a template file with the process-wide configuration.
pub fn render_file(path: impl AsRef<Path>, caller: &Namespace) -> Result<String> {
    Renderer::global()?.render_file(path, caller)
}

/// Renders `source` into `dest` with the process-wide configuration.
pub fn copy(source: impl AsRef<Path>, dest: impl AsRef<Path>, caller: &Namespace) -> Result<()> {
    Renderer::global()?.copy(source, dest, caller)
}

/// Renders a template directory with the process-wide configuration.
pub fn render_directory(
    source_dir: impl AsRef<Path>,
    dest_dir: impl AsRef<Path>,
    caller: &Namespace,
) -> Result<Vec<PathBuf>> {
    Renderer::global()?.render_directory(source_dir, dest_dir, caller)
}
