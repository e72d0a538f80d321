//! Compensating file primitives.
//!
//! Each primitive is a [`Work`] whose `run` changes the filesystem in a way
//! its `rollback` can undo exactly, and whose `commit` discards the saved
//! state. Intermediate files are hidden siblings of the target so renames
//! stay on one filesystem.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AtticError, Result};
use crate::model::VersionContent;
use crate::tx::{ResourceContext, ResourceKind, UnitOfWork, Work};

/// Supplies the bytes of a file being saved.
pub trait StreamProvider {
    fn write_to(&self, out: &mut dyn Write) -> Result<()>;
}

impl StreamProvider for Vec<u8> {
    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        out.write_all(self)?;
        Ok(())
    }
}

impl StreamProvider for VersionContent {
    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        match self {
            Self::Loaded(bytes) => out.write_all(bytes)?,
            Self::OnDisk(path) => {
                let mut file = File::open(path)?;
                std::io::copy(&mut file, out)?;
            }
        }
        Ok(())
    }
}

/// Serializes a value as pretty JSON when the file is written.
pub struct JsonStream<T>(pub T);

impl<T: serde::Serialize> StreamProvider for JsonStream<T> {
    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(out, &self.0)?;
        Ok(())
    }
}

fn hidden_sibling(target: &Path, tag: &str) -> PathBuf {
    let name = target
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    target.with_file_name(format!(".{name}~{}.{tag}", Uuid::new_v4().simple()))
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn prune_if_empty(dir: Option<&Path>) {
    if let Some(dir) = dir {
        // Fails harmlessly while siblings remain.
        let _ = fs::remove_dir(dir);
    }
}

/// Create `dir` and its missing ancestors, returning the ones created, deepest first.
fn create_dirs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|d| !d.as_os_str().is_empty() && !d.exists())
        .map(Path::to_path_buf)
        .collect();
    fs::create_dir_all(dir)?;
    Ok(missing)
}

/// Writes a file, keeping any previous version until commit.
///
/// `run` writes to a temp file, moves an existing target aside and renames
/// the temp file into place. `rollback` removes what was written and puts
/// the previous file back.
pub struct FileSaver {
    target: PathBuf,
    source: Box<dyn StreamProvider>,
    exclusive: bool,
    created_dirs: Vec<PathBuf>,
    temp: Option<PathBuf>,
    backup: Option<PathBuf>,
    installed: bool,
}

impl FileSaver {
    pub fn new(target: impl Into<PathBuf>, source: impl StreamProvider + 'static) -> Self {
        Self {
            target: target.into(),
            source: Box::new(source),
            exclusive: false,
            created_dirs: Vec::new(),
            temp: None,
            backup: None,
            installed: false,
        }
    }

    /// Fail instead of replacing an existing target.
    #[must_use]
    pub const fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn into_unit(self, requires: ResourceKind) -> UnitOfWork {
        let label = format!("save {}", self.target.display());
        UnitOfWork::new(label, requires, self)
    }

    fn write_temp(&mut self) -> Result<PathBuf> {
        let temp = hidden_sibling(&self.target, "tmp");
        self.temp = Some(temp.clone());

        let mut file = File::create(&temp)?;
        {
            let mut writer = BufWriter::new(&mut file);
            self.source.write_to(&mut writer)?;
            writer.flush()?;
        }
        file.sync_all()?;
        Ok(temp)
    }
}

impl Work for FileSaver {
    fn pre_run(&mut self) -> Result<()> {
        if self.target.is_dir() {
            return Err(AtticError::StorageCorrupted(format!(
                "cannot save file over directory {}",
                self.target.display()
            )));
        }
        Ok(())
    }

    fn run(&mut self, _ctx: &mut dyn ResourceContext) -> Result<()> {
        if let Some(parent) = self.target.parent() {
            self.created_dirs = create_dirs(parent)?;
        }
        if self.exclusive && self.target.exists() {
            return Err(AtticError::StorageCorrupted(format!(
                "{} already exists",
                self.target.display()
            )));
        }
        let temp = self.write_temp()?;

        if self.target.exists() {
            let backup = hidden_sibling(&self.target, "bak");
            fs::rename(&self.target, &backup)?;
            self.backup = Some(backup);
        }
        fs::rename(&temp, &self.target)?;
        self.temp = None;
        self.installed = true;
        debug!(path = %self.target.display(), "saved file");
        Ok(())
    }

    fn commit(&mut self) {
        self.created_dirs.clear();
        if let Some(backup) = self.backup.take() {
            if let Err(err) = remove_path(&backup) {
                warn!(path = %backup.display(), error = %err, "could not remove backup");
            }
        }
    }

    fn rollback(&mut self) -> Result<()> {
        if let Some(temp) = self.temp.take() {
            remove_path(&temp)?;
        }
        if self.installed {
            remove_path(&self.target)?;
            self.installed = false;
        }
        if let Some(backup) = self.backup.take() {
            fs::rename(&backup, &self.target)?;
        }
        for dir in self.created_dirs.drain(..) {
            prune_if_empty(Some(&dir));
        }
        Ok(())
    }
}

/// Deletes a file or directory by moving it aside until commit.
pub struct FileDeleter {
    target: PathBuf,
    moved: Option<PathBuf>,
}

impl FileDeleter {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            moved: None,
        }
    }

    pub fn into_unit(self, requires: ResourceKind) -> UnitOfWork {
        let label = format!("delete {}", self.target.display());
        UnitOfWork::new(label, requires, self)
    }
}

impl Work for FileDeleter {
    fn run(&mut self, _ctx: &mut dyn ResourceContext) -> Result<()> {
        match fs::symlink_metadata(&self.target) {
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.target.display(), "nothing to delete");
                Ok(())
            }
            Err(err) => Err(err.into()),
            Ok(_) => {
                let aside = hidden_sibling(&self.target, "del");
                fs::rename(&self.target, &aside)?;
                self.moved = Some(aside);
                debug!(path = %self.target.display(), "moved file aside for deletion");
                Ok(())
            }
        }
    }

    fn commit(&mut self) {
        if let Some(aside) = self.moved.take() {
            if let Err(err) = remove_path(&aside) {
                warn!(path = %aside.display(), error = %err, "could not remove deleted file");
            }
            prune_if_empty(self.target.parent());
        }
    }

    fn rollback(&mut self) -> Result<()> {
        if let Some(aside) = self.moved.take() {
            fs::rename(&aside, &self.target)?;
        }
        Ok(())
    }
}
