use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Completion callback for a staging attempt: `(success, message)`.
pub type ReadyFn = Box<dyn FnOnce(bool, String) + Send>;

/// Marker written after a staged copy completes, so a copy interrupted
/// half-way is retried rather than trusted.
const COMPLETE_MARKER: &str = ".complete";

/// How model assets become loadable on this platform.
///
/// The host only ever sees the callback contract; an implementation that
/// needs no work simply invokes the callback synchronously.
pub trait ModelReadiness: Send + Sync {
    /// The path sessions should load this model from, or `None` when the
    /// source assets are absent altogether.
    fn model_path(&self, recognizer: &str, model_folder: &str) -> Option<PathBuf>;

    /// Whether the model at `model_path` is usable right now.
    fn is_staged(&self, recognizer: &str, model_folder: &str) -> bool;

    /// Materialize the model, then invoke `done(success, message)`. With
    /// `block` the callback runs before `stage` returns.
    fn stage(&self, recognizer: &str, model_folder: &str, block: bool, done: ReadyFn);
}

fn model_subpath(root: &Path, recognizer: &str, model_folder: &str) -> PathBuf {
    root.join(recognizer).join("models").join(model_folder)
}

/// Desktop-style readiness: models are loose files, usable in place.
pub struct ImmediateReadiness {
    model_root: PathBuf,
}

impl ImmediateReadiness {
    pub fn new(model_root: impl Into<PathBuf>) -> Self {
        Self {
            model_root: model_root.into(),
        }
    }
}

impl ModelReadiness for ImmediateReadiness {
    fn model_path(&self, recognizer: &str, model_folder: &str) -> Option<PathBuf> {
        let path = model_subpath(&self.model_root, recognizer, model_folder);
        path.is_dir().then_some(path)
    }

    fn is_staged(&self, recognizer: &str, model_folder: &str) -> bool {
        self.model_path(recognizer, model_folder).is_some()
    }

    fn stage(&self, recognizer: &str, model_folder: &str, _block: bool, done: ReadyFn) {
        let staged = self.is_staged(recognizer, model_folder);
        let message = if staged {
            String::new()
        } else {
            format!("model folder missing: {recognizer}/models/{model_folder}")
        };
        done(staged, message);
    }
}

/// Readiness for platforms where models ship inside a read-only source tree
/// and must be copied somewhere writable before the backend can open them.
pub struct CopyStagedReadiness {
    source_root: PathBuf,
    staged_root: PathBuf,
}

impl CopyStagedReadiness {
    pub fn new(source_root: impl Into<PathBuf>, staged_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            staged_root: staged_root.into(),
        }
    }

    fn run_copy(source: &Path, destination: &Path) -> io::Result<()> {
        copy_dir_recursive(source, destination)?;
        fs::write(destination.join(COMPLETE_MARKER), b"ok")
    }
}

impl ModelReadiness for CopyStagedReadiness {
    fn model_path(&self, recognizer: &str, model_folder: &str) -> Option<PathBuf> {
        // Sessions load from the staged location, which may not be copied
        // yet; availability is decided by the source assets existing
        let source = model_subpath(&self.source_root, recognizer, model_folder);
        source
            .is_dir()
            .then(|| model_subpath(&self.staged_root, recognizer, model_folder))
    }

    fn is_staged(&self, recognizer: &str, model_folder: &str) -> bool {
        model_subpath(&self.staged_root, recognizer, model_folder)
            .join(COMPLETE_MARKER)
            .is_file()
    }

    fn stage(&self, recognizer: &str, model_folder: &str, block: bool, done: ReadyFn) {
        let source = model_subpath(&self.source_root, recognizer, model_folder);
        let destination = model_subpath(&self.staged_root, recognizer, model_folder);

        let work = move || {
            tracing::info!(
                from = %source.display(),
                to = %destination.display(),
                "staging model"
            );
            match Self::run_copy(&source, &destination) {
                Ok(()) => done(true, String::new()),
                Err(error) => {
                    tracing::error!(%error, "model staging failed");
                    done(false, error.to_string());
                }
            }
        };

        if block {
            work();
        } else {
            std::thread::Builder::new()
                .name("lexis-model-stage".into())
                .spawn(work)
                .expect("failed to spawn model staging thread");
        }
    }
}

/// Copy `source` into `destination`, skipping files that already exist so a
/// partially-staged model resumes instead of restarting.
fn copy_dir_recursive(source: &Path, destination: &Path) -> io::Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else if !target.exists() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
