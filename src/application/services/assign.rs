//! Document assignment service
//!
//! Loads a task tree document, assigns leaf estimates and writes the result
//! beside the input (or wherever the caller asks).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{assign_scoped, AssignReport, Node};
use crate::infrastructure::traits::FileSystem;

const DOCUMENT_EXTENSION: &str = "json";

/// Result of assigning one document.
#[derive(Debug, Clone)]
pub struct AssignOutcome {
    /// The assigned tree
    pub root: Node,
    /// What the run did
    pub report: AssignReport,
    /// Where the tree was written; None for dry runs
    pub output: Option<PathBuf>,
}

/// Service for assigning time estimates to task tree documents.
pub struct AssignService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl AssignService {
    /// Create a new assign service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Whether `path` names a `.json` document (case-insensitive).
    pub fn is_document(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
    }

    /// Read and parse a task tree document.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, input: &Path) -> ApplicationResult<Node> {
        if !Self::is_document(input) {
            return Err(ApplicationError::UnsupportedInput(input.to_path_buf()));
        }
        if !self.fs.exists(input) {
            return Err(ApplicationError::OperationFailed {
                context: format!("file not found: {}", input.display()),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "file does not exist",
                )),
            });
        }
        let content = self
            .fs
            .read_to_string(input)
            .with_path_context("read document", input)?;
        let root = Node::parse(&content)?;
        debug!("loaded {} top-level nodes", root.children.len());
        Ok(root)
    }

    /// `<dir>/<stem>-<suffix>.json` beside the input.
    pub fn default_output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!(
            "{}-{}.{}",
            stem, self.settings.output_suffix, DOCUMENT_EXTENSION
        );
        match input.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Assign estimates in place using the configured scope.
    pub fn assign(&self, root: &mut Node) -> AssignReport {
        assign_scoped(root, self.settings.scope)
    }

    /// Serialize and write the tree.
    #[instrument(level = "debug", skip(self, root))]
    pub fn write(&self, root: &Node, output: &Path) -> ApplicationResult<()> {
        let content = root.to_json(self.settings.pretty)?;
        self.fs
            .ensure_parent(output)
            .with_path_context("create directory for", output)?;
        self.fs
            .write(output, &content)
            .with_path_context("write document", output)?;
        Ok(())
    }

    /// Load, assign and (unless `dry_run`) write a document.
    #[instrument(level = "debug", skip(self))]
    pub fn run(
        &self,
        input: &Path,
        output: Option<&Path>,
        dry_run: bool,
    ) -> ApplicationResult<AssignOutcome> {
        let mut root = self.load(input)?;
        let report = self.assign(&mut root);

        let output = if dry_run {
            None
        } else {
            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.default_output_path(input));
            self.write(&root, &path)?;
            info!("wrote {}", path.display());
            Some(path)
        };

        Ok(AssignOutcome {
            root,
            report,
            output,
        })
    }
}
