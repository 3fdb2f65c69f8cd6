//! Artifact generation over one selected function list.
//!
//! Each artifact is an independent task with its own sink (and, for the
//! schema, its own dedup registry). Tasks run concurrently; the first error
//! fails the run while siblings already underway finish and keep their files.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::CompilerError;
use crate::model::Function;
use crate::service::{self, SchemaOptions};

/// Schema file stem used when the package is the catch-all `main`.
pub const DEFAULT_STEM: &str = "procproto";
const GOGO_TIMESTAMP_MAPPING: &str = "Mgoogle/protobuf/timestamp.proto=github.com/gogo/protobuf/types,";

// ------------------------------ Targets ----------------------------------- //

/// `path[:package]` target, e.g. `my/pb:main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgTarget {
    pub path: String,
    pub package: String,
}

impl PkgTarget {
    /// Without an explicit package the last path segment is used.
    pub fn parse(flag: &str) -> Self {
        if let Some((path, package)) = flag.rsplit_once(':') {
            return Self { path: path.to_owned(), package: package.to_owned() };
        }
        let package = flag
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && *s != ".")
            .unwrap_or("main");
        Self { path: flag.to_owned(), package: package.to_owned() }
    }

    pub fn file_stem(&self) -> &str {
        if self.package == "main" { DEFAULT_STEM } else { &self.package }
    }

    pub fn schema_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.path).join(format!("{}.proto", self.file_stem()))
    }

    pub fn manifest_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.path).join(format!("{}.functions.json", self.file_stem()))
    }
}

// ------------------------------ Compiler ---------------------------------- //

/// External schema compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiler {
    pub program: String,
    /// Output backend; rendered as `--<generator>_out=...`.
    pub generator: String,
    /// Search path root and output directory.
    pub base_dir: PathBuf,
    /// Map the well-known timestamp import onto gogo's types package.
    pub gogo_types: bool,
}

impl Compiler {
    pub fn args(&self, schema: &Path) -> Vec<String> {
        let base = self.base_dir.display();
        let mapping = if self.gogo_types { GOGO_TIMESTAMP_MAPPING } else { "" };
        vec![
            format!("--proto_path={base}:."),
            format!("--{}_out={mapping}plugins=grpc:{base}", self.generator),
            schema.display().to_string(),
        ]
    }

    /// Runs the compiler to completion; a non-zero exit is an error carrying
    /// the command line and whatever it wrote to stderr.
    pub fn run(&self, schema: &Path) -> Result<(), CompilerError> {
        let args = self.args(schema);
        info!(program = %self.program, schema = %schema.display(), "invoking schema compiler");
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|source| CompilerError::Spawn { program: self.program.clone(), source })?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            let mut command = vec![self.program.clone()];
            command.extend(args);
            return Err(CompilerError::Failed { command, status: output.status, stderr });
        }
        if !stderr.is_empty() {
            debug!(%stderr, "schema compiler diagnostics");
        }
        Ok(())
    }
}

// ------------------------------- Tasks ------------------------------------ //

pub trait ArtifactTask: Send + Sync {
    fn name(&self) -> &str;
    /// Produces the artifact and returns where it was written.
    fn run(&self) -> Result<PathBuf>;
}

/// Writes the schema file, then optionally compiles it.
pub struct SchemaTask<'a> {
    pub functions: &'a [Function],
    pub options: SchemaOptions,
    pub path: PathBuf,
    pub compiler: Option<Compiler>,
}

impl ArtifactTask for SchemaTask<'_> {
    fn name(&self) -> &str { "schema" }

    fn run(&self) -> Result<PathBuf> {
        info!(file = %self.path.display(), "writing schema");
        let report = write_file(&self.path, |w| {
            service::write_schema(w, self.functions, &self.options).map_err(anyhow::Error::from)
        })?;
        if !report.skipped.is_empty() {
            info!(skipped = ?report.skipped, "functions left out of the schema");
        }
        // The file is complete and closed before the compiler sees it.
        if let Some(compiler) = &self.compiler {
            compiler.run(&self.path)?;
        }
        Ok(self.path.clone())
    }
}

/// Dumps the full (unfiltered) function list as JSON for downstream tools.
pub struct ManifestTask<'a> {
    pub functions: &'a [Function],
    pub path: PathBuf,
}

impl ArtifactTask for ManifestTask<'_> {
    fn name(&self) -> &str { "manifest" }

    fn run(&self) -> Result<PathBuf> {
        info!(file = %self.path.display(), "writing function manifest");
        write_file(&self.path, |w| {
            serde_json::to_writer_pretty(&mut *w, self.functions)?;
            w.write_all(b"\n")?;
            Ok(())
        })?;
        Ok(self.path.clone())
    }
}

/// Runs every task concurrently. Fails with the first error observed.
pub fn run_tasks(tasks: &[Box<dyn ArtifactTask + '_>]) -> Result<Vec<PathBuf>> {
    tasks
        .par_iter()
        .map(|task| task.run().with_context(|| format!("{} task", task.name())))
        .collect()
}

// ------------------------------ Generate ---------------------------------- //

/// Everything one `generate` run needs.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub base_dir: PathBuf,
    pub target: PkgTarget,
    pub options: SchemaOptions,
    pub manifest: bool,
    pub compiler: Option<Compiler>,
}

/// Writes all requested artifacts for `functions` (already selected and
/// sorted) and returns their paths.
pub fn generate(functions: &[Function], request: &GenerateRequest) -> Result<Vec<PathBuf>> {
    let mut tasks: Vec<Box<dyn ArtifactTask + '_>> = Vec::with_capacity(2);
    tasks.push(Box::new(SchemaTask {
        functions,
        options: request.options.clone(),
        path: request.target.schema_path(&request.base_dir),
        compiler: request.compiler.clone(),
    }));
    if request.manifest {
        tasks.push(Box::new(ManifestTask {
            functions,
            path: request.target.manifest_path(&request.base_dir),
        }));
    }
    run_tasks(&tasks)
}

// -------------------------- Internal helpers ------------------------------ //

/// Creates `path` (and its parents), hands a buffered writer to `fill`, then
/// flushes and syncs so a returned `Ok` means the file is complete.
fn write_file<T>(path: &Path, fill: impl FnOnce(&mut BufWriter<File>) -> Result<T>) -> Result<T> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let value = fill(&mut writer).with_context(|| format!("write {}", path.display()))?;
    let file = writer
        .into_inner()
        .map_err(|err| err.into_error())
        .with_context(|| format!("flush {}", path.display()))?;
    file.sync_all().with_context(|| format!("close {}", path.display()))?;
    Ok(value)
}
