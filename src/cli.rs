//! CLI: harvested signatures → (schema | generate)
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::input;
use crate::pipeline::{self, Compiler, GenerateRequest, PkgTarget};
use crate::service::{self, SchemaOptions};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// turn harvested stored-procedure signatures into a protobuf service schema
#[derive(Parser, Debug)]
#[command(name = "procproto", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,

    /// verbose logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the schema only; never runs the compiler
    Schema(SchemaOut),
    /// write the schema (and manifest) to disk and compile it
    Generate(GenerateOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// except these functions (comma or space separated)
    #[arg(long)]
    except: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// add ",string" to the JSON tags of numeric fields
    #[arg(long = "number-as-string")]
    number_as_string: bool,

    /// skip functions with missing TableOf info instead of failing
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    skip_missing_table_of: bool,

    /// gogo-compatible output: gogoproto import and json tags
    /// (default: on unless --protoc-gen is "go")
    #[arg(long, action = ArgAction::Set)]
    gogo: Option<bool>,

    /// service name (defaults to the title-cased package)
    #[arg(long)]
    service_name: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// package clause of the schema
    #[arg(long)]
    package: Option<String>,

    /// output .proto file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// base dir for the generated files; also the compiler's search path
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// import path for the schema, optionally with the package name, like "my/pb-pkg:main"
    #[arg(long, default_value = "-:main")]
    pb_out: String,

    /// also write a JSON manifest of every selected function
    #[arg(long)]
    manifest: bool,

    /// schema compiler binary
    #[arg(long, default_value = "protoc")]
    protoc: String,

    /// use protoc-gen-<generator>
    #[arg(long, default_value = "gogofast")]
    protoc_gen: String,

    /// write files only, do not run the compiler
    #[arg(long)]
    no_compile: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> Result<Vec<crate::model::Function>> {
        let functions = input::load_functions(&self.input).context("load harvested functions")?;
        let except = self.except.as_deref().map(input::parse_name_list).unwrap_or_default();
        if !except.is_empty() {
            info!(?except, "excluding functions");
        }
        Ok(input::select_functions(functions, &except))
    }
}

impl SchemaSettings {
    fn options(&self, package: Option<String>, default_gogo: bool) -> SchemaOptions {
        SchemaOptions {
            package,
            service_name: self.service_name.clone(),
            gogo: self.gogo.unwrap_or(default_gogo),
            numbers_as_strings: self.number_as_string,
            skip_missing_table_of: self.skip_missing_table_of,
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Logs go to stderr so schema text on stdout stays clean.
    pub fn init_tracing(&self) {
        let default = if self.verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        // Fails only when a subscriber is already installed, e.g. under tests.
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .ok();
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                let functions = target.input_settings.load()?;
                let options = target.schema_settings.options(target.package.clone(), true);
                match target.out.as_ref() {
                    Some(out) => {
                        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                            std::fs::create_dir_all(parent)
                                .with_context(|| format!("create {}", parent.display()))?;
                        }
                        let file = std::fs::File::create(out)
                            .with_context(|| format!("create {}", out.display()))?;
                        let mut writer = std::io::BufWriter::new(file);
                        service::write_schema(&mut writer, &functions, &options)?;
                        std::io::Write::flush(&mut writer)
                            .with_context(|| format!("write {}", out.display()))?;
                    }
                    None => {
                        let stdout = std::io::stdout();
                        let mut lock = stdout.lock();
                        service::write_schema(&mut lock, &functions, &options)?;
                    }
                }
                Ok(())
            }
            Command::Generate(target) => {
                let functions = target.input_settings.load()?;
                let pb = PkgTarget::parse(&target.pb_out);
                let options = target.schema_settings.options(Some(pb.package.clone()), target.protoc_gen != "go");
                let compiler = (!target.no_compile).then(|| Compiler {
                    program: target.protoc.clone(),
                    generator: target.protoc_gen.clone(),
                    base_dir: target.out_dir.clone(),
                    gogo_types: options.gogo,
                });
                let request = GenerateRequest {
                    base_dir: target.out_dir.clone(),
                    options,
                    target: pb,
                    manifest: target.manifest,
                    compiler,
                };
                for path in pipeline::generate(&functions, &request)? {
                    info!(file = %path.display(), "generated");
                }
                Ok(())
            }
        }
    }
}
