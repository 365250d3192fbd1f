//! Schema Codegen CLI
//!
//! Compiles schema files into generated artifacts, or checks that the
//! artifacts on disk are up to date.
//!
//! Usage:
//!   schema-codegen schemas/player.yml schemas/guild.xml
//!   schema-codegen --input-dir schemas --strict
//!   schema-codegen --check --format json

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use schema_codegen::compiler::{self, Drift, Leniency, SchemaUnit};
use schema_codegen::{CodegenConfig, CodegenError, Diagnostics, Dialect, TypeResolver};

#[derive(Parser)]
#[command(name = "schema-codegen")]
#[command(about = "Generate record, storage, proto and marshal code from schema files")]
struct Cli {
    /// Schema files to compile (default: every schema under the input directory)
    files: Vec<PathBuf>,

    /// Explicit config file, layered over the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory scanned for .xml/.yml/.yaml schemas
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Output directory for record types and proto glue
    #[arg(long)]
    record_out: Option<PathBuf>,

    /// Output directory for storage descriptors
    #[arg(long)]
    storage_out: Option<PathBuf>,

    /// Output directory for table DDL
    #[arg(long)]
    ddl_out: Option<PathBuf>,

    /// Output directory for .proto definitions
    #[arg(long)]
    proto_out: Option<PathBuf>,

    /// Output directory for tree marshal procedures
    #[arg(long)]
    marshal_out: Option<PathBuf>,

    /// Reject any unit that reports a schema error
    #[arg(long)]
    strict: bool,

    /// Compare against files on disk instead of writing
    #[arg(long)]
    check: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Default, Serialize)]
struct RunReport {
    units: Vec<UnitReport>,
    failures: Vec<String>,
}

#[derive(Debug, Serialize)]
struct UnitReport {
    unit: String,
    source: PathBuf,
    diagnostics: Diagnostics,
    written: Vec<PathBuf>,
    drift: Vec<Drift>,
}

impl RunReport {
    fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.units.iter().all(|u| u.drift.is_empty())
    }

    /// Record a unit that produced no artifacts, keeping whatever it diagnosed
    fn fail_unit(&mut self, unit: &SchemaUnit, file: &Path, err: CodegenError) {
        self.failures.push(format!("{}: {}", file.display(), err));
        let diagnostics = match err {
            CodegenError::Rejected { diagnostics, .. } | CodegenError::Schema { diagnostics, .. } => diagnostics,
            _ => return,
        };
        self.units.push(UnitReport {
            unit: unit.name.clone(),
            source: file.to_path_buf(),
            diagnostics,
            written: Vec::new(),
            drift: Vec::new(),
        });
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = CodegenConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    apply_overrides(&cli, &mut config);

    let files = if cli.files.is_empty() {
        discover(&config.input.dir)
    } else {
        cli.files.clone()
    };
    tracing::info!(count = files.len(), "compiling schema files");

    let resolver = TypeResolver::new();
    let mut report = RunReport::default();

    for file in &files {
        let units = match SchemaUnit::load(file) {
            Ok(units) => units,
            Err(err) => {
                report.failures.push(format!("{}: {}", file.display(), err));
                continue;
            }
        };

        for unit in &units {
            let compiled = match compiler::compile(unit, &resolver, config.policy) {
                Ok(compiled) => compiled,
                Err(err) => {
                    report.fail_unit(unit, file, err);
                    continue;
                }
            };

            let artifacts = match compiler::render(unit, &compiled, &resolver, &config.render) {
                Ok(artifacts) => artifacts,
                Err(err) => {
                    report.failures.push(format!("{}: {}", unit.name, err));
                    continue;
                }
            };

            let mut unit_report = UnitReport {
                unit: unit.name.clone(),
                source: file.clone(),
                diagnostics: compiled.diagnostics,
                written: Vec::new(),
                drift: Vec::new(),
            };

            if cli.check {
                match compiler::check_artifacts(&artifacts, &config.output) {
                    Ok(drift) => unit_report.drift = drift,
                    Err(err) => report.failures.push(err.to_string()),
                }
            } else {
                for outcome in compiler::write_artifacts(&artifacts, &config.output) {
                    match outcome.result {
                        Ok(()) => unit_report.written.push(outcome.path),
                        Err(err) => report.failures.push(err.to_string()),
                    }
                }
            }

            report.units.push(unit_report);
        }
    }

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print_text(&report, cli.check),
    }

    Ok(report.is_clean())
}

fn apply_overrides(cli: &Cli, config: &mut CodegenConfig) {
    if cli.strict {
        config.policy = Leniency::Strict;
    }
    if let Some(dir) = &cli.input_dir {
        config.input.dir = dir.clone();
    }

    let overrides = [
        (&cli.record_out, &mut config.output.record),
        (&cli.storage_out, &mut config.output.storage),
        (&cli.ddl_out, &mut config.output.ddl),
        (&cli.proto_out, &mut config.output.proto),
        (&cli.marshal_out, &mut config.output.marshal),
    ];
    for (flag, target) in overrides {
        if let Some(dir) = flag {
            *target = dir.clone();
        }
    }
}

/// Schema files under `dir`, sorted for a stable run order
fn discover(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| Dialect::from_path(path).is_some())
        .collect();
    files.sort();
    files
}

fn print_text(report: &RunReport, check: bool) {
    for unit in &report.units {
        if !unit.diagnostics.is_empty() {
            print!("{}", unit.diagnostics);
        }
        for path in &unit.written {
            println!("wrote {}", path.display());
        }
        for drift in &unit.drift {
            match drift {
                Drift::Missing { path } => println!("missing {}", path.display()),
                Drift::Changed { path, diff } => {
                    println!("out of date {}", path.display());
                    print!("{}", diff);
                }
            }
        }
    }

    for failure in &report.failures {
        eprintln!("error: {}", failure);
    }

    let drifted: usize = report.units.iter().map(|u| u.drift.len()).sum();
    if check {
        println!(
            "\n{} unit(s) checked, {} artifact(s) out of date, {} failure(s)",
            report.units.len(),
            drifted,
            report.failures.len()
        );
    } else {
        println!("\n{} unit(s) compiled, {} failure(s)", report.units.len(), report.failures.len());
    }
}
