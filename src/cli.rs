//! Minimal CLI: .api → normalized JSON (single file or batch)
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::error::Error;
use crate::spec::{self, JsonStyle, NormalizedSpec};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// parse go-zero .api files and print their normalized JSON form
#[derive(Parser, Debug)]
#[command(name = "zeroapi-json", version)]
pub struct CommandLineInterface {
    /// One or more .api files. May be literal paths or quoted glob patterns
    ///
    /// More than one input (or any glob pattern) switches to batch output:
    /// one JSON object keyed by file path.
    #[arg(required = true, num_args = 1..)]
    input: Vec<String>,

    /// emit compact JSON instead of two-space indented output
    #[arg(long, default_value_t = false)]
    compact: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// log more on stderr (-v debug, -vv trace); otherwise RUST_LOG, default warn
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// How a run ended when nothing fatal happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    /// Batch mode only: output was written but some files failed.
    SomeFailed,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Install the stderr subscriber. stdout is reserved for JSON.
    pub fn init_logging(&self) {
        let filter = match self.verbose {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            1 => EnvFilter::new("zeroapi_json=debug"),
            _ => EnvFilter::new("zeroapi_json=trace"),
        };
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(filter);

        if tracing_subscriber::registry().with(fmt_layer).try_init().is_err() {
            eprintln!("Warning: tracing subscriber already initialized");
        }
    }

    pub fn style(&self) -> JsonStyle {
        if self.compact { JsonStyle::Compact } else { JsonStyle::Pretty }
    }

    pub fn run(&self) -> anyhow::Result<Outcome> {
        let batch = self.input.len() > 1 || self.input.iter().any(|p| has_glob_chars(p));
        let source_paths = resolve_file_path_patterns(&self.input)?;
        debug!(inputs = source_paths.len(), batch, "resolved inputs");

        if !batch {
            let path = source_paths.into_iter().next().context("no input file given")?;
            let normalized = normalize_file(&path)?;
            self.emit(&normalized.to_json(self.style())?)?;
            return Ok(Outcome::Clean);
        }

        // files are independent; order is restored by collecting in input order
        let results: Vec<(PathBuf, Result<NormalizedSpec, Error>)> = source_paths
            .into_par_iter()
            .map(|path| {
                let result = normalize_file(&path);
                (path, result)
            })
            .collect();

        let mut failed = 0usize;
        let mut by_path = Map::new();
        for (path, result) in results {
            let key = path.display().to_string();
            let value = match result {
                Ok(normalized) => serde_json::to_value(&normalized).map_err(Error::Encode)?,
                Err(error) => {
                    failed += 1;
                    warn!(file = %key, %error, "failed to normalize");
                    json!({ "error": error.to_string() })
                }
            };
            by_path.insert(key, value);
        }

        self.emit(&spec::encode(&Value::Object(by_path), self.style())?)?;
        Ok(if failed > 0 { Outcome::SomeFailed } else { Outcome::Clean })
    }

    fn emit(&self, text: &str) -> Result<(), Error> {
        let Some(out) = self.out.as_ref() else {
            println!("{text}");
            return Ok(());
        };
        if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(out, format!("{text}\n")).map_err(|e| Error::io(out, e))?;
        info!(path = %out.display(), "wrote output");
        Ok(())
    }
}

/// Parse one file and normalize it.
pub fn normalize_file(path: &Path) -> Result<NormalizedSpec, Error> {
    let document = crate::parser::parse_file(path)?;
    Ok(crate::normalize::convert(&document))
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn has_glob_chars(s: &str) -> bool {
    // Minimal glob detection for the `glob` crate syntax.
    s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Error>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            // Treat as a glob pattern
            let entries = glob::glob(pattern)
                .map_err(|e| Error::Glob(format!("invalid glob pattern {pattern:?}: {e}")))?;
            let mut matched_any = false;
            for entry in entries {
                let path = entry.map_err(|e| Error::Glob(e.to_string()))?;
                matched_any = true;
                out.push(path);
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                return Err(Error::Glob(format!("glob pattern matched no files: {pattern}")));
            }
        } else {
            // Treat as a literal path
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
