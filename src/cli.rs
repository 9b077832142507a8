//! Minimal CLI: class index → (schema document | property listing)
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use schemagraph::index::ClassIndex;
use schemagraph::scanner::resolver::{Property, SiteSlot};
use schemagraph::{ScanConfig, Scanner, TypeRef};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// synthesize JSON schemas from a declared type graph (JSON class index)
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// log scan progress to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// synthesize and print the schema document
    Schema(SchemaOut),
    /// print the resolved properties of one type
    Properties(PropertiesOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more class index files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// scan configuration (.json); defaults apply to missing keys
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// root type signatures, e.g. 'com.acme.Pair<String, Integer>'
    #[arg(long, num_args = 1.., required = true)]
    root: Vec<String>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// one independent scan (and registry) per root; emits an array of documents
    #[arg(long, default_value_t = false)]
    separate: bool,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct PropertiesOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// type signature to resolve
    #[arg(long = "type")]
    type_signature: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_index(&self) -> Result<ClassIndex> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut index = ClassIndex::default();
        for source_path in source_paths {
            let source = std::fs::read(&source_path)
                .with_context(|| format!("failed to read class index ({})", source_path.display()))?;
            let part = ClassIndex::from_json_slice(&source)
                .with_context(|| format!("failed to decode class index ({})", source_path.display()))?;
            index.extend(part);
        }
        Ok(index)
    }

    fn load_config(&self) -> Result<ScanConfig> {
        match self.config.as_ref() {
            None => Ok(ScanConfig::default()),
            Some(path) => {
                ScanConfig::load(path).with_context(|| format!("failed to load config ({})", path.display()))
            }
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                // 1) load inputs
                let index = target.input_settings.load_index()?;
                let config = target.input_settings.load_config()?;
                let roots = parse_signatures(&target.root)?;

                // 2) scan
                let output = if target.separate {
                    let documents = schemagraph::synthesize_all(&index, &config, &roots);
                    serde_json::to_string_pretty(&documents)?
                } else {
                    let mut scanner = Scanner::new(&index, &config);
                    for root in &roots {
                        scanner.synthesize(root);
                    }
                    serde_json::to_string_pretty(&scanner.into_document())?
                };

                // 3) emit
                write_output(target.out.as_deref(), &output)
            }
            Command::Properties(target) => {
                let index = target.input_settings.load_index()?;
                let config = target.input_settings.load_config()?;
                let ty: TypeRef = target.type_signature.parse()?;
                let mut scanner = Scanner::new(&index, &config);
                let Some(properties) = scanner.properties(&ty) else {
                    bail!("type not found in index: {ty}");
                };
                for property in &properties {
                    println!("{}", render_property(property));
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn parse_signatures(signatures: &[String]) -> Result<Vec<TypeRef>> {
    signatures
        .iter()
        .map(|s| s.parse::<TypeRef>().with_context(|| format!("invalid root signature: {s}")))
        .collect()
}

fn write_output(out: Option<&Path>, source: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create output directory ({})", parent.display()))?;
            }
            std::fs::write(out, source).with_context(|| format!("failed to write output ({})", out.display()))
        }
        None => {
            println!("{source}");
            Ok(())
        }
    }
}

fn render_property(property: &Property<'_>) -> String {
    let sites = property
        .sites()
        .map(|(slot, site)| {
            let slot = match slot {
                SiteSlot::Field => "field",
                SiteSlot::Accessor => "get",
                SiteSlot::Mutator => "set",
            };
            format!("{slot}:{}.{}", site.declaring_class().name, site.name())
        })
        .collect::<Vec<_>>()
        .join(", ");
    let mut line = format!(
        "{} : {}  {}",
        property.name().bold(),
        property.resolved_type().to_string().cyan(),
        format!("[{sites}]").dimmed(),
    );
    if property.is_ignored() {
        line.push_str(&format!("  {}", "ignored".red()));
    } else if property.is_read_only() {
        line.push_str(&format!("  {}", "read-only".yellow()));
    } else if property.is_write_only() {
        line.push_str(&format!("  {}", "write-only".yellow()));
    }
    line
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
