//! Fixture-driven regression runner.
//!
//! Every `fixtures/*.json` file describes one scan:
//!
//! ```json
//! { "classes": [ ... ], "roots": ["com.acme.Pet"], "config": { ... },
//!   "expect": { "/components/schemas/Pet/type": "object" } }
//! ```
//!
//! All roots of a fixture share one scanner. Each `expect` key is a JSON pointer into the
//! serialized document.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::Deserialize;
use serde_json::Value;

use schemagraph::index::{ClassIndex, ClassInfo};
use schemagraph::{ScanConfig, Scanner, TypeRef};

/// Pointer → expected value, in file order.
type Expectations = serde_json::Map<String, Value>;

#[derive(Debug, Deserialize)]
struct Fixture {
    classes: Vec<ClassInfo>,
    roots: Vec<TypeRef>,
    #[serde(default)]
    config: ScanConfig,
    expect: Expectations,
}

struct Mismatch {
    pointer: String,
    expected: Value,
    actual: Option<Value>,
}

fn run_fixture(path: &Path) -> Result<Vec<Mismatch>> {
    let source = std::fs::read(path).with_context(|| format!("failed to read fixture ({})", path.display()))?;
    let fixture: Fixture = schemagraph::path_de::from_slice_with_path(&source)
        .with_context(|| format!("failed to decode fixture ({})", path.display()))?;
    let index = ClassIndex::new(fixture.classes)?;

    let mut scanner = Scanner::new(&index, &fixture.config);
    for root in &fixture.roots {
        scanner.synthesize(root);
    }
    let document = serde_json::to_value(scanner.into_document())?;

    let mismatches = fixture
        .expect
        .into_iter()
        .filter_map(|(pointer, expected)| {
            let actual = document.pointer(&pointer).cloned();
            (actual.as_ref() != Some(&expected)).then(|| Mismatch { pointer, expected, actual })
        })
        .collect();
    Ok(mismatches)
}

fn fixture_paths() -> Result<Vec<PathBuf>> {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures"));
    let pattern = dir.join("*.json");
    let pattern = pattern.to_string_lossy();
    let mut paths = glob::glob(&pattern)?.collect::<Result<Vec<_>, _>>()?;
    paths.sort();
    Ok(paths)
}

fn main() -> Result<()> {
    let paths = fixture_paths()?;
    if paths.is_empty() {
        bail!("no fixtures found");
    }

    let mut failed = 0usize;
    for path in &paths {
        let name = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        match run_fixture(path) {
            Ok(mismatches) if mismatches.is_empty() => {
                eprintln!("{} {name}", "✅".green());
            }
            Ok(mismatches) => {
                failed += 1;
                eprintln!("{} {name}", "❌".red());
                for Mismatch { pointer, expected, actual } in mismatches {
                    let actual = actual.map(|v| v.to_string()).unwrap_or_else(|| "<missing>".to_string());
                    eprintln!("   {} expected {} got {}", pointer.bold(), expected.to_string().green(), actual.red());
                }
            }
            Err(error) => {
                failed += 1;
                eprintln!("{} {name}: {error:#}", "❌".red());
            }
        }
    }

    eprintln!("—— {} of {} fixtures passed ——", paths.len() - failed, paths.len());
    if failed > 0 {
        bail!("{failed} fixture(s) failed");
    }
    Ok(())
}
