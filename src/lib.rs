//! Schema synthesis over a declared type graph.
//!
//! Load a [`ClassIndex`], pick a root [`TypeRef`] and hand both to [`synthesize`]:
//!
//! ```no_run
//! use schemagraph::{ClassIndex, ScanConfig, TypeRef, synthesize};
//!
//! let index = ClassIndex::from_json_str(r#"{ "classes": [
//!     { "name": "com.acme.Pet", "fields": [ { "name": "name", "type": "String" } ] }
//! ] }"#)?;
//! let root: TypeRef = "com.acme.Pet".parse()?;
//! let document = synthesize(&index, &ScanConfig::default(), &root);
//! println!("{}", serde_json::to_string_pretty(&document)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod annotation;
pub mod config;
pub mod error;
pub mod index;
pub mod path_de;
pub mod registry;
pub mod scanner;
pub mod schema;
pub mod substitution;
pub mod types;
pub mod well_known;

pub use config::ScanConfig;
pub use error::{SchemaError, SchemaResult};
pub use index::{ClassIndex, TypeIndex};
pub use registry::SchemaRegistry;
pub use scanner::{Scanner, synthesize, synthesize_all};
pub use schema::{SchemaDocument, SchemaNode, SchemaType};
pub use types::TypeRef;
