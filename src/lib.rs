//! OpenAPI from annotations - OpenAPI documentation from Go annotation comments.
//!
//! Annotation comments (`// @<key> <args>`) declare the API once in a
//! main file and every endpoint next to its handler. The library collects
//! them and renders an OpenAPI 3.0.2 YAML document.
//!
//! # Architecture
//!
//! Each stage consumes the output of the previous one:
//!
//! 1. [`extractor`] - Collects annotation blocks from Go source files
//! 2. [`type_resolver`] - Expands body and response type references into field annotations, using [`parser`]
//! 3. [`tokenizer`] - Turns annotation lines into key/meta tokens
//! 4. [`subrouter`] - Prefixes routes registered on nested router mounts
//! 5. [`openapi_builder`] - Renders the document, with [`transform`] and [`schema_generator`]
//!
//! [`scanner`] finds the endpoint files, [`serializer`] writes the output and
//! [`pipeline`] runs the stages in order.
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_annotations::pipeline::{self, Config, OutputFormat};
//! use std::path::PathBuf;
//!
//! let config = Config {
//!     main_file: PathBuf::from("main.go"),
//!     endpoints_root: PathBuf::from("."),
//!     output_dir: PathBuf::from("docs/api"),
//!     source_root: PathBuf::from("/go/src"),
//!     format: OutputFormat::Yaml,
//!     verbose: false,
//! };
//!
//! let yaml = pipeline::build_document(&config).unwrap();
//! println!("{}", yaml);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod error;
pub mod extractor;
pub mod openapi_builder;
pub mod parser;
pub mod pipeline;
pub mod scanner;
pub mod schema_generator;
pub mod serializer;
pub mod subrouter;
pub mod tokenizer;
pub mod transform;
pub mod type_resolver;
