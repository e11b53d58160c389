//! Indexer pipeline: find source files, parse them, extract class/method
//! structure and hand the records to the graph layer.

pub mod csharp;
pub mod discover;
pub mod extractor;
pub mod java;
pub mod parser;
pub mod pipeline;

pub use extractor::{extract_file, extractor_for, StructureExtractor};
pub use parser::CodeParser;
pub use pipeline::{Pipeline, PipelineOptions, PipelineReport};
