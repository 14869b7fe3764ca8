pub mod basic_dialect;
pub mod basic_editor;
pub mod basic_interpreter;
pub mod basic_io;
pub mod basic_keyword_registry;
pub mod basic_lexer;
pub mod basic_logging;
pub mod basic_parser;
pub mod basic_runtime;
pub mod basic_types;
pub mod rust_codegen;
pub mod rust_source_builder;
