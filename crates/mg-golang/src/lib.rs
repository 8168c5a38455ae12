//! Go backend for the MatchGo transpiler: compiles the extended syntax
//! (sum types, `match`, postfix `?`) into plain Go plus a source map.

pub mod ast;
pub mod context;
pub mod hygiene;
pub mod infer;
pub mod parser;
pub mod pipeline;
pub mod preprocess;
pub mod printer;
pub mod transpile;
pub mod types;

pub use context::FileContext;
pub use parser::GoParser;
pub use printer::GoPrinter;
pub use transpile::{transpile_files, transpile_source, TranspileOutput};

#[cfg(test)]
mod tests;
