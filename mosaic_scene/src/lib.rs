pub mod document;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod writer;

pub use document::*;
pub use error::*;
pub use lexer::*;
pub use parser::*;
pub use writer::*;
