// ufcgen — UFCx integral code generator
//
// Library root. `codegen::generate_integral` is the per-integral entry
// point; `pipeline` drives whole input documents with the reference
// lowering (`lowered`) and formatter (`cformat`).

pub mod cformat;
pub mod codegen;
pub mod diag;
pub mod dispatch;
pub mod file;
pub mod ir;
pub mod kernel;
pub mod lexer;
pub mod lowered;
pub mod metadata;
pub mod options;
pub mod parser;
pub mod partition;
pub mod pipeline;
pub mod template;
