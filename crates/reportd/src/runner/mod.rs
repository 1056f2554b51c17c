//! External report scripts: interpreter lookup, process execution and the
//! argument contract of each script.

pub mod error;
pub mod interpreter;
pub mod process;
pub mod scripts;

pub use error::ProcessError;
pub use interpreter::resolve_interpreter;
pub use process::{Invocation, ProcessExecutor, TokioProcessExecutor};
pub use scripts::{parse_generation_output, FileSize, GenerationResult, ScriptRunner};
