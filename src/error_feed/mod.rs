pub mod parser;
pub mod store;

pub use parser::{parse_build_errors, read_code_snippet, ParsedBuildError};
pub use store::{report_build_errors, report_runtime_error};
