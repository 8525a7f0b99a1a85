pub mod output;
pub mod parse;
pub mod stats;
pub mod validate;

pub use parse::run_parse;
pub use stats::run_stats;
pub use validate::run_validate;
