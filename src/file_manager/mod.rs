// JSON state files
pub mod json_ops;

pub use json_ops::*;
