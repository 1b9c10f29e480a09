// Data models (structs)
pub mod history;
pub mod job;
pub mod options;
pub mod result;
pub mod settings;

pub use history::*;
pub use job::*;
pub use options::*;
pub use result::*;
pub use settings::*;
