//! Template source implementations

mod file;

pub use file::FileTemplateSource;
