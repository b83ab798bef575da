//! Prompt templates with typed placeholders

mod cache;
mod loader;
mod rendered;
mod source;
mod template;
mod value;

pub use cache::TemplateCache;
pub use loader::PromptTemplate;
pub use rendered::Rendered;
pub use source::{InlineTemplateSource, TemplateSource};
pub use template::{ParsedTemplate, Placeholder};
pub use value::{TemplateValue, ValueType};
