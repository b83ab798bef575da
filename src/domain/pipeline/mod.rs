//! Deferred, short-circuiting composition of async steps

mod diagnostics;
mod single;
mod stream;

pub use diagnostics::{Diagnostics, HookFailure};
pub use single::Pipeline;
pub use stream::PipelineStream;
