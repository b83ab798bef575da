use std::fmt;

/// A side-effect hook that failed without aborting its pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub hook: &'static str,
    pub message: String,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.hook, self.message)
    }
}

/// Hook failures collected by `on_each_reported`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    failures: Vec<HookFailure>,
}

impl Diagnostics {
    pub fn record(&mut self, hook: &'static str, message: impl Into<String>) {
        self.failures.push(HookFailure {
            hook,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[HookFailure] {
        &self.failures
    }
}
