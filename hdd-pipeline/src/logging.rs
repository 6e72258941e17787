/// Log target handed to an orchestrator or runner at construction, so the
/// lines of each source can be filtered separately (`RUST_LOG=hdd::ecmwf=debug`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    target: String,
}

impl LogContext {
    pub fn new(target: impl Into<String>) -> Self {
        LogContext {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Context for a named child, e.g. `hdd` -> `hdd::ecmwf`.
    pub fn child(&self, name: &str) -> Self {
        LogContext::new(format!("{}::{name}", self.target))
    }
}

impl Default for LogContext {
    fn default() -> Self {
        LogContext::new("hdd")
    }
}

#[cfg(test)]
mod tests {
    use super::LogContext;

    #[test]
    fn child_targets_nest() {
        let root = LogContext::default();
        assert_eq!(root.child("era5_land").target(), "hdd::era5_land");
    }
}
