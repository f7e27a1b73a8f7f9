#![forbid(unsafe_code)]

//! Per-observable configuration.

use std::fmt;
use std::rc::Rc;

use crate::error::ListenerFailure;
use crate::observable::ObservableId;

/// Diagnostic sink invoked once per failed listener, after logging.
pub type FailureHook = Rc<dyn Fn(ObservableId, &ListenerFailure)>;

/// Configuration applied when an [`Observable`](crate::Observable) is created.
///
/// # Example
///
/// ```
/// use ftui_reactive::{Observable, ObservableConfig};
///
/// let obs = Observable::with_config(ObservableConfig::new().label("theme"));
/// assert_eq!(obs.label().as_deref(), Some("theme"));
/// ```
#[derive(Clone)]
pub struct ObservableConfig {
    /// Human-readable name carried into log fields.
    pub label: Option<String>,
    /// Emit a `tracing` warning for each listener failure. Default: `true`.
    pub report_failures: bool,
    /// Optional callback receiving each listener failure.
    pub failure_hook: Option<FailureHook>,
}

impl ObservableConfig {
    /// Default configuration: unlabeled, failures logged, no hook.
    #[must_use]
    pub fn new() -> Self {
        Self {
            label: None,
            report_failures: true,
            failure_hook: None,
        }
    }

    /// Set the label used in diagnostics.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Enable or disable failure logging.
    #[must_use]
    pub fn report_failures(mut self, enabled: bool) -> Self {
        self.report_failures = enabled;
        self
    }

    /// Install a failure hook.
    #[must_use]
    pub fn on_failure(mut self, hook: impl Fn(ObservableId, &ListenerFailure) + 'static) -> Self {
        self.failure_hook = Some(Rc::new(hook));
        self
    }
}

impl Default for ObservableConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObservableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableConfig")
            .field("label", &self.label)
            .field("report_failures", &self.report_failures)
            .field("failure_hook", &self.failure_hook.is_some())
            .finish()
    }
}

/// Options for [`ValueObservable::mutate`](crate::ValueObservable::mutate).
///
/// | Constructor | notify | persist | Use |
/// |-------------|--------|---------|-----|
/// | `durable()` (default) | yes | yes | Ordinary state change |
/// | `ephemeral()` | yes | no | One-shot pulse, value reverts after notification |
/// | `silent()` | no | yes | Stage a value without re-rendering |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutateOptions {
    /// Run the notification step.
    pub notify: bool,
    /// Keep the new value after notification. When `false` the prior value
    /// is restored once every listener has run.
    pub persist: bool,
}

impl MutateOptions {
    #[must_use]
    pub const fn durable() -> Self {
        Self {
            notify: true,
            persist: true,
        }
    }

    #[must_use]
    pub const fn ephemeral() -> Self {
        Self {
            notify: true,
            persist: false,
        }
    }

    #[must_use]
    pub const fn silent() -> Self {
        Self {
            notify: false,
            persist: true,
        }
    }
}

impl Default for MutateOptions {
    fn default() -> Self {
        Self::durable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ObservableConfig::default();
        assert!(config.label.is_none());
        assert!(config.report_failures);
        assert!(config.failure_hook.is_none());
        assert_eq!(MutateOptions::default(), MutateOptions::durable());
    }

    #[test]
    fn builder_chain() {
        let config = ObservableConfig::new()
            .label("counter")
            .report_failures(false)
            .on_failure(|_, _| {});
        assert_eq!(config.label.as_deref(), Some("counter"));
        assert!(!config.report_failures);
        assert!(config.failure_hook.is_some());
    }

    #[test]
    fn debug_hides_hook() {
        let config = ObservableConfig::new().on_failure(|_, _| {});
        let debug = format!("{config:?}");
        assert!(debug.contains("failure_hook: true"));
    }

    #[test]
    fn option_presets() {
        assert!(!MutateOptions::ephemeral().persist);
        assert!(MutateOptions::ephemeral().notify);
        assert!(!MutateOptions::silent().notify);
    }
}
