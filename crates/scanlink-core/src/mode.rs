//! Deployment-mode detection.
//!
//! An instance runs *Networked* when its deployment context names an
//! orchestrator to report to, *Standalone* otherwise. Detection is a pure
//! function of the context, evaluated once at client construction and
//! cached for the instance lifetime; it is never re-evaluated mid-session.

use url::Url;

/// The deployment context a client instance was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentContext {
    /// Orchestrator base address, when one was configured or persisted.
    pub orchestrator_url: Option<Url>,
}

impl DeploymentContext {
    /// Context for a statically hosted copy with no backing service.
    #[must_use]
    pub const fn standalone() -> Self {
        Self {
            orchestrator_url: None,
        }
    }

    /// Context for an instance served alongside an orchestrator.
    #[must_use]
    pub const fn networked(orchestrator_url: Url) -> Self {
        Self {
            orchestrator_url: Some(orchestrator_url),
        }
    }
}

/// How this instance is deployed. Immutable for the instance lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No backing service assumed; scans are acknowledged purely locally.
    Standalone,
    /// A backing service is expected; scans are sent live or queued.
    Networked,
}

impl Mode {
    /// Classify the deployment context. Pure, no error cases.
    #[must_use]
    pub const fn detect(context: &DeploymentContext) -> Self {
        if context.orchestrator_url.is_some() {
            Self::Networked
        } else {
            Self::Standalone
        }
    }

    /// Returns `true` for [`Mode::Standalone`].
    #[inline]
    #[must_use]
    pub const fn is_standalone(self) -> bool {
        matches!(self, Self::Standalone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_orchestrator_means_standalone() {
        let mode = Mode::detect(&DeploymentContext::standalone());
        assert_eq!(mode, Mode::Standalone);
        assert!(mode.is_standalone());
    }

    #[test]
    fn test_orchestrator_url_means_networked() {
        let url = Url::parse("http://orchestrator.local:3000").unwrap();
        let mode = Mode::detect(&DeploymentContext::networked(url));
        assert_eq!(mode, Mode::Networked);
        assert!(!mode.is_standalone());
    }

    #[test]
    fn test_detection_is_idempotent() {
        let context = DeploymentContext::networked(Url::parse("http://10.0.0.2").unwrap());
        assert_eq!(Mode::detect(&context), Mode::detect(&context));

        let context = DeploymentContext::standalone();
        assert_eq!(Mode::detect(&context), Mode::detect(&context));
    }
}
