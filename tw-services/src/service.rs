//! Controller lifecycle.
//!
//! A controller is created idle, started once with `init`, and stopped for
//! good with `shutdown`. Stopping is final: a stopped controller cannot be
//! started again and delivers no further observer callbacks.

use tw_core::error::TwResult;

/// Lifecycle state of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Constructed; triggers fail with `ServiceNotInitialized`.
    Created,
    /// Sequencer running; triggers are accepted.
    Running,
    /// Disposed; triggers fail with `Disposed`.
    Stopped,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle shared by every screen controller.
pub trait Service: Send + Sync {
    /// Workflow name, used in logs and step events.
    fn name(&self) -> &str;

    fn state(&self) -> ServiceState;

    /// Spawn the sequencer. Must be called from within a tokio runtime.
    fn init(&mut self) -> TwResult<()>;

    /// Dispose the controller. Idempotent.
    fn shutdown(&mut self) -> TwResult<()>;

    fn is_healthy(&self) -> bool {
        self.state() == ServiceState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tw_core::error::TwError;

    struct Probe {
        state: ServiceState,
    }

    impl Service for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn state(&self) -> ServiceState {
            self.state
        }

        fn init(&mut self) -> TwResult<()> {
            match self.state {
                ServiceState::Stopped => Err(TwError::Disposed(self.name().into())),
                _ => {
                    self.state = ServiceState::Running;
                    Ok(())
                }
            }
        }

        fn shutdown(&mut self) -> TwResult<()> {
            self.state = ServiceState::Stopped;
            Ok(())
        }
    }

    #[test]
    fn test_stopping_is_final() {
        let mut probe = Probe { state: ServiceState::Created };
        assert!(!probe.is_healthy());

        probe.init().unwrap();
        assert!(probe.is_healthy());

        probe.shutdown().unwrap();
        probe.shutdown().unwrap();
        assert!(matches!(probe.init(), Err(TwError::Disposed(_))));
        assert_eq!(probe.state().to_string(), "stopped");
    }
}
