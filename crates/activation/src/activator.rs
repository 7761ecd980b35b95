//! Hand-off into an installed capability

use async_trait::async_trait;
use crikstats_config::Config;
use crikstats_delivery::ModuleDeliveryService;
use crikstats_errors::ActivationError;
use crikstats_types::{ModuleId, SubjectId};
use std::sync::Arc;

/// Enters a capability for a subject once its module is available
#[async_trait]
pub trait Activator: Send + Sync {
    /// Perform the hand-off.
    ///
    /// # Errors
    ///
    /// Returns an error if the capability cannot be entered.
    async fn activate(&self, subject: &SubjectId) -> Result<(), ActivationError>;
}

#[async_trait]
impl<T: Activator + ?Sized> Activator for Arc<T> {
    async fn activate(&self, subject: &SubjectId) -> Result<(), ActivationError> {
        (**self).activate(subject).await
    }
}

/// What an [`EntryPointActivator`] asks its launcher to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub module: ModuleId,
    pub entry_point: String,
    pub subject: SubjectId,
}

/// Opens an entry point; an `Err` carries a human-readable reason
pub type Launcher = Arc<dyn Fn(&LaunchRequest) -> Result<(), String> + Send + Sync>;

/// Activator that launches a named entry point of a delivered module
pub struct EntryPointActivator {
    delivery: Arc<dyn ModuleDeliveryService>,
    module: ModuleId,
    entry_point: String,
    launcher: Launcher,
}

impl EntryPointActivator {
    pub fn new(
        delivery: Arc<dyn ModuleDeliveryService>,
        module: impl Into<ModuleId>,
        entry_point: impl Into<String>,
        launcher: Launcher,
    ) -> Self {
        Self {
            delivery,
            module: module.into(),
            entry_point: entry_point.into(),
            launcher,
        }
    }

    /// Activator for the configured feature module and entry point
    #[must_use]
    pub fn from_config(
        delivery: Arc<dyn ModuleDeliveryService>,
        config: &Config,
        launcher: Launcher,
    ) -> Self {
        Self::new(
            delivery,
            config.delivery.feature_module_id(),
            config.activation.entry_point.clone(),
            launcher,
        )
    }

    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }
}

#[async_trait]
impl Activator for EntryPointActivator {
    async fn activate(&self, subject: &SubjectId) -> Result<(), ActivationError> {
        // the entry point only resolves once the module is on the device
        if !self.delivery.installed_modules().contains(&self.module) {
            return Err(ActivationError::EntryPointUnreachable {
                module: self.module.to_string(),
                entry_point: self.entry_point.clone(),
            });
        }

        let request = LaunchRequest {
            module: self.module.clone(),
            entry_point: self.entry_point.clone(),
            subject: subject.clone(),
        };
        tracing::debug!(module = %self.module, entry_point = %self.entry_point, %subject, "launching entry point");
        (self.launcher)(&request).map_err(|message| ActivationError::Failed {
            subject: subject.to_string(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crikstats_delivery::SimulatedDeliveryService;
    use std::sync::Mutex;

    #[tokio::test]
    async fn unreachable_until_installed() {
        let service = SimulatedDeliveryService::new();
        let launched = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&launched);
        let activator = EntryPointActivator::new(
            Arc::new(service.clone()),
            "feature_player",
            "PlayerStatsActivity",
            Arc::new(move |request: &LaunchRequest| {
                sink.lock().unwrap().push(request.clone());
                Ok(())
            }),
        );

        let subject = SubjectId::from("player-42");
        let err = activator.activate(&subject).await.unwrap_err();
        assert!(matches!(err, ActivationError::EntryPointUnreachable { .. }));
        assert!(launched.lock().unwrap().is_empty());

        service.mark_installed("feature_player");
        activator.activate(&subject).await.unwrap();

        let launched = launched.lock().unwrap();
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].subject, subject);
        assert_eq!(launched[0].entry_point, "PlayerStatsActivity");
    }

    #[tokio::test]
    async fn launcher_error_becomes_failed() {
        let service = SimulatedDeliveryService::new();
        service.mark_installed("feature_player");
        let activator = EntryPointActivator::from_config(
            Arc::new(service),
            &Config::default(),
            Arc::new(|_: &LaunchRequest| Err("screen missing".to_string())),
        );

        let err = activator
            .activate(&SubjectId::from("player-1"))
            .await
            .unwrap_err();
        match err {
            ActivationError::Failed { subject, message } => {
                assert_eq!(subject, "player-1");
                assert_eq!(message, "screen missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
