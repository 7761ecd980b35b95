//! Integration tests for install crate

#[cfg(test)]
mod tests {
    use crikstats_delivery::{
        ListenerHandle, ModuleDeliveryService, SimulatedDeliveryService, StatusListener,
    };
    use crikstats_errors::DeliveryError;
    use crikstats_events::{AppEvent, InstallEvent};
    use crikstats_install::*;
    use crikstats_types::{InstallState, ModuleId, SessionStateUpdate, SessionStatus};
    use futures::stream::FusedStream;
    use futures::StreamExt;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    const MODULE: &str = "feature_player";

    fn setup() -> (SimulatedDeliveryService, FeatureModuleInstaller) {
        let service = SimulatedDeliveryService::new();
        let delivery: Arc<dyn ModuleDeliveryService> = Arc::new(service.clone());
        (service, FeatureModuleInstaller::new(delivery))
    }

    fn report(status: SessionStatus) -> SessionStateUpdate {
        SessionStateUpdate::new(3, MODULE, status)
    }

    #[tokio::test]
    async fn test_already_installed_yields_single_installed() {
        let (service, installer) = setup();
        service.mark_installed(MODULE);

        let states: Vec<_> = installer.install(MODULE).collect().await;
        assert_eq!(states, vec![InstallState::Installed]);

        let stats = service.stats();
        assert_eq!(stats.install_requests, 0);
        assert_eq!(stats.listener_registrations, 0);
    }

    #[tokio::test]
    async fn test_full_install_sequence() {
        let (service, installer) = setup();
        service.script_on_request(
            MODULE,
            vec![
                report(SessionStatus::Pending),
                report(SessionStatus::Downloading).with_bytes(30, 100),
                report(SessionStatus::Downloading).with_bytes(70, 100),
                report(SessionStatus::Downloaded),
                report(SessionStatus::Installing),
                report(SessionStatus::Installed),
            ],
        );

        let states: Vec<_> = installer.install(MODULE).collect().await;
        assert_eq!(
            states,
            vec![
                InstallState::Pending,
                InstallState::Downloading { progress: 30 },
                InstallState::Downloading { progress: 70 },
                InstallState::Installing,
                InstallState::Installed,
            ]
        );

        let stats = service.stats();
        assert_eq!(stats.install_requests, 1);
        assert_eq!(stats.listener_registrations, 1);
        assert_eq!(stats.listener_unregistrations, 1);
        assert_eq!(stats.active_listeners, 0);
    }

    #[tokio::test]
    async fn test_failure_ends_stream_and_ignores_later_reports() {
        let (service, installer) = setup();
        service.script_on_request(
            MODULE,
            vec![
                report(SessionStatus::Failed).with_error_code(5),
                report(SessionStatus::Installing),
                report(SessionStatus::Installed),
            ],
        );

        let states: Vec<_> = installer.install(MODULE).collect().await;
        assert_eq!(
            states,
            vec![InstallState::Failed {
                code: 5,
                message: None
            }]
        );
        assert_eq!(service.stats().listener_unregistrations, 1);
    }

    #[tokio::test]
    async fn test_reports_for_other_modules_are_filtered() {
        let (service, installer) = setup();
        service.script_on_request(
            "A",
            vec![
                SessionStateUpdate::new(1, "B", SessionStatus::Pending),
                SessionStateUpdate::new(2, "A", SessionStatus::Pending),
                SessionStateUpdate::new(1, "B", SessionStatus::Failed).with_error_code(-2),
                SessionStateUpdate::new(2, "A", SessionStatus::Installed),
            ],
        );

        let states: Vec<_> = installer.install("A").collect().await;
        assert_eq!(states, vec![InstallState::Pending, InstallState::Installed]);
    }

    #[tokio::test]
    async fn test_cancel_releases_listener_once() {
        let (service, installer) = setup();
        let mut stream = installer.install(MODULE);

        let pusher = {
            let service = service.clone();
            tokio::spawn(async move {
                service.wait_for_install_requests(1).await;
                service.push(&report(SessionStatus::Pending));
                service.push(&report(SessionStatus::Downloading).with_bytes(1, 4));
            })
        };

        assert_eq!(stream.next().await, Some(InstallState::Pending));
        assert_eq!(
            stream.next().await,
            Some(InstallState::Downloading { progress: 25 })
        );
        pusher.await.unwrap();
        assert!(!stream.is_terminated());

        stream.cancel();
        stream.cancel();
        assert!(stream.is_terminated());
        assert_eq!(stream.next().await, None);

        // late reports after cancellation go nowhere
        service.push(&report(SessionStatus::Installed));
        drop(stream);

        let stats = service.stats();
        assert_eq!(stats.listener_registrations, 1);
        assert_eq!(stats.listener_unregistrations, 1);
        assert_eq!(stats.active_listeners, 0);
    }

    #[tokio::test]
    async fn test_dropping_active_stream_releases_listener() {
        let (service, installer) = setup();
        service.script_on_request(MODULE, vec![report(SessionStatus::Pending)]);

        let mut stream = installer.install(MODULE);
        assert_eq!(stream.next().await, Some(InstallState::Pending));
        assert_eq!(service.stats().active_listeners, 1);

        drop(stream);
        let stats = service.stats();
        assert_eq!(stats.listener_unregistrations, 1);
        assert_eq!(stats.active_listeners, 0);
    }

    #[tokio::test]
    async fn test_stream_is_cold_until_polled() {
        let (service, installer) = setup();
        let stream = installer.install(MODULE);

        assert_eq!(stream.module().as_str(), MODULE);
        assert_eq!(service.stats().listener_registrations, 0);
        assert_eq!(service.stats().install_requests, 0);

        drop(stream);
        assert_eq!(service.stats().listener_unregistrations, 0);
    }

    #[tokio::test]
    async fn test_rejected_submission_yields_local_failure() {
        let (service, installer) = setup();
        service.reject_submissions("offline");

        let states: Vec<_> = installer.install(MODULE).collect().await;
        assert_eq!(states, vec![InstallState::local_failure("offline")]);

        let stats = service.stats();
        assert_eq!(stats.install_requests, 1);
        assert_eq!(stats.listener_unregistrations, 1);
    }

    /// Reports `PENDING` to its listeners, then refuses the request
    struct RefusesAfterReport(SimulatedDeliveryService);

    #[async_trait::async_trait]
    impl ModuleDeliveryService for RefusesAfterReport {
        fn installed_modules(&self) -> BTreeSet<ModuleId> {
            self.0.installed_modules()
        }

        async fn request_install(&self, module: &ModuleId) -> Result<i32, DeliveryError> {
            self.0.push(&report(SessionStatus::Pending));
            Err(DeliveryError::SubmissionFailed {
                module: module.to_string(),
                reason: "quota exceeded".into(),
            })
        }

        fn register_listener(&self, listener: StatusListener) -> ListenerHandle {
            self.0.register_listener(listener)
        }

        fn unregister_listener(&self, handle: ListenerHandle) {
            self.0.unregister_listener(handle);
        }

        async fn request_deferred_uninstall(&self, module: &ModuleId) -> Result<(), DeliveryError> {
            self.0.request_deferred_uninstall(module).await
        }
    }

    #[tokio::test]
    async fn test_reports_before_rejection_are_delivered_first() {
        let service = SimulatedDeliveryService::new();
        let installer = FeatureModuleInstaller::new(Arc::new(RefusesAfterReport(service.clone())));

        let states: Vec<_> = installer.install(MODULE).collect().await;
        assert_eq!(
            states,
            vec![
                InstallState::Pending,
                InstallState::local_failure("quota exceeded")
            ]
        );
        assert_eq!(service.stats().listener_unregistrations, 1);
    }

    #[tokio::test]
    async fn test_unsurfaced_statuses_are_skipped() {
        let (service, installer) = setup();
        service.script_on_request(
            MODULE,
            vec![
                report(SessionStatus::Pending).with_raw_status(42),
                report(SessionStatus::Unknown),
                report(SessionStatus::Downloaded),
                report(SessionStatus::Canceling),
                report(SessionStatus::Canceled),
            ],
        );

        let states: Vec<_> = installer.install(MODULE).collect().await;
        assert_eq!(states, vec![InstallState::Canceled]);
    }

    #[tokio::test]
    async fn test_confirmation_keeps_stream_open() {
        let (service, installer) = setup();
        service.script_on_request(
            MODULE,
            vec![
                SessionStateUpdate::new(7, MODULE, SessionStatus::RequiresUserConfirmation),
                SessionStateUpdate::new(7, MODULE, SessionStatus::Pending),
                SessionStateUpdate::new(7, MODULE, SessionStatus::Installed),
            ],
        );

        let states: Vec<_> = installer.install(MODULE).collect().await;
        assert_eq!(
            states,
            vec![
                InstallState::RequiresConfirmation { session_id: 7 },
                InstallState::Pending,
                InstallState::Installed,
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_is_not_forced_monotonic() {
        let (service, installer) = setup();
        service.script_on_request(
            MODULE,
            vec![
                report(SessionStatus::Downloading).with_bytes(70, 100),
                report(SessionStatus::Downloading).with_bytes(30, 100),
                report(SessionStatus::Downloading).with_bytes(500, 100),
                report(SessionStatus::Installed),
            ],
        );

        let states: Vec<_> = installer.install(MODULE).collect().await;
        assert_eq!(
            states,
            vec![
                InstallState::Downloading { progress: 70 },
                InstallState::Downloading { progress: 30 },
                InstallState::Downloading { progress: 100 },
                InstallState::Installed,
            ]
        );
    }

    #[tokio::test]
    async fn test_full_queue_keeps_terminal_state() {
        let (service, installer) = setup();
        let installer = installer.with_event_buffer(1);
        service.script_on_request(
            MODULE,
            vec![
                report(SessionStatus::Pending),
                report(SessionStatus::Downloading).with_bytes(50, 100),
                report(SessionStatus::Installing),
                report(SessionStatus::Installed),
            ],
        );

        let states: Vec<_> = installer.install(MODULE).collect().await;
        assert_eq!(states, vec![InstallState::Pending, InstallState::Installed]);
    }

    #[tokio::test]
    async fn test_concurrent_installs_use_independent_listeners() {
        let (service, installer) = setup();
        service.script_on_request(
            "A",
            vec![SessionStateUpdate::new(1, "A", SessionStatus::Installed)],
        );
        service.script_on_request(
            "B",
            vec![SessionStateUpdate::new(2, "B", SessionStatus::Failed).with_error_code(-6)],
        );

        let (a, b) = tokio::join!(
            installer.install("A").collect::<Vec<_>>(),
            installer.install("B").collect::<Vec<_>>()
        );
        assert_eq!(a, vec![InstallState::Installed]);
        assert_eq!(b, vec![InstallState::provider_failure(-6)]);

        let stats = service.stats();
        assert_eq!(stats.install_requests, 2);
        assert_eq!(stats.listener_registrations, 2);
        assert_eq!(stats.listener_unregistrations, 2);
    }

    #[tokio::test]
    async fn test_installer_trait_object() {
        let (service, installer) = setup();
        service.mark_installed(MODULE);

        let installer: Arc<dyn ModuleInstaller> = Arc::new(installer);
        let module = ModuleId::from(MODULE);
        assert!(installer.is_installed(&module));

        let states: Vec<_> = installer.install(&module).collect().await;
        assert_eq!(states, vec![InstallState::Installed]);
    }

    #[tokio::test]
    async fn test_uninstall_is_fire_and_forget() {
        let (service, installer) = setup();
        service.mark_installed(MODULE);
        let module = ModuleId::from(MODULE);

        installer.uninstall(&module).await;
        assert!(!installer.is_installed(&module));
        assert!(installer.installed_modules().is_empty());

        // not installed anymore, so the service is not asked again
        installer.uninstall(&module).await;
        assert_eq!(service.stats().uninstall_requests, 1);
    }

    #[tokio::test]
    async fn test_install_events_are_emitted() {
        let (service, installer) = setup();
        let (tx, mut rx) = crikstats_events::channel();
        let installer = installer.with_event_sender(tx);
        service.script_on_request(MODULE, vec![report(SessionStatus::Installed)]);

        let states: Vec<_> = installer.install(MODULE).collect().await;
        assert_eq!(states, vec![InstallState::Installed]);
        drop(installer);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Install(event) = event {
                events.push(event);
            }
        }

        assert!(matches!(events[0], InstallEvent::ListenerRegistered { .. }));
        assert!(matches!(events[1], InstallEvent::Requested { .. }));
        assert!(matches!(
            &events[2],
            InstallEvent::StateChanged {
                state: InstallState::Installed,
                ..
            }
        ));
        assert!(matches!(events[3], InstallEvent::ListenerReleased { .. }));
        assert!(events.iter().all(|event| event.module().as_str() == MODULE));
    }
}
