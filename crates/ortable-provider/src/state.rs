//! Application state shared across handlers.

use std::sync::Arc;

use ortable_core::{
    DeviceHandle, OperationDispatcher, PeriodicSynchronizer, ProviderConfig, ReportHub,
    ThresholdEvaluator, VirtualDevice,
};

/// State handed to every handler.
pub type SharedState = AppState;

/// Shared application state.
///
/// Cloning is cheap; every clone refers to the same table and report hub.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    config: ProviderConfig,
    device: DeviceHandle,
    dispatcher: OperationDispatcher,
    hub: Arc<ReportHub>,
}

impl AppState {
    /// Creates the table, its report hub and the dispatcher writing to it.
    ///
    /// The hub is created stopped; call [`ReportHub::start`] before
    /// publishing.
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        let device = DeviceHandle::new(VirtualDevice::new());
        let hub = Arc::new(ReportHub::new());
        let dispatcher = OperationDispatcher::new(device.clone()).with_listener(hub.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                device,
                dispatcher,
                hub,
            }),
        }
    }

    /// Provider configuration.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.inner.config
    }

    /// The table.
    #[must_use]
    pub fn device(&self) -> &DeviceHandle {
        &self.inner.device
    }

    /// The only writer of the table.
    #[must_use]
    pub fn dispatcher(&self) -> &OperationDispatcher {
        &self.inner.dispatcher
    }

    /// Versioned state store and report log.
    #[must_use]
    pub fn hub(&self) -> &Arc<ReportHub> {
        &self.inner.hub
    }

    /// Builds the synchronizer publishing this table into the hub.
    #[must_use]
    pub fn synchronizer(&self) -> PeriodicSynchronizer {
        let settings = &self.inner.config.synchronizer;
        PeriodicSynchronizer::new(self.inner.device.clone(), self.inner.hub.clone())
            .with_interval(settings.interval())
            .with_evaluator(ThresholdEvaluator::new(settings.alert_margin))
    }
}
