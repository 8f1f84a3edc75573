use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use tvhcontract::{IdentityRegistry, ResourceUri, UriKind};

use crate::clock::Clock;
use crate::datasource::{
    DataSource, FileDataSource, HtspDataSource, SharedDataSource, SourceSettings,
    SubscriptionDataSource,
};
use crate::errors::OpenError;
use crate::htsp::{HtspTransport, SubscriptionEvent};
use crate::model::SourceKind;

/// Hands out data sources for one kind of resource.
///
/// A factory keeps at most one outstanding source: opening a new one
/// releases the previous one first.
pub trait DataSourceFactory: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn open(&self, uri: &ResourceUri) -> Result<SharedDataSource, OpenError>;

    /// Closes and forgets the outstanding source, if any. Idempotent.
    fn release_current(&self);

    fn current(&self) -> Option<SharedDataSource>;
}

pub struct HtspDataSourceFactory {
    kind: SourceKind,
    transport: Arc<dyn HtspTransport>,
    registry: IdentityRegistry,
    clock: Arc<dyn Clock>,
    settings: SourceSettings,
    next_subscription_id: AtomicU32,
    current: Mutex<Option<SharedDataSource>>,
}

impl HtspDataSourceFactory {
    fn new(
        kind: SourceKind,
        transport: Arc<dyn HtspTransport>,
        registry: IdentityRegistry,
        clock: Arc<dyn Clock>,
        settings: SourceSettings,
    ) -> Self {
        Self {
            kind,
            transport,
            registry,
            clock,
            settings,
            next_subscription_id: AtomicU32::new(1),
            current: Mutex::new(None),
        }
    }

    /// Factory for live channels.
    pub fn subscription(
        transport: Arc<dyn HtspTransport>,
        registry: IdentityRegistry,
        clock: Arc<dyn Clock>,
        settings: SourceSettings,
    ) -> Self {
        Self::new(SourceKind::Live, transport, registry, clock, settings)
    }

    /// Factory for recordings.
    pub fn file(
        transport: Arc<dyn HtspTransport>,
        registry: IdentityRegistry,
        clock: Arc<dyn Clock>,
        settings: SourceSettings,
    ) -> Self {
        Self::new(SourceKind::Recording, transport, registry, clock, settings)
    }

    fn expected_uri_kind(&self) -> UriKind {
        match self.kind {
            SourceKind::Live => UriKind::Channel,
            SourceKind::Recording => UriKind::Recording,
        }
    }

    fn build_source(&self) -> HtspDataSource {
        match self.kind {
            SourceKind::Live => {
                let subscription_id = self.next_subscription_id.fetch_add(1, Ordering::SeqCst);
                HtspDataSource::Subscription(SubscriptionDataSource::new(
                    self.transport.clone(),
                    self.registry.clone(),
                    self.clock.clone(),
                    self.settings.clone(),
                    subscription_id,
                ))
            }
            SourceKind::Recording => HtspDataSource::File(FileDataSource::new(
                self.transport.clone(),
                self.registry.clone(),
            )),
        }
    }

    fn take_current(&self) -> Option<SharedDataSource> {
        self.current
            .lock()
            .expect("data source factory mutex poisoned")
            .take()
    }

    /// Routes a message from the connection to the outstanding subscription.
    ///
    /// Returns false when no open source owns `subscription_id`, e.g. for
    /// late messages of a released subscription.
    pub fn dispatch(&self, subscription_id: u32, event: SubscriptionEvent) -> bool {
        let Some(source) = self.current() else {
            return false;
        };
        let mut source = source.lock().expect("data source mutex poisoned");
        if source.subscription_id() != Some(subscription_id) {
            debug!(subscription_id, "Dropping event for stale subscription");
            return false;
        }
        source.handle_event(event);
        true
    }
}

impl DataSourceFactory for HtspDataSourceFactory {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn open(&self, uri: &ResourceUri) -> Result<SharedDataSource, OpenError> {
        uri.expect_kind(self.expected_uri_kind())?;

        if self.current().is_some() {
            warn!(kind = ?self.kind, "Data source still outstanding, releasing it first");
            self.release_current();
        }

        let mut source = self.build_source();
        source.open(uri)?;

        let source = Arc::new(Mutex::new(source));
        *self
            .current
            .lock()
            .expect("data source factory mutex poisoned") = Some(source.clone());
        Ok(source)
    }

    fn release_current(&self) {
        if let Some(source) = self.take_current() {
            debug!(kind = ?self.kind, "Releasing data source");
            source.lock().expect("data source mutex poisoned").close();
        }
    }

    fn current(&self) -> Option<SharedDataSource> {
        self.current
            .lock()
            .expect("data source factory mutex poisoned")
            .clone()
    }
}
