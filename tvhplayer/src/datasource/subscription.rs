use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, warn};
use tvhcontract::{IdentityRegistry, ResourceUri};

use crate::clock::Clock;
use crate::datasource::{DataSource, SourceSettings};
use crate::errors::{DataSourceError, OpenError, PlaybackException, PlaybackExceptionKind};
use crate::htsp::{HtspTransport, SubscribeRequest, SubscriptionEvent, TimeshiftStatus, TransportError};
use crate::model::SourceKind;
use crate::pipeline::PipelineEventSink;
use crate::speed::{NORMAL_RATE, PAUSED_RATE, is_supported_rate};

/// Live channel streamed through a timeshift-capable subscription.
///
/// Mux packets are pushed by the connection through [`handle_event`] and
/// buffered until the pipeline reads them.
///
/// [`handle_event`]: SubscriptionDataSource::handle_event
pub struct SubscriptionDataSource {
    transport: Arc<dyn HtspTransport>,
    registry: IdentityRegistry,
    clock: Arc<dyn Clock>,
    settings: SourceSettings,
    subscription_id: u32,
    uri: Option<ResourceUri>,
    channel_id: Option<i32>,
    paused: bool,
    rate: i32,
    /// Wall time of the subscription start, in microseconds.
    start_time: Option<i64>,
    timeshift: Option<TimeshiftStatus>,
    buffer: VecDeque<u8>,
    ended: bool,
    events: Option<PipelineEventSink>,
}

impl SubscriptionDataSource {
    pub fn new(
        transport: Arc<dyn HtspTransport>,
        registry: IdentityRegistry,
        clock: Arc<dyn Clock>,
        settings: SourceSettings,
        subscription_id: u32,
    ) -> Self {
        Self {
            transport,
            registry,
            clock,
            settings,
            subscription_id,
            uri: None,
            channel_id: None,
            paused: false,
            rate: NORMAL_RATE,
            start_time: None,
            timeshift: None,
            buffer: VecDeque::new(),
            ended: false,
            events: None,
        }
    }

    pub fn subscription_id(&self) -> u32 {
        self.subscription_id
    }

    pub fn channel_id(&self) -> Option<i32> {
        self.channel_id
    }

    pub fn is_open(&self) -> bool {
        self.channel_id.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn rate(&self) -> i32 {
        self.rate
    }

    /// True once the server stopped the subscription.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Session sink receiving the fatal errors of this subscription.
    pub fn attach_events(&mut self, events: PipelineEventSink) {
        self.events = Some(events);
    }

    /// Feeds an asynchronous subscription message.
    pub fn handle_event(&mut self, event: SubscriptionEvent) {
        if !self.is_open() {
            debug!(subscription_id = self.subscription_id, "Ignoring event for closed subscription");
            return;
        }
        match event {
            SubscriptionEvent::Start => {
                let now_us = self.clock.now_ms() * 1000;
                debug!(subscription_id = self.subscription_id, start_time = now_us, "Subscription started");
                self.start_time = Some(now_us);
            }
            SubscriptionEvent::TimeshiftStatus(status) => {
                self.timeshift = Some(status);
            }
            SubscriptionEvent::MuxPacket { payload, .. } => {
                self.buffer.extend(payload);
            }
            SubscriptionEvent::Stop { reason } => {
                let reason = reason.unwrap_or_else(|| "no reason given".to_string());
                info!(subscription_id = self.subscription_id, %reason, "Subscription stopped by server");
                self.ended = true;
                if let Some(events) = &self.events {
                    events.error(PlaybackException::new(
                        PlaybackExceptionKind::Source,
                        format!("Subscription stopped by server: {reason}"),
                    ));
                }
            }
        }
    }

    fn send_rate(&self, rate: i32) -> Result<(), DataSourceError> {
        self.transport
            .subscription_speed(self.subscription_id, rate)
            .map_err(DataSourceError::from)
    }
}

impl DataSource for SubscriptionDataSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Live
    }

    fn uri(&self) -> Option<ResourceUri> {
        self.uri
    }

    fn open(&mut self, uri: &ResourceUri) -> Result<(), OpenError> {
        if self.is_open() {
            self.close();
        }

        let channel_id = self
            .registry
            .reverse_resolve_channel(uri)?
            .ok_or(OpenError::ResourceNotFound(*uri))?;

        let request = SubscribeRequest {
            subscription_id: self.subscription_id,
            channel_id,
            profile: self.settings.stream_profile.clone(),
            timeshift_period_secs: self.settings.timeshift_period_secs,
        };
        self.transport.subscribe(&request).map_err(|err| match err {
            TransportError::Refused(reason) => OpenError::SubscriptionRefused(reason),
            TransportError::NotFound(_) => OpenError::ResourceNotFound(*uri),
            other => OpenError::Transport(other.to_string()),
        })?;

        info!(
            subscription_id = self.subscription_id,
            channel_id,
            profile = %request.profile,
            "Subscribed to channel"
        );
        self.uri = Some(*uri);
        self.channel_id = Some(channel_id);
        self.paused = false;
        self.rate = NORMAL_RATE;
        self.ended = false;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, DataSourceError> {
        if !self.is_open() {
            return Err(DataSourceError::NotOpen);
        }
        let count = buf.len().min(self.buffer.len());
        for (slot, byte) in buf.iter_mut().zip(self.buffer.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn pause(&mut self) {
        if !self.is_open() {
            warn!(subscription_id = self.subscription_id, "Cannot pause, subscription not open");
            return;
        }
        if self.paused {
            return;
        }
        match self.send_rate(PAUSED_RATE) {
            Ok(()) => self.paused = true,
            Err(err) => warn!(subscription_id = self.subscription_id, "Failed to pause subscription: {}", err),
        }
    }

    fn resume(&mut self) {
        if !self.is_open() || !self.paused {
            return;
        }
        match self.send_rate(self.rate) {
            Ok(()) => self.paused = false,
            Err(err) => warn!(subscription_id = self.subscription_id, "Failed to resume subscription: {}", err),
        }
    }

    fn set_speed(&mut self, rate: i32) -> Result<(), DataSourceError> {
        if !is_supported_rate(rate) {
            return Err(DataSourceError::UnsupportedSpeed(rate));
        }
        if !self.is_open() {
            return Err(DataSourceError::NotOpen);
        }
        if self.paused {
            // Sent by `resume`
            debug!(subscription_id = self.subscription_id, rate, "Paused, speed kept for resume");
            self.rate = rate;
            return Ok(());
        }
        self.send_rate(rate)?;
        debug!(subscription_id = self.subscription_id, rate, "Subscription speed changed");
        self.rate = rate;
        Ok(())
    }

    fn timeshift_start_time(&self) -> Option<i64> {
        self.start_time
    }

    fn timeshift_start_pts(&self) -> i64 {
        self.timeshift.and_then(|status| status.start).unwrap_or(0)
    }

    fn timeshift_offset_pts(&self) -> Option<i64> {
        self.timeshift.and_then(|status| status.shift)
    }

    fn close(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Err(err) = self.transport.unsubscribe(self.subscription_id) {
            warn!(subscription_id = self.subscription_id, "Failed to unsubscribe: {}", err);
        }
        debug!(subscription_id = self.subscription_id, "Subscription closed");
        self.channel_id = None;
        self.paused = false;
        self.start_time = None;
        self.timeshift = None;
        self.buffer.clear();
        self.events = None;
    }
}

impl Drop for SubscriptionDataSource {
    fn drop(&mut self) {
        self.close();
    }
}
