//! Connection orchestrator
//!
//! A strictly single-in-flight state machine: one device at a time is pulled
//! from the discovery queue, connected with bounded retry, driven through the
//! credential and version exchanges, classified, and torn down. The machine
//! runs as one task consuming a [`SessionEvent`] inbox, so advertisement
//! sightings and stop requests queue up instead of re-entering state, and the
//! one-connection-at-a-time invariant is structural rather than locked.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, info, warn};
use veriscan_core::{AddressRange, DeviceIdentity, ReportRow, TypeTag};
use veriscan_proto::{decode_ack, AckReply, Command, ExpectedDecoder, Transport, TransportEvent};

use crate::classify::{classify_credential, classify_version, CredentialOutcome, VersionOutcome};
use crate::correlator::{Correlator, PendingExchange};
use crate::discovery::DiscoveryQueue;
use crate::reconcile;
use crate::session::{SessionCause, SessionState};

/// Events consumed by the orchestrator's single worker
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Inbound traffic from the transport adapter
    Transport(TransportEvent),
    /// Stop request; idempotent
    Stop,
}

/// Updates emitted for external consumers (progress UI, report sink)
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Progress {
        processed: u64,
        verified: u64,
        rejected: u64,
        remaining_budget: u64,
    },
    Terminated {
        cause: SessionCause,
        rows: Vec<ReportRow>,
    },
}

/// Tunables for one session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Shared credential code sent as `pin.<code>`
    pub pin_code: String,
    /// Total connect attempts per cycle before the candidate is requeued
    pub connect_attempts: u32,
    /// Fixed backoff between connect attempts
    pub connect_backoff: Duration,
    /// Per-command reply timeout; `None` preserves the unbounded wait, where
    /// a silent device stalls its slot until the transport reports
    /// disconnection
    pub response_timeout: Option<Duration>,
    /// Advertising-name pattern for the session's device class
    pub name_pattern: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pin_code: "0000".to_string(),
            connect_attempts: 3,
            connect_backoff: Duration::from_millis(500),
            response_timeout: Some(Duration::from_secs(30)),
            name_pattern: None,
        }
    }
}

/// Final result of a session run
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub cause: SessionCause,
    pub rows: Vec<ReportRow>,
    pub state: SessionState,
}

enum Driven<O> {
    Done(O),
    Stopped,
}

enum ExchangeResult {
    Reply(Vec<u8>),
    /// Write failed or the reply timed out; transient
    Failed,
    Stopped,
}

enum ConnectResult {
    Connected,
    Failed,
    Stopped,
}

/// The session worker. Owns the session state; everything reaches it through
/// the event inbox.
pub struct Orchestrator<T: Transport> {
    transport: Arc<T>,
    config: SessionConfig,
    state: SessionState,
    queue: DiscoveryQueue,
    correlator: Correlator,
    events: mpsc::Receiver<SessionEvent>,
    updates: broadcast::Sender<SessionUpdate>,
    /// Notifications observed while a transport operation was in flight,
    /// consumed in arrival order by the next exchange
    deferred: VecDeque<Vec<u8>>,
    stop_requested: bool,
}

impl<T: Transport> Orchestrator<T> {
    pub fn new(
        transport: Arc<T>,
        config: SessionConfig,
        range: AddressRange,
        tag: TypeTag,
        events: mpsc::Receiver<SessionEvent>,
    ) -> Self {
        let (updates, _) = broadcast::channel(64);
        let queue = DiscoveryQueue::new(config.name_pattern.clone());
        Self {
            transport,
            state: SessionState::new(range, tag),
            config,
            queue,
            correlator: Correlator::new(),
            events,
            updates,
            deferred: VecDeque::new(),
            stop_requested: false,
        }
    }

    /// Subscribe to progress and termination updates
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// Run the session to termination.
    ///
    /// Returns when the budget is exhausted with an empty queue (Auto) or a
    /// stop request arrives (Manual).
    pub async fn run(mut self) -> SessionReport {
        info!(
            range = %self.state.range(),
            tag = %self.state.tag(),
            budget = self.state.remaining_budget(),
            "Qualification session started"
        );

        loop {
            if self.stop_requested {
                return self.terminate(SessionCause::Manual);
            }
            // Auto-termination only once every queued candidate is resolved
            if self.queue.is_empty() && self.state.remaining_budget() == 0 {
                return self.terminate(SessionCause::Auto);
            }
            if let Some(device) = self.queue.pop_next(&self.state) {
                self.qualify(device).await;
                continue;
            }
            // Idle: wait for a sighting or a stop
            match self.events.recv().await {
                Some(event) => self.handle_idle_event(event),
                None => {
                    debug!("Event channel closed, stopping session");
                    self.stop_requested = true;
                }
            }
        }
    }

    fn handle_idle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Stop => self.stop_requested = true,
            SessionEvent::Transport(TransportEvent::Sighting {
                advertised_name,
                address,
            }) => {
                self.queue.offer(&mut self.state, &advertised_name, address);
            }
            SessionEvent::Transport(TransportEvent::Notification { payload, .. }) => {
                self.absorb_stray(payload);
            }
        }
    }

    /// A notification with no pending exchange: the radio-off marker bumps a
    /// session-level counter, anything else is an orphan and dropped
    fn absorb_stray(&mut self, payload: Vec<u8>) {
        if decode_ack(&payload) == AckReply::RadioOff {
            debug!("Radio-off acknowledged");
            self.state.record_radio_confirmed();
        } else {
            warn!("Orphaned notification with no pending exchange; dropping");
        }
    }

    /// Drive one candidate through connect, credential, and version
    async fn qualify(&mut self, device: DeviceIdentity) {
        debug!(device = %device, "Connecting");
        match self.connect_with_retry(&device).await {
            ConnectResult::Stopped => {
                self.teardown(&device).await;
                return;
            }
            ConnectResult::Failed => {
                // Requeue at the tail so other candidates go first
                if !self.state.is_rejected(&device.address) && !self.stop_requested {
                    self.state.mark_unchecked(&device);
                    self.queue.requeue(device);
                }
                self.finish_attempt();
                return;
            }
            ConnectResult::Connected => {}
        }

        // Step 1: credential check
        let pin = Command::Pin(self.config.pin_code.clone());
        let payload = match self
            .exchange(&device, pin, ExpectedDecoder::Credential)
            .await
        {
            ExchangeResult::Reply(payload) => payload,
            ExchangeResult::Stopped => {
                self.teardown(&device).await;
                return;
            }
            ExchangeResult::Failed => {
                self.transient_failure(device).await;
                return;
            }
        };
        match classify_credential(&payload) {
            CredentialOutcome::Proceed => {}
            CredentialOutcome::Rejected(reason) => {
                self.state.mark_rejected(&device, reason);
                self.teardown(&device).await;
                self.finish_attempt();
                return;
            }
            CredentialOutcome::Malformed => {
                warn!(device = %device, "Malformed credential reply; disconnecting unclassified");
                self.state.mark_unchecked(&device);
                self.teardown(&device).await;
                self.finish_attempt();
                return;
            }
        }

        // Step 2: version/identity check
        let payload = match self
            .exchange(&device, Command::Serial, ExpectedDecoder::Version)
            .await
        {
            ExchangeResult::Reply(payload) => payload,
            ExchangeResult::Stopped => {
                self.teardown(&device).await;
                return;
            }
            ExchangeResult::Failed => {
                self.transient_failure(device).await;
                return;
            }
        };
        match classify_version(&payload, self.state.tag(), self.state.range()) {
            VersionOutcome::Verified { identity } => {
                info!(device = %device, identity = %identity, "Device verified");
                self.state.mark_verified(&device, identity);
                // Close-out is fire-and-forget: no pending exchange
                if let Driven::Done(Err(e)) = self.write(&device, Command::RadioOff).await {
                    debug!(device = %device, error = %e, "Radio-off write failed");
                }
            }
            VersionOutcome::Rejected(reason) => {
                self.state.mark_rejected(&device, reason);
            }
            VersionOutcome::Malformed => {
                warn!(device = %device, "Unparseable identity; disconnecting unclassified");
                self.state.mark_unchecked(&device);
            }
        }
        self.teardown(&device).await;
        self.finish_attempt();
    }

    async fn connect_with_retry(&mut self, device: &DeviceIdentity) -> ConnectResult {
        for attempt in 1..=self.config.connect_attempts.max(1) {
            let transport = Arc::clone(&self.transport);
            let address = device.address.clone();
            let result = self
                .drive(async move { transport.connect(&address).await })
                .await;
            match result {
                Driven::Stopped => return ConnectResult::Stopped,
                Driven::Done(Ok(())) => {
                    debug!(device = %device, attempt, "Connected");
                    return ConnectResult::Connected;
                }
                Driven::Done(Err(e)) => {
                    warn!(device = %device, attempt, error = %e, "Connect attempt failed");
                    if attempt < self.config.connect_attempts {
                        if let Driven::Stopped = self.drive(sleep(self.config.connect_backoff)).await
                        {
                            return ConnectResult::Stopped;
                        }
                    }
                }
            }
        }
        ConnectResult::Failed
    }

    /// Send a command and wait for the correlated reply
    async fn exchange(
        &mut self,
        device: &DeviceIdentity,
        command: Command,
        decoder: ExpectedDecoder,
    ) -> ExchangeResult {
        match self.write(device, command).await {
            Driven::Stopped => return ExchangeResult::Stopped,
            Driven::Done(Err(e)) => {
                warn!(device = %device, error = %e, "Command write failed");
                return ExchangeResult::Failed;
            }
            Driven::Done(Ok(())) => {}
        }
        self.correlator.push(PendingExchange {
            device: device.clone(),
            decoder,
        });
        self.await_reply().await
    }

    async fn write(&mut self, device: &DeviceIdentity, command: Command) -> Driven<anyhow::Result<()>> {
        let transport = Arc::clone(&self.transport);
        let address = device.address.clone();
        let payload = command.encode();
        self.drive(async move { transport.write(&address, &payload).await })
            .await
    }

    /// Wait for the notification matching the outstanding exchange, feeding
    /// sightings into the queue as they arrive
    async fn await_reply(&mut self) -> ExchangeResult {
        // Replies that raced the command write
        while let Some(payload) = self.deferred.pop_front() {
            if self.correlator.take().is_some() {
                return ExchangeResult::Reply(payload);
            }
            self.absorb_stray(payload);
        }

        let deadline = self.config.response_timeout.map(|t| Instant::now() + t);
        loop {
            let event = match deadline {
                Some(at) => match timeout_at(at, self.events.recv()).await {
                    Ok(event) => event,
                    Err(_) => {
                        warn!("No reply before timeout; abandoning exchange");
                        self.correlator.clear();
                        return ExchangeResult::Failed;
                    }
                },
                None => self.events.recv().await,
            };
            match event {
                Some(SessionEvent::Stop) | None => {
                    self.stop_requested = true;
                    self.correlator.clear();
                    return ExchangeResult::Stopped;
                }
                Some(SessionEvent::Transport(TransportEvent::Sighting {
                    advertised_name,
                    address,
                })) => {
                    self.queue.offer(&mut self.state, &advertised_name, address);
                }
                Some(SessionEvent::Transport(TransportEvent::Notification { payload, .. })) => {
                    // Single in-flight discipline: head of queue is always
                    // the right association
                    match self.correlator.take() {
                        Some(_) => return ExchangeResult::Reply(payload),
                        None => self.absorb_stray(payload),
                    }
                }
            }
        }
    }

    /// Await a transport operation while keeping the inbox drained: sightings
    /// are queued, notifications deferred, a stop cancels the operation
    async fn drive<F, O>(&mut self, operation: F) -> Driven<O>
    where
        F: Future<Output = O>,
    {
        tokio::pin!(operation);
        loop {
            tokio::select! {
                out = &mut operation => return Driven::Done(out),
                event = self.events.recv() => match event {
                    Some(SessionEvent::Stop) | None => {
                        self.stop_requested = true;
                        return Driven::Stopped;
                    }
                    Some(SessionEvent::Transport(TransportEvent::Sighting { advertised_name, address })) => {
                        self.queue.offer(&mut self.state, &advertised_name, address);
                    }
                    Some(SessionEvent::Transport(TransportEvent::Notification { payload, .. })) => {
                        self.deferred.push_back(payload);
                    }
                }
            }
        }
    }

    /// Best-effort teardown; never blocks session progress on the result.
    /// Notifications that arrived while the connection was live are flushed
    /// here, where no exchange is outstanding and every payload is stray.
    async fn teardown(&mut self, device: &DeviceIdentity) {
        self.transport.disconnect(&device.address).await;
        self.correlator.clear();
        while let Some(payload) = self.deferred.pop_front() {
            self.absorb_stray(payload);
        }
        while let Ok(event) = self.events.try_recv() {
            self.handle_idle_event(event);
        }
    }

    /// Transient failure mid-protocol: disconnect, leave unchecked, requeue
    async fn transient_failure(&mut self, device: DeviceIdentity) {
        self.teardown(&device).await;
        if !self.state.is_rejected(&device.address) && !self.stop_requested {
            self.state.mark_unchecked(&device);
            self.queue.requeue(device);
        }
        self.finish_attempt();
    }

    fn finish_attempt(&mut self) {
        self.state.record_processed();
        let _ = self.updates.send(SessionUpdate::Progress {
            processed: self.state.processed(),
            verified: self.state.verified_count() as u64,
            rejected: self.state.rejected_count() as u64,
            remaining_budget: self.state.remaining_budget(),
        });
    }

    fn terminate(&mut self, cause: SessionCause) -> SessionReport {
        self.state.deactivate();
        self.queue.clear();
        self.correlator.clear();
        self.deferred.clear();

        let rows = reconcile::build_report(&self.state);
        info!(
            cause = %cause,
            verified = self.state.verified_count(),
            rejected = self.state.rejected_count(),
            rows = rows.len(),
            "Session terminated"
        );
        let _ = self.updates.send(SessionUpdate::Terminated {
            cause,
            rows: rows.clone(),
        });

        let state = self.state.clone();
        self.state.clear_transient_counters();
        SessionReport { cause, rows, state }
    }
}
