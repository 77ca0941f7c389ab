//! Light sessions.
//!
//! A [`Light`] owns one link to one light. Opening it starts two tasks:
//!
//! - the dispatch task, which decodes every inbound notification in arrival
//!   order, records read replies in the register cache, and hands the reply to
//!   the correlator;
//! - the heartbeat task, which re-reads the power register on an interval so
//!   that button presses on the light show up and a dead link is noticed.
//!
//! Every operation writes its frame(s) and then waits for the correlator to
//! resolve it. There is no per-request timeout: wrap calls in
//! [`tokio::time::timeout`] where bounded latency matters. A request whose
//! reply never comes fails with [`Error::Superseded`] as soon as any later
//! request is answered.
//!
//! Multi-part writes must not overlap. Nothing prevents two concurrent
//! [`Light::multi`] calls from interleaving their frames; callers that issue
//! them concurrently must serialize them.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use btleplug::api::Peripheral as _;
use btleplug::platform::{Adapter, Peripheral};
use bytes::Bytes;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use govee_types::protocol::{
    MODE_SCENE, MODE_SEGMENT, SEGMENT_COUNT, SEGMENT_SET_BRIGHTNESS, SEGMENT_SET_COLOR,
};
use govee_types::{
    Argb, Command, Frame, FrameError, MULTI_ACK, Mode, Register, RegisterKey, Rgb, SegmentMask,
    chunk, encode_raw, encode_request, fraction_to_percent, model_from_name,
    percent_to_fraction,
};

use crate::cache::{RegisterCache, segment_slot, slot_at, slot_location};
use crate::correlator::{Correlator, Delivery, Waiter};
use crate::error::{Error, Result};
use crate::events::{DEFAULT_EVENT_CAPACITY, EventDispatcher, EventReceiver, LightEvent};
use crate::mode::{ModeKind, classify, scene_mode, segment_mode};
use crate::scan::{ScanOptions, find_device_with_options};
use crate::scenes::{Scene, SceneCatalog, SceneQuery, builtin_scene};
use crate::transport::{BleTransport, Inbound, LightTransport};
use crate::util::{create_identifier, format_mac};

/// Default timeout for establishing a BLE connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between heartbeat power reads.
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// How long a heartbeat read may take before it is logged as a timeout.
const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for a light session.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use govee_core::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .scene_dir("/usr/share/govee/scenes")
///     .heartbeat_interval(None);
/// assert!(config.heartbeat_interval.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for finding and connecting to the light.
    pub connection_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
    /// Interval between heartbeat reads; `None` disables the heartbeat.
    pub heartbeat_interval: Option<Duration>,
    /// Timeout for each heartbeat read.
    pub heartbeat_timeout: Duration,
    /// Directory holding `<model>.json` scene catalogs.
    pub scene_dir: PathBuf,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            heartbeat_interval: Some(DEFAULT_HEARTBEAT_INTERVAL),
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            scene_dir: PathBuf::from("scenes"),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the heartbeat interval, or disable the heartbeat with `None`.
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Option<Duration>) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the heartbeat read timeout.
    #[must_use]
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Set the scene catalog directory.
    #[must_use]
    pub fn scene_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scene_dir = dir.into();
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

/// State shared by the request path and the dispatch task.
#[derive(Debug)]
struct SessionState {
    correlator: Correlator,
    cache: RegisterCache,
    open: bool,
}

struct Session {
    transport: Arc<dyn LightTransport>,
    state: Mutex<SessionState>,
    events: EventDispatcher,
}

impl Session {
    fn new(transport: Arc<dyn LightTransport>, events: EventDispatcher) -> Self {
        Self {
            transport,
            state: Mutex::new(SessionState {
                correlator: Correlator::new(),
                cache: RegisterCache::new(),
                open: true,
            }),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write one frame without waiting for anything.
    async fn send(&self, frame: &[u8]) -> Result<()> {
        // Heartbeat reads are too frequent to log.
        if !frame.starts_with(&[Command::Read.byte(), Register::POWER.address()]) {
            debug!("Sending: {}", hex::encode(frame));
        }
        self.events.send(LightEvent::Send { frame: hex::encode(frame) });
        self.transport.write(frame).await
    }

    fn submit(&self, key: RegisterKey) -> Result<Waiter> {
        let mut state = self.state();
        if !state.open {
            return Err(Error::NotConnected);
        }
        Ok(state.correlator.submit(key))
    }

    async fn wait(waiter: Waiter) -> Result<Bytes> {
        waiter.await.map_err(|_| Error::NotConnected)?
    }

    /// Send a request and wait for its reply.
    async fn request(&self, key: RegisterKey, data: &[u8]) -> Result<Bytes> {
        let frame = encode_request(key, data)?;
        let waiter = self.submit(key)?;
        self.send(&frame).await?;
        Self::wait(waiter).await
    }

    /// Send a multi-part write and wait for its acknowledgement.
    async fn multi(&self, data: &[u8]) -> Result<()> {
        let frames = chunk::split(data)?;
        let waiter = self.submit(MULTI_ACK)?;
        for frame in &frames {
            self.send(frame).await?;
        }
        Self::wait(waiter).await?;
        Ok(())
    }

    /// Handle one inbound notification.
    fn dispatch(&self, raw: &[u8]) {
        let frame = match Frame::decode(raw) {
            Ok(frame) => frame,
            Err(FrameError::Checksum { .. }) => {
                error!("Checksum error: {}", hex::encode(raw));
                self.events
                    .send(LightEvent::ChecksumError { frame: hex::encode(raw) });
                return;
            }
            Err(e) => {
                warn!("Dropped frame {}: {}", hex::encode(raw), e);
                self.events.send(LightEvent::Unexpected {
                    frame: hex::encode(raw),
                    reason: e.to_string(),
                });
                return;
            }
        };

        if frame.key.command == Command::Read && frame.key.register != Register::POWER {
            debug!("Notify ({}): {}", frame.key, hex::encode(&frame.value));
        }
        self.events.send(LightEvent::Recv {
            key: frame.key,
            value: hex::encode(&frame.value),
        });

        let delivery = {
            let mut state = self.state();
            state.cache.update(&frame);
            state.correlator.on_frame(frame.key, &frame.value)
        };

        for key in delivery.superseded() {
            self.events.send(LightEvent::Timeout { key: *key });
        }
        let reason = match delivery {
            Delivery::Delivered { .. } => return,
            Delivery::Unsolicited => "no listeners",
            Delivery::Unmatched { .. } => "not pending",
        };
        self.events.send(LightEvent::Unexpected {
            frame: hex::encode(&frame.payload()),
            reason: reason.to_string(),
        });
    }

    /// Mark the session closed and reject everything still waiting.
    fn close(&self) -> usize {
        let mut state = self.state();
        state.open = false;
        state.correlator.cancel_all()
    }

    fn is_open(&self) -> bool {
        self.state().open
    }
}

async fn run_dispatch(session: Arc<Session>, mut inbound: Inbound, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = inbound.recv() => match next {
                Some(raw) => session.dispatch(&raw),
                None => {
                    warn!("Notification stream ended, light disconnected");
                    break;
                }
            },
        }
    }
    let rejected = session.close();
    if rejected > 0 {
        debug!("Rejected {} pending request(s)", rejected);
    }
}

async fn run_heartbeat(
    session: Arc<Session>,
    interval: Duration,
    limit: Duration,
    cancel: CancellationToken,
) {
    let key = RegisterKey::read(Register::POWER);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(interval) => {}
        }
        match timeout(limit, session.request(key, &[])).await {
            Ok(Ok(_)) => {}
            Ok(Err(Error::NotConnected)) => break,
            // The dispatch task already reported the superseded read.
            Ok(Err(Error::Superseded { .. })) => warn!("Heartbeat timeout"),
            Ok(Err(e)) => warn!("Heartbeat failed: {}", e),
            Err(_) => {
                warn!("Heartbeat timeout");
                session.events.send(LightEvent::Timeout { key });
            }
        }
    }
    debug!("Heartbeat stopped");
}

/// A connected Govee light.
///
/// Share it across tasks with `Arc<Light>`; every operation takes `&self`.
///
/// # Cleanup
///
/// Call [`Light::disconnect`] before dropping. A light dropped while still
/// connected logs a warning and stops its tasks, but cannot wait for the
/// link to close.
pub struct Light {
    session: Arc<Session>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    catalog: OnceLock<SceneCatalog>,
    name: String,
    model: Option<String>,
    address: String,
    disconnected: AtomicBool,
    config: ConnectionConfig,
}

impl std::fmt::Debug for Light {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Light")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Light {
    /// Find a light by address or name and connect to it.
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn connect(identifier: &str) -> Result<Self> {
        Self::connect_with_config(identifier, ConnectionConfig::default()).await
    }

    /// Find a light and connect with custom configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use govee_core::{ConnectionConfig, Light};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = ConnectionConfig::default().scene_dir("/var/lib/govee/scenes");
    ///     let light = Light::connect_with_config("Govee_H6199", config).await?;
    ///     light.set_power(true).await?;
    ///     light.disconnect().await?;
    ///     Ok(())
    /// }
    /// ```
    #[tracing::instrument(level = "info", skip_all, fields(identifier = %identifier))]
    pub async fn connect_with_config(identifier: &str, config: ConnectionConfig) -> Result<Self> {
        let options = ScanOptions::default()
            .duration(config.connection_timeout)
            .all_devices();
        let (adapter, peripheral) = find_device_with_options(identifier, options).await?;
        Self::from_peripheral(adapter, peripheral, config).await
    }

    /// Connect to an already-discovered peripheral.
    #[tracing::instrument(level = "info", skip_all)]
    pub async fn from_peripheral(
        adapter: Adapter,
        peripheral: Peripheral,
        config: ConnectionConfig,
    ) -> Result<Self> {
        let properties = peripheral.properties().await?;
        let name = properties
            .as_ref()
            .and_then(|p| p.local_name.clone())
            .unwrap_or_default();
        let address = properties
            .as_ref()
            .map(|p| create_identifier(&p.address.to_string(), &peripheral.id()))
            .unwrap_or_default();

        let (transport, inbound) = BleTransport::connect(
            adapter,
            peripheral,
            config.connection_timeout,
            config.discovery_timeout,
        )
        .await?;
        info!("Connected to Govee light: {} ({})", name, address);

        Ok(Self::from_transport(
            Arc::new(transport),
            inbound,
            name,
            address,
            config,
        ))
    }

    /// Start a session over any transport.
    ///
    /// Spawns the dispatch and heartbeat tasks, so it must be called within a
    /// Tokio runtime.
    pub fn from_transport(
        transport: Arc<dyn LightTransport>,
        inbound: Inbound,
        name: impl Into<String>,
        address: impl Into<String>,
        config: ConnectionConfig,
    ) -> Self {
        let name = name.into();
        let model = model_from_name(&name);
        if model.is_none() {
            debug!("No model in device name {:?}", name);
        }

        let session = Arc::new(Session::new(
            transport,
            EventDispatcher::new(config.event_capacity),
        ));
        let cancel = CancellationToken::new();

        let mut tasks = vec![tokio::spawn(run_dispatch(
            Arc::clone(&session),
            inbound,
            cancel.clone(),
        ))];
        if let Some(interval) = config.heartbeat_interval {
            tasks.push(tokio::spawn(run_heartbeat(
                Arc::clone(&session),
                interval,
                config.heartbeat_timeout,
                cancel.clone(),
            )));
        }

        Self {
            session,
            cancel,
            tasks: Mutex::new(tasks),
            catalog: OnceLock::new(),
            name,
            model,
            address: address.into(),
            disconnected: AtomicBool::new(false),
            config,
        }
    }

    /// Close the session: stop both tasks, fail every waiting call with
    /// [`Error::NotConnected`], and disconnect the transport.
    #[tracing::instrument(level = "info", skip_all, fields(address = %self.address))]
    pub async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from light...");
        self.disconnected.store(true, Ordering::SeqCst);
        self.stop_tasks();
        self.session.close();
        self.session.transport.disconnect().await
    }

    fn stop_tasks(&self) {
        self.cancel.cancel();
        let handles: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in handles {
            handle.abort();
        }
    }

    /// Whether the session is still open.
    pub fn is_connected(&self) -> bool {
        self.session.is_open()
    }

    /// Advertised device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Model parsed from the name, e.g. `H6199`.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Address or platform identifier.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> EventReceiver {
        self.session.events.subscribe()
    }

    // Raw access

    /// Read a register.
    pub async fn read(&self, register: Register) -> Result<Bytes> {
        self.session.request(RegisterKey::read(register), &[]).await
    }

    /// Write a register and wait for the acknowledgement.
    pub async fn write(&self, register: Register, data: &[u8]) -> Result<()> {
        self.session
            .request(RegisterKey::write(register), data)
            .await?;
        Ok(())
    }

    /// Send a multi-part write and wait for the acknowledgement.
    ///
    /// Concurrent calls must be serialized by the caller.
    pub async fn multi(&self, data: &[u8]) -> Result<()> {
        self.session.multi(data).await
    }

    /// Send arbitrary bytes as one frame without waiting for a reply.
    ///
    /// Any reply is reported as an unexpected frame event.
    pub async fn send_raw(&self, data: &[u8]) -> Result<()> {
        let frame = encode_raw(data)?;
        if !self.session.is_open() {
            return Err(Error::NotConnected);
        }
        self.session.send(&frame).await
    }

    /// Cached value of a register, reading it if it has not been seen yet.
    pub async fn cached(&self, register: Register) -> Result<Bytes> {
        let cached = self.session.state().cache.get(&register);
        match cached {
            Some(value) => Ok(value),
            None => self.read(register).await,
        }
    }

    /// Every cached register value, ordered by register.
    pub fn state(&self) -> Vec<(Register, Bytes)> {
        self.session.state().cache.snapshot()
    }

    // Power and dimmer

    pub async fn get_power(&self) -> Result<bool> {
        let value = self.cached(Register::POWER).await?;
        Ok(value.first().is_some_and(|b| *b != 0))
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        self.write(Register::POWER, &[u8::from(on)]).await
    }

    /// Global dimmer level, 0.0 to 1.0.
    pub async fn get_dimmer(&self) -> Result<f32> {
        let value = self.cached(Register::DIMMER).await?;
        Ok(percent_to_fraction(value.first().copied().unwrap_or(0)))
    }

    /// Set the global dimmer level, 0.0 to 1.0.
    pub async fn set_dimmer(&self, level: f32) -> Result<()> {
        let percent = fraction_to_percent("Dimmer", level)?;
        self.write(Register::DIMMER, &[percent]).await
    }

    // Colors and modes

    /// Colors of the segments selected by `mask`, in segment order.
    pub async fn get_segments(&self, mask: SegmentMask) -> Result<Vec<Argb>> {
        let mut segments = Vec::new();
        for index in mask.indices() {
            let (register, offset) = slot_location(segment_slot(index));
            let value = self.cached(register).await?;
            segments.push(slot_at(&value, offset));
        }
        Ok(segments)
    }

    /// Decode the current mode.
    pub async fn get_mode(&self) -> Result<Mode> {
        let value = self.cached(Register::MODE).await?;
        match classify(&value)? {
            ModeKind::Scene(code) => Ok(scene_mode(code)),
            ModeKind::Segments => {
                let segments: [Argb; SEGMENT_COUNT] = self
                    .get_segments(SegmentMask::ALL)
                    .await?
                    .try_into()
                    .map_err(|_| Error::InvalidData("Incomplete segment list".to_string()))?;
                Ok(segment_mode(segments))
            }
        }
    }

    /// Set the color of the segments in `mask`.
    ///
    /// Accepts an [`Rgb`] or an `(i32, i32, i32)` tuple; tuple channels
    /// outside 0..=255 fail with [`Error::InvalidRange`] before anything is
    /// sent.
    pub async fn set_color<C>(&self, color: C, mask: SegmentMask) -> Result<()>
    where
        C: TryInto<Rgb>,
        Error: From<C::Error>,
    {
        let rgb = color.try_into()?;
        let [lo, hi] = mask.to_le_bytes();
        let mut data = vec![MODE_SEGMENT, SEGMENT_SET_COLOR];
        data.extend_from_slice(&rgb.to_bytes());
        data.extend_from_slice(&[0; 5]);
        data.extend_from_slice(&[lo, hi]);
        self.write(Register::MODE, &data).await
    }

    /// Set the brightness (0.0 to 1.0) of the segments in `mask`.
    pub async fn set_brightness(&self, level: f32, mask: SegmentMask) -> Result<()> {
        let percent = fraction_to_percent("Brightness", level)?;
        let [lo, hi] = mask.to_le_bytes();
        self.write(
            Register::MODE,
            &[MODE_SEGMENT, SEGMENT_SET_BRIGHTNESS, percent, lo, hi],
        )
        .await
    }

    // Scenes

    /// The scene catalog for this light's model, loaded on first use.
    pub fn scenes(&self) -> &SceneCatalog {
        self.catalog.get_or_init(|| match &self.model {
            Some(model) => SceneCatalog::load(&self.config.scene_dir.join(format!("{model}.json"))),
            None => {
                warn!("No model in device name {:?}, no scene catalog", self.name);
                SceneCatalog::empty()
            }
        })
    }

    /// Use `catalog` instead of loading one from the scene directory.
    ///
    /// Returns `false` if a catalog was already loaded.
    pub fn set_catalog(&self, catalog: SceneCatalog) -> bool {
        self.catalog.set(catalog).is_ok()
    }

    /// Activate a scene by code, name, or `category-scene`.
    ///
    /// Cataloged scenes have their effect parameters sent first. Built-in
    /// scenes missing from the catalog are activated by code alone.
    pub async fn set_scene(&self, query: impl Into<SceneQuery>) -> Result<()> {
        let query = query.into();
        let (code, param) = match self.scenes().get(&query) {
            Some(scene) => {
                let effect = scene
                    .primary()
                    .ok_or_else(|| Error::UnknownScene(query.to_string()))?;
                (effect.code, effect.param.clone())
            }
            None => {
                let code =
                    builtin_scene(&query).ok_or_else(|| Error::UnknownScene(query.to_string()))?;
                (code, Vec::new())
            }
        };

        self.read(Register::POWER).await?;
        if !param.is_empty() {
            self.multi(&param).await?;
        }
        let [lo, hi] = code.to_le_bytes();
        self.write(Register::MODE, &[MODE_SCENE, lo, hi]).await
    }

    /// The cataloged scene currently active, if the light is in scene mode.
    pub async fn get_scene(&self) -> Result<Option<Arc<Scene>>> {
        match self.get_mode().await? {
            Mode::Scene { code, .. } => Ok(self.scenes().get(&SceneQuery::Code(code)).cloned()),
            _ => Ok(None),
        }
    }

    // Device information

    async fn cached_string(&self, register: Register) -> Result<String> {
        let value = self.cached(register).await?;
        String::from_utf8(value.to_vec())
            .map_err(|_| Error::InvalidData(format!("{} is not text: {}", register, hex::encode(&value))))
    }

    pub async fn get_version(&self) -> Result<String> {
        self.cached_string(Register::VERSION).await
    }

    pub async fn get_hw_version(&self) -> Result<String> {
        self.cached_string(Register::INFO_HW_VERSION).await
    }

    pub async fn get_fw_version(&self) -> Result<String> {
        self.cached_string(Register::INFO_FW_VERSION).await
    }

    /// MAC address as reported by the light.
    pub async fn get_mac(&self) -> Result<String> {
        Ok(format_mac(&self.cached(Register::INFO_MAC).await?))
    }

    /// Restart the light. The light does not acknowledge this.
    pub async fn restart(&self, reason: u8) -> Result<()> {
        let frame = encode_request(RegisterKey::write(Register::RESTART), &[reason])?;
        if !self.session.is_open() {
            return Err(Error::NotConnected);
        }
        self.session.send(&frame).await
    }

    /// Reason code of the last restart, from the power register.
    pub async fn get_restart_reason(&self) -> Result<u8> {
        let value = self.cached(Register::POWER).await?;
        Ok(value.first().copied().unwrap_or(0))
    }
}

impl Drop for Light {
    fn drop(&mut self) {
        if !self.disconnected.load(Ordering::SeqCst) {
            self.disconnected.store(true, Ordering::SeqCst);
            warn!(
                device_name = %self.name,
                device_address = %self.address,
                "Light dropped without calling disconnect()"
            );
            self.stop_tasks();
            self.session.close();
        }
    }
}
