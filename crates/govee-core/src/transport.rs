//! The link between a session and a light.
//!
//! A session only needs two things from the link: a way to write a frame,
//! and a stream of inbound notifications. [`LightTransport`] covers the first;
//! the second is an [`Inbound`] channel handed over when the link is opened.
//! The channel closing means the link is gone.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use govee_types::uuids::{RECV_CHARACTERISTIC, REGISTER_SERVICE, SEND_CHARACTERISTIC};

use crate::error::{Error, Result};

/// Inbound notification payloads, in arrival order.
pub type Inbound = mpsc::Receiver<Bytes>;

/// Capacity of the inbound notification channel.
pub const INBOUND_CAPACITY: usize = 64;

/// Outbound half of a link to a light.
///
/// Implemented by [`BleTransport`] for real hardware and by
/// [`MockTransport`](crate::mock::MockTransport) for tests.
#[async_trait]
pub trait LightTransport: Send + Sync {
    /// Write one encoded frame.
    async fn write(&self, frame: &[u8]) -> Result<()>;

    /// Tear down the link.
    async fn disconnect(&self) -> Result<()>;
}

/// A BLE link over btleplug.
pub struct BleTransport {
    /// Kept alive for the lifetime of the peripheral connection.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    send: Characteristic,
    write_type: WriteType,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for BleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleTransport")
            .field("send", &self.send.uuid)
            .field("write_type", &self.write_type)
            .finish_non_exhaustive()
    }
}

impl BleTransport {
    /// Connect to `peripheral`, subscribe to replies, and start forwarding
    /// notifications.
    #[tracing::instrument(level = "info", skip_all, fields(connect_timeout = ?connection_timeout))]
    pub async fn connect(
        adapter: Adapter,
        peripheral: Peripheral,
        connection_timeout: Duration,
        discovery_timeout: Duration,
    ) -> Result<(Self, Inbound)> {
        info!("Connecting to device...");
        timeout(connection_timeout, peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to device", connection_timeout))??;
        info!("Connected!");

        info!("Discovering services...");
        timeout(discovery_timeout, peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", discovery_timeout))??;

        let services = peripheral.services();
        debug!("Found {} services", services.len());
        let service = services
            .iter()
            .find(|s| s.uuid == REGISTER_SERVICE)
            .ok_or_else(|| {
                Error::characteristic_not_found(REGISTER_SERVICE.to_string(), services.len())
            })?;
        let find = |uuid: uuid::Uuid| {
            service
                .characteristics
                .iter()
                .find(|c| c.uuid == uuid)
                .cloned()
                .ok_or_else(|| Error::characteristic_not_found(uuid.to_string(), services.len()))
        };
        let recv = find(RECV_CHARACTERISTIC)?;
        let send = find(SEND_CHARACTERISTIC)?;

        let write_type = if send
            .properties
            .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE)
        {
            WriteType::WithoutResponse
        } else {
            WriteType::WithResponse
        };

        peripheral.subscribe(&recv).await?;
        let mut stream = peripheral.notifications().await?;
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);

        let pump = tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                if notification.uuid != RECV_CHARACTERISTIC {
                    warn!(
                        "Notice from unexpected characteristic ({}): {}",
                        notification.uuid,
                        hex::encode(&notification.value)
                    );
                }
                if tx.send(Bytes::from(notification.value)).await.is_err() {
                    break;
                }
            }
            debug!("Notification stream ended");
        });

        Ok((
            Self {
                adapter,
                peripheral,
                send,
                write_type,
                pump: Mutex::new(Some(pump)),
            },
            rx,
        ))
    }

    fn stop_pump(&self) {
        let handle = self
            .pump
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

#[async_trait]
impl LightTransport for BleTransport {
    async fn write(&self, frame: &[u8]) -> Result<()> {
        self.peripheral
            .write(&self.send, frame, self.write_type)
            .await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.stop_pump();
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

impl Drop for BleTransport {
    fn drop(&mut self) {
        self.stop_pump();
    }
}
