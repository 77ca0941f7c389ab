//! Mock transport for testing.
//!
//! [`MockTransport`] stands in for a light at the far end of a
//! [`LightTransport`]. It keeps a register file, answers reads with the
//! stored value, applies and acknowledges writes, reassembles multi-part
//! writes, and records every frame it was sent.
//!
//! # Failure injection
//!
//! - [`MockTransport::silence`] drops replies for one key, so later replies
//!   supersede it.
//! - [`MockTransport::set_auto_reply`] turns off all replies.
//! - [`MockTransport::set_fail_writes`] makes every write fail.
//! - [`MockTransport::close`] ends the notification stream, as if the link
//!   dropped.
//! - [`MockTransport::inject`] pushes arbitrary bytes as a notification.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use govee_types::protocol::{
    MODE_SEGMENT, REG_BUFFER, SEGMENT_COUNT, SEGMENT_SET_BRIGHTNESS, SEGMENT_SET_COLOR, SLOT_LEN,
};
use govee_types::{
    Argb, Command, FRAME_LEN, Frame, MULTI_ACK, RawFrame, Register, RegisterKey, SegmentMask,
    encode, encode_request,
};

use crate::cache::{segment_slot, slot_location};
use crate::error::{Error, Result};
use crate::transport::{INBOUND_CAPACITY, Inbound, LightTransport};

/// Multi-part write being reassembled.
#[derive(Debug, Default)]
struct Transfer {
    data: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    registers: HashMap<Register, Vec<u8>>,
    written: Vec<RawFrame>,
    silenced: HashSet<RegisterKey>,
    transfer: Option<Transfer>,
    transfers: Vec<Vec<u8>>,
}

/// A simulated light.
///
/// # Example
///
/// ```
/// use govee_core::{ConnectionConfig, Light, MockTransport};
///
/// #[tokio::main]
/// async fn main() {
///     let (mock, inbound) = MockTransport::new();
///     let config = ConnectionConfig::default().heartbeat_interval(None);
///     let light = Light::from_transport(mock.clone(), inbound, "Govee_H6199_1A2B", "MOCK", config);
///
///     light.set_power(true).await.unwrap();
///     assert!(light.get_power().await.unwrap());
///     light.disconnect().await.unwrap();
/// }
/// ```
pub struct MockTransport {
    state: Mutex<MockState>,
    inbound: Mutex<Option<mpsc::Sender<Bytes>>>,
    auto_reply: AtomicBool,
    fail_writes: AtomicBool,
    write_count: AtomicU32,
    restarts: AtomicU32,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("write_count", &self.write_count.load(Ordering::Relaxed))
            .field("auto_reply", &self.auto_reply.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// Create a mock light with default register contents, and the inbound
    /// channel a session should consume.
    pub fn new() -> (std::sync::Arc<Self>, Inbound) {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let mock = Self {
            state: Mutex::new(MockState {
                registers: Self::default_registers(),
                ..MockState::default()
            }),
            inbound: Mutex::new(Some(tx)),
            auto_reply: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            write_count: AtomicU32::new(0),
            restarts: AtomicU32::new(0),
        };
        (std::sync::Arc::new(mock), rx)
    }

    fn default_registers() -> HashMap<Register, Vec<u8>> {
        let mut registers = HashMap::from([
            (Register::POWER, vec![0x01]),
            (Register::DIMMER, vec![100]),
            (Register::MODE, vec![MODE_SEGMENT]),
            (Register::VERSION, b"1.00.12".to_vec()),
            (Register::INFO_HW_VERSION, b"3.01.01".to_vec()),
            (Register::INFO_FW_VERSION, b"1.04.07".to_vec()),
            (
                Register::INFO_MAC,
                vec![0xD3, 0x39, 0x32, 0x35, 0x1A, 0x88],
            ),
        ]);
        // Every slot white at full brightness.
        for sub in 0..6u8 {
            registers.insert(Register::buffer(sub), [100, 255, 255, 255].repeat(3));
        }
        registers
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set a register's stored value.
    pub fn set_register(&self, register: Register, value: &[u8]) {
        self.state().registers.insert(register, value.to_vec());
    }

    /// A register's stored value.
    pub fn register(&self, register: Register) -> Option<Vec<u8>> {
        self.state().registers.get(&register).cloned()
    }

    /// Set every segment to `color`.
    pub fn set_segments(&self, color: Argb) {
        let mut state = self.state();
        for index in 0..SEGMENT_COUNT {
            Self::store_slot(&mut state.registers, index, |slot| {
                slot.copy_from_slice(&[color.brightness, color.r, color.g, color.b]);
            });
        }
    }

    /// Set one segment's color.
    pub fn set_segment(&self, index: usize, color: Argb) {
        let mut state = self.state();
        Self::store_slot(&mut state.registers, index, |slot| {
            slot.copy_from_slice(&[color.brightness, color.r, color.g, color.b]);
        });
    }

    /// Stop answering requests for `key`.
    pub fn silence(&self, key: RegisterKey) {
        self.state().silenced.insert(key);
    }

    /// Resume answering requests for `key`.
    pub fn unsilence(&self, key: &RegisterKey) {
        self.state().silenced.remove(key);
    }

    /// Enable or disable all replies.
    pub fn set_auto_reply(&self, enabled: bool) {
        self.auto_reply.store(enabled, Ordering::SeqCst);
    }

    /// Make every write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every frame written so far.
    pub fn written(&self) -> Vec<RawFrame> {
        self.state().written.clone()
    }

    /// Number of write calls, failed ones included.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Payloads of completed multi-part writes (with trailing padding).
    pub fn transfers(&self) -> Vec<Vec<u8>> {
        self.state().transfers.clone()
    }

    /// Number of restart requests received.
    pub fn restart_count(&self) -> u32 {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Push raw bytes to the session as if the light had sent them.
    pub async fn inject(&self, data: &[u8]) {
        let sender = self
            .inbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(sender) = sender {
            let _ = sender.send(Bytes::copy_from_slice(data)).await;
        }
    }

    /// End the notification stream.
    pub fn close(&self) {
        self.inbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    fn store_slot(
        registers: &mut HashMap<Register, Vec<u8>>,
        index: usize,
        update: impl FnOnce(&mut [u8]),
    ) {
        let (register, offset) = slot_location(segment_slot(index));
        let value = registers.entry(register).or_default();
        if value.len() < offset + SLOT_LEN {
            value.resize(offset + SLOT_LEN, 0);
        }
        update(&mut value[offset..offset + SLOT_LEN]);
    }

    /// Apply a register write the way the light would.
    fn apply_write(state: &mut MockState, register: Register, value: &[u8]) {
        if register == Register::MODE && value.first() == Some(&MODE_SEGMENT) {
            let byte = |i: usize| value.get(i).copied().unwrap_or(0);
            match byte(1) {
                SEGMENT_SET_COLOR => {
                    let mask = SegmentMask::from_bits(u16::from_le_bytes([byte(10), byte(11)]));
                    let rgb = [byte(2), byte(3), byte(4)];
                    for index in mask.indices() {
                        Self::store_slot(&mut state.registers, index, |slot| {
                            slot[1..].copy_from_slice(&rgb);
                        });
                    }
                }
                SEGMENT_SET_BRIGHTNESS => {
                    let mask = SegmentMask::from_bits(u16::from_le_bytes([byte(3), byte(4)]));
                    let brightness = byte(2);
                    for index in mask.indices() {
                        Self::store_slot(&mut state.registers, index, |slot| {
                            slot[0] = brightness;
                        });
                    }
                }
                _ => {}
            }
            state.registers.insert(Register::MODE, vec![MODE_SEGMENT]);
        } else if register.address() != REG_BUFFER {
            state.registers.insert(register, value.to_vec());
        }
    }

    /// Feed one multi-part frame; returns `true` when the transfer completed.
    fn apply_multi(state: &mut MockState, frame: &[u8]) -> bool {
        let seq = frame[1];
        if seq == 0x00 {
            let count = frame[3];
            let transfer = Transfer {
                data: frame[5..FRAME_LEN - 1].to_vec(),
            };
            if count <= 1 {
                state.transfers.push(transfer.data);
                return true;
            }
            state.transfer = Some(transfer);
            return false;
        }

        let Some(transfer) = state.transfer.as_mut() else {
            return false;
        };
        transfer.data.extend_from_slice(&frame[2..FRAME_LEN - 1]);
        if seq == 0xFF {
            if let Some(done) = state.transfer.take() {
                state.transfers.push(done.data);
            }
            return true;
        }
        false
    }

    /// Build the reply the light would send for `frame`, if any.
    fn respond(&self, frame: &[u8]) -> Option<RawFrame> {
        let mut state = self.state();
        state.written.push(frame.try_into().ok()?);

        if frame.first() == Some(&Command::Multi.byte()) && frame.len() == FRAME_LEN {
            let done = Self::apply_multi(&mut state, frame);
            if !done || state.silenced.contains(&MULTI_ACK) {
                return None;
            }
            return encode_request(MULTI_ACK, &[]).ok();
        }

        let request = Frame::decode(frame).ok()?;
        if state.silenced.contains(&request.key) {
            return None;
        }
        let register = request.key.register;
        match request.key.command {
            Command::Read => {
                let value = state.registers.get(&register).cloned().unwrap_or_default();
                encode_request(request.key, &value).ok()
            }
            Command::Write if register == Register::RESTART => {
                self.restarts.fetch_add(1, Ordering::SeqCst);
                None
            }
            Command::Write => {
                Self::apply_write(&mut state, register, &request.value);
                encode_request(request.key, &request.value).ok()
            }
            Command::Multi => None,
        }
    }
}

#[async_trait]
impl LightTransport for MockTransport {
    async fn write(&self, frame: &[u8]) -> Result<()> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::InvalidData("Mock write failure".to_string()));
        }

        let reply = self.respond(frame);
        if let Some(reply) = reply
            && self.auto_reply.load(Ordering::SeqCst)
        {
            self.inject(&reply).await;
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.close();
        Ok(())
    }
}

/// Encode a frame the way the light would send it. Test helper.
pub fn light_frame(command: Command, payload: &[u8]) -> RawFrame {
    encode(command, payload).unwrap_or([0; FRAME_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn written_reply(mock: &MockTransport, inbound: &mut Inbound, frame: RawFrame) -> Frame {
        mock.write(&frame).await.unwrap();
        Frame::decode(&inbound.recv().await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_read_returns_register() {
        let (mock, mut inbound) = MockTransport::new();
        let request = encode_request(RegisterKey::read(Register::DIMMER), &[]).unwrap();
        let reply = written_reply(&mock, &mut inbound, request).await;
        assert_eq!(reply.key, RegisterKey::read(Register::DIMMER));
        assert_eq!(&reply.value[..], &[100]);
    }

    #[tokio::test]
    async fn test_write_is_applied_and_acked() {
        let (mock, mut inbound) = MockTransport::new();
        let request = encode_request(RegisterKey::write(Register::DIMMER), &[37]).unwrap();
        let reply = written_reply(&mock, &mut inbound, request).await;
        assert_eq!(reply.key, RegisterKey::write(Register::DIMMER));
        assert_eq!(mock.register(Register::DIMMER), Some(vec![37]));
    }

    #[tokio::test]
    async fn test_segment_color_write_updates_buffer() {
        let (mock, mut inbound) = MockTransport::new();
        let mask = SegmentMask::single(0).unwrap().to_le_bytes();
        let request = encode_request(
            RegisterKey::write(Register::MODE),
            &[MODE_SEGMENT, SEGMENT_SET_COLOR, 1, 2, 3, 0, 0, 0, 0, 0, mask[0], mask[1]],
        )
        .unwrap();
        written_reply(&mock, &mut inbound, request).await;

        // Segment 0 lives in the first slot of buffer sub-register 1.
        let buffer = mock.register(Register::buffer(1)).unwrap();
        assert_eq!(&buffer[..4], &[100, 1, 2, 3]);
        assert_eq!(&buffer[4..8], &[100, 255, 255, 255]);
    }

    #[tokio::test]
    async fn test_multi_part_write_acked_once() {
        let (mock, mut inbound) = MockTransport::new();
        let data: Vec<u8> = (1..=47).collect();
        for frame in govee_types::chunk::split(&data).unwrap() {
            mock.write(&frame).await.unwrap();
        }
        let ack = Frame::decode(&inbound.recv().await.unwrap()).unwrap();
        assert_eq!(ack.key, MULTI_ACK);
        assert!(inbound.try_recv().is_err());
        assert_eq!(&mock.transfers()[0][..47], &data[..]);
    }

    #[tokio::test]
    async fn test_silenced_key_gets_no_reply() {
        let (mock, mut inbound) = MockTransport::new();
        mock.silence(RegisterKey::read(Register::POWER));
        let request = encode_request(RegisterKey::read(Register::POWER), &[]).unwrap();
        mock.write(&request).await.unwrap();
        assert!(inbound.try_recv().is_err());
        assert_eq!(mock.written().len(), 1);
    }

    #[tokio::test]
    async fn test_restart_is_not_acked() {
        let (mock, mut inbound) = MockTransport::new();
        let request = encode_request(RegisterKey::write(Register::RESTART), &[1]).unwrap();
        mock.write(&request).await.unwrap();
        assert!(inbound.try_recv().is_err());
        assert_eq!(mock.restart_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_writes() {
        let (mock, _inbound) = MockTransport::new();
        mock.set_fail_writes(true);
        let request = encode_request(RegisterKey::read(Register::POWER), &[]).unwrap();
        assert!(mock.write(&request).await.is_err());
        assert_eq!(mock.write_count(), 1);
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let (mock, mut inbound) = MockTransport::new();
        mock.close();
        assert!(inbound.recv().await.is_none());
    }
}
