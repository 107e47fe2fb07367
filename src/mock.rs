//! Test doubles shared by the unit tests

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use embedded_hal::delay::DelayNs;

use crate::interface::{Controller, PanelBus};
use crate::network::{Credentials, NetworkDriver};
use crate::storage::{KeyValueStore, Storage};

/// One observable bus transaction
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Begin,
    Command(Controller, u8),
    Data(Controller, Vec<u8>),
    Power(bool),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MockBusError;

/// Records every transaction; the busy line is either always clear or stuck
#[derive(Debug, Default)]
pub struct MockBus {
    pub events: Vec<BusEvent>,
    pub stuck_busy: bool,
    pub busy_samples: u32,
    /// Fail the n-th data transaction (0-based)
    pub fail_data_at: Option<usize>,
    data_count: usize,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_data_at(index: usize) -> Self {
        Self {
            fail_data_at: Some(index),
            ..Self::default()
        }
    }

    pub fn stuck() -> Self {
        Self {
            stuck_busy: true,
            ..Self::default()
        }
    }

    /// Commands and data transfers, excluding pin-only events
    pub fn transactions(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BusEvent::Command(..) | BusEvent::Data(..)))
            .count()
    }

    pub fn commands(&self) -> Vec<(Controller, u8)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Command(c, cmd) => Some((*c, *cmd)),
                _ => None,
            })
            .collect()
    }

    pub fn count_command(&self, command: u8) -> usize {
        self.commands().iter().filter(|(_, c)| *c == command).count()
    }

    /// All data bytes sent to `controller` after each occurrence of `command`
    pub fn data_after(&self, controller: Controller, command: u8) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        for event in &self.events {
            match event {
                BusEvent::Command(c, cmd) if *c == controller => {
                    if let Some(done) = current.take() {
                        out.push(done);
                    }
                    if *cmd == command {
                        current = Some(Vec::new());
                    }
                }
                BusEvent::Data(c, bytes) if *c == controller => {
                    if let Some(buf) = current.as_mut() {
                        buf.extend_from_slice(bytes);
                    }
                }
                _ => {}
            }
        }
        if let Some(done) = current {
            out.push(done);
        }
        out
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl PanelBus for MockBus {
    type Error = MockBusError;

    fn begin(&mut self) -> Result<(), Self::Error> {
        self.events.push(BusEvent::Begin);
        Ok(())
    }

    fn send_command(&mut self, controller: Controller, command: u8) -> Result<(), Self::Error> {
        self.events.push(BusEvent::Command(controller, command));
        Ok(())
    }

    fn send_data(&mut self, controller: Controller, data: &[u8]) -> Result<(), Self::Error> {
        let index = self.data_count;
        self.data_count += 1;
        if self.fail_data_at == Some(index) {
            return Err(MockBusError);
        }
        self.events.push(BusEvent::Data(controller, data.to_vec()));
        Ok(())
    }

    fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
        self.events.push(BusEvent::Power(on));
        Ok(())
    }

    fn reset<D: DelayNs>(
        &mut self,
        delay: &mut D,
        hold_ms: u32,
        settle_ms: u32,
    ) -> Result<(), Self::Error> {
        delay.delay_ms(hold_ms);
        delay.delay_ms(settle_ms);
        self.events.push(BusEvent::Reset);
        Ok(())
    }

    fn is_busy(&mut self) -> Result<bool, Self::Error> {
        self.busy_samples += 1;
        Ok(self.stuck_busy)
    }
}

/// Simulated clock: delays advance time instead of sleeping
#[derive(Debug, Default)]
pub struct ClockDelay {
    pub elapsed_ns: u64,
}

impl ClockDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for ClockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ns += u64::from(ms) * 1_000_000;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageFault {
    Io,
}

/// Flat in-memory file store
#[derive(Debug, Default)]
pub struct MemoryStorage {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: Vec<String>,
    /// Paths whose reads return fewer bytes than their size
    pub truncated: Vec<String>,
    pub reads: Vec<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), bytes);
        self
    }
}

impl Storage for MemoryStorage {
    type Error = StorageFault;

    fn list(&mut self, dir: &str, suffix: &str) -> Result<Vec<String>, Self::Error> {
        let prefix = alloc::format!("{}/", dir.trim_end_matches('/'));
        Ok(self
            .files
            .keys()
            .filter_map(|path| path.strip_prefix(prefix.as_str()))
            .filter(|name| !name.contains('/') && name.ends_with(suffix))
            .map(ToString::to_string)
            .collect())
    }

    fn exists(&mut self, path: &str) -> bool {
        self.files.contains_key(path) || self.dirs.iter().any(|d| d == path)
    }

    fn mkdir(&mut self, path: &str) -> Result<(), Self::Error> {
        self.dirs.push(path.to_string());
        Ok(())
    }

    fn size(&mut self, path: &str) -> Result<Option<usize>, Self::Error> {
        Ok(self.files.get(path).map(Vec::len))
    }

    fn read(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.reads.push(path.to_string());
        let bytes = self.files.get(path).ok_or(StorageFault::Io)?;
        let mut n = bytes.len().min(buf.len());
        if self.truncated.iter().any(|p| p == path) {
            n /= 2;
        }
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

/// Namespaced key/value store that checks sessions are balanced
#[derive(Debug, Default)]
pub struct MemoryKv {
    pub values: BTreeMap<(String, String), String>,
    pub open: Option<(String, bool)>,
    pub sessions: u32,
    pub fail_puts: bool,
}

impl KeyValueStore for MemoryKv {
    type Error = StorageFault;

    fn begin(&mut self, namespace: &str, read_only: bool) -> Result<(), Self::Error> {
        assert!(self.open.is_none(), "nested key/value session");
        self.open = Some((namespace.to_string(), read_only));
        self.sessions += 1;
        Ok(())
    }

    fn end(&mut self) {
        self.open = None;
    }

    fn get(&mut self, key: &str) -> Result<Option<String>, Self::Error> {
        let (ns, _) = self.open.clone().ok_or(StorageFault::Io)?;
        Ok(self.values.get(&(ns, key.to_string())).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        let (ns, read_only) = self.open.clone().ok_or(StorageFault::Io)?;
        if read_only || self.fail_puts {
            return Err(StorageFault::Io);
        }
        self.values.insert((ns, key.to_string()), value.to_string());
        Ok(())
    }
}

/// Scripted radio: connects after `connect_after_polls` polls, or never
#[derive(Debug, Default)]
pub struct FakeNetwork {
    pub connect_after_polls: Option<u32>,
    pub station_attempts: Vec<Credentials>,
    pub connected_polls: u32,
    pub access_point: Option<(String, [u8; 4])>,
    pub dns_started: bool,
    pub inbox: Vec<(Vec<u8>, [u8; 4], u16)>,
    pub outbox: Vec<(Vec<u8>, [u8; 4], u16)>,
}

impl FakeNetwork {
    pub fn connecting_after(polls: u32) -> Self {
        Self {
            connect_after_polls: Some(polls),
            ..Self::default()
        }
    }

    pub fn never_connecting() -> Self {
        Self::default()
    }
}

impl NetworkDriver for FakeNetwork {
    type Error = StorageFault;

    fn begin_station(&mut self, credentials: &Credentials) -> Result<(), Self::Error> {
        self.station_attempts.push(credentials.clone());
        self.connected_polls = 0;
        Ok(())
    }

    fn is_connected(&mut self) -> Result<bool, Self::Error> {
        self.connected_polls += 1;
        Ok(self
            .connect_after_polls
            .is_some_and(|after| self.connected_polls > after))
    }

    fn station_address(&mut self) -> Option<[u8; 4]> {
        self.connect_after_polls.map(|_| [192, 168, 1, 42])
    }

    fn start_access_point(&mut self, ssid: &str, _password: &str) -> Result<[u8; 4], Self::Error> {
        let addr = [192, 168, 4, 1];
        self.access_point = Some((ssid.to_string(), addr));
        Ok(addr)
    }

    fn start_dns(&mut self) -> Result<(), Self::Error> {
        self.dns_started = true;
        Ok(())
    }

    fn recv_dns(&mut self, buf: &mut [u8]) -> Result<Option<(usize, [u8; 4], u16)>, Self::Error> {
        if self.inbox.is_empty() {
            return Ok(None);
        }
        let (bytes, addr, port) = self.inbox.remove(0);
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(Some((bytes.len(), addr, port)))
    }

    fn send_dns(&mut self, data: &[u8], addr: [u8; 4], port: u16) -> Result<(), Self::Error> {
        self.outbox.push((data.to_vec(), addr, port));
        Ok(())
    }
}
