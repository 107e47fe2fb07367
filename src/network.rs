//! Network role state machine
//!
//! At boot the device is either a Wi-Fi station on the home network or a
//! provisioning access point. [`RoleResolver`] decides once per boot cycle:
//!
//! ```text
//! Unresolved ──no credentials──────────────▶ AccessPoint
//!     │
//!     └──credentials──▶ connect wait ──ok──▶ Station (configured)
//!                            │
//!                            └──timeout───▶ AccessPoint (not configured)
//! ```
//!
//! A station that times out is not retried until the next boot cycle. Saving
//! new credentials does not restart anything; it raises a pending
//! re-resolution flag that the boot sequence consumes.
//!
//! The radio itself sits behind [`NetworkDriver`], so the whole machine runs
//! against a scripted driver in tests.

use alloc::string::String;
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::storage::{KeyValueStore, Preferences};
use crate::wait::{BoundedWait, WaitOutcome};

/// Default number of one-interval connect polls before giving up
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 20;

/// Default interval between connect polls in milliseconds
pub const DEFAULT_CONNECT_POLL_MS: u32 = 1000;

/// Default provisioning access point name
pub const DEFAULT_AP_SSID: &str = "EPD-Setup";

/// Wi-Fi station credentials
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    /// Network name
    pub ssid: String,
    /// Passphrase, empty for an open network
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }
}

impl From<(String, String)> for Credentials {
    fn from((ssid, password): (String, String)) -> Self {
        Self { ssid, password }
    }
}

/// Wi-Fi role of the device for one boot cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkRole {
    /// Client on the home network
    Station,
    /// Provisioning hotspot with captive DNS
    AccessPoint,
}

/// Radio operations the resolver and the captive DNS responder need
pub trait NetworkDriver {
    /// Error type for radio operations
    type Error: Debug;

    /// Start joining a network; completion is observed with
    /// [`is_connected`](Self::is_connected)
    fn begin_station(&mut self, credentials: &Credentials) -> Result<(), Self::Error>;

    /// Whether the station link is up
    fn is_connected(&mut self) -> Result<bool, Self::Error>;

    /// Station IPv4 address, once connected
    fn station_address(&mut self) -> Option<[u8; 4]>;

    /// Bring up the provisioning access point and return its IPv4 address
    fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<[u8; 4], Self::Error>;

    /// Bind the DNS socket (UDP port 53)
    fn start_dns(&mut self) -> Result<(), Self::Error>;

    /// Receive one pending DNS datagram, if any, as `(len, source, port)`
    fn recv_dns(&mut self, buf: &mut [u8]) -> Result<Option<(usize, [u8; 4], u16)>, Self::Error>;

    /// Send a DNS datagram
    fn send_dns(&mut self, data: &[u8], addr: [u8; 4], port: u16) -> Result<(), Self::Error>;
}

/// Connection policy and access point settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Connect polls before falling back to the access point; 0 samples the
    /// link once without waiting
    pub connect_attempts: u32,
    /// Interval between connect polls in milliseconds
    pub connect_poll_ms: u32,
    /// Access point name
    pub ap_ssid: String,
    /// Access point passphrase, empty for an open hotspot
    pub ap_password: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_poll_ms: DEFAULT_CONNECT_POLL_MS,
            ap_ssid: String::from(DEFAULT_AP_SSID),
            ap_password: String::new(),
        }
    }
}

/// Errors while resolving the network role
///
/// A station connect timeout is not an error; it resolves to
/// [`NetworkRole::AccessPoint`].
#[derive(Debug)]
pub enum NetworkError<N, K> {
    /// The radio driver failed
    Driver(N),
    /// Stored credentials could not be read or written
    Preferences(K),
}

impl<N: Debug, K: Debug> core::fmt::Display for NetworkError<N, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Driver(e) => write!(f, "Network driver error: {e:?}"),
            Self::Preferences(e) => write!(f, "Preferences error: {e:?}"),
        }
    }
}

impl<N: Debug, K: Debug> core::error::Error for NetworkError<N, K> {}

/// Decides and caches the network role for a boot cycle
#[derive(Debug, Default)]
pub struct RoleResolver {
    config: NetworkConfig,
    role: Option<NetworkRole>,
    configured: bool,
    address: Option<[u8; 4]>,
    pending_reresolution: bool,
}

impl RoleResolver {
    /// Create an unresolved resolver
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Resolve the role, or return the role already resolved this cycle
    ///
    /// Only the first call touches the radio.
    pub fn resolve<N, K, D>(
        &mut self,
        driver: &mut N,
        prefs: &mut Preferences<K>,
        delay: &mut D,
    ) -> Result<NetworkRole, NetworkError<N::Error, K::Error>>
    where
        N: NetworkDriver,
        K: KeyValueStore,
        D: DelayNs,
    {
        if let Some(role) = self.role {
            return Ok(role);
        }

        let stored = prefs.credentials().map_err(NetworkError::Preferences)?;
        let role = match stored.map(Credentials::from) {
            None => {
                info!("no stored credentials");
                self.start_access_point(driver)
                    .map_err(NetworkError::Driver)?
            }
            Some(credentials) => {
                let joined = self
                    .connect(driver, &credentials, delay)
                    .map_err(NetworkError::Driver)?;
                if joined {
                    self.configured = true;
                    self.address = driver.station_address();
                    info!("joined {} as {:?}", credentials.ssid, self.address);
                    NetworkRole::Station
                } else {
                    warn!(
                        "could not join {}, staying in access point mode until next boot",
                        credentials.ssid
                    );
                    self.start_access_point(driver)
                        .map_err(NetworkError::Driver)?
                }
            }
        };

        self.role = Some(role);
        Ok(role)
    }

    fn connect<N, D>(
        &self,
        driver: &mut N,
        credentials: &Credentials,
        delay: &mut D,
    ) -> Result<bool, N::Error>
    where
        N: NetworkDriver,
        D: DelayNs,
    {
        driver.begin_station(credentials)?;
        if self.config.connect_attempts == 0 {
            return driver.is_connected();
        }

        let poll_ms = self.config.connect_poll_ms;
        let wait = BoundedWait::new(
            self.config.connect_attempts.saturating_mul(poll_ms),
            poll_ms,
        );
        let outcome = wait.poll(delay, || driver.is_connected().map(|up| !up))?;
        Ok(matches!(outcome, WaitOutcome::Ready { .. }))
    }

    fn start_access_point<N: NetworkDriver>(
        &mut self,
        driver: &mut N,
    ) -> Result<NetworkRole, N::Error> {
        let address =
            driver.start_access_point(&self.config.ap_ssid, &self.config.ap_password)?;
        driver.start_dns()?;
        self.configured = false;
        self.address = Some(address);
        info!("access point {} up at {:?}", self.config.ap_ssid, address);
        Ok(NetworkRole::AccessPoint)
    }

    /// Persist new station credentials and flag the role for re-resolution
    pub fn save_credentials<K: KeyValueStore>(
        &mut self,
        prefs: &mut Preferences<K>,
        credentials: &Credentials,
    ) -> Result<(), K::Error> {
        prefs.set_credentials(&credentials.ssid, &credentials.password)?;
        self.pending_reresolution = true;
        info!("credentials saved for {}", credentials.ssid);
        Ok(())
    }

    /// Consume the pending re-resolution flag
    pub fn take_pending_reresolution(&mut self) -> bool {
        core::mem::take(&mut self.pending_reresolution)
    }

    /// Whether a re-resolution is pending
    pub fn reresolution_pending(&self) -> bool {
        self.pending_reresolution
    }

    /// Forget the resolved role so the next [`resolve`](Self::resolve)
    /// starts a new boot cycle
    pub fn reset(&mut self) {
        self.role = None;
        self.configured = false;
        self.address = None;
    }

    /// Role resolved this cycle, `None` before [`resolve`](Self::resolve)
    pub fn role(&self) -> Option<NetworkRole> {
        self.role
    }

    /// Whether the station joined with stored credentials
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Device address in the resolved role
    pub fn address(&self) -> Option<[u8; 4]> {
        self.address
    }

    /// Connection policy in use
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ClockDelay, FakeNetwork, MemoryKv};

    fn prefs_with(credentials: Option<(&str, &str)>) -> Preferences<MemoryKv> {
        let mut prefs = Preferences::new(MemoryKv::default());
        if let Some((ssid, password)) = credentials {
            prefs.set_credentials(ssid, password).unwrap();
        }
        prefs
    }

    #[test]
    fn test_no_credentials_resolves_access_point() {
        let mut resolver = RoleResolver::default();
        let mut driver = FakeNetwork::connecting_after(0);
        let mut prefs = prefs_with(None);
        let mut delay = ClockDelay::default();

        let role = resolver.resolve(&mut driver, &mut prefs, &mut delay).unwrap();

        assert_eq!(role, NetworkRole::AccessPoint);
        assert!(!resolver.is_configured());
        assert!(driver.station_attempts.is_empty());
        assert!(driver.dns_started);
        assert_eq!(
            driver.access_point,
            Some((String::from(DEFAULT_AP_SSID), [192, 168, 4, 1]))
        );
        assert_eq!(resolver.address(), Some([192, 168, 4, 1]));
        assert_eq!(delay.elapsed_ns, 0);
    }

    #[test]
    fn test_credentials_and_connect_resolve_station() {
        let mut resolver = RoleResolver::default();
        let mut driver = FakeNetwork::connecting_after(0);
        let mut prefs = prefs_with(Some(("home", "hunter22")));
        let mut delay = ClockDelay::default();

        let role = resolver.resolve(&mut driver, &mut prefs, &mut delay).unwrap();

        assert_eq!(role, NetworkRole::Station);
        assert!(resolver.is_configured());
        assert_eq!(resolver.address(), Some([192, 168, 1, 42]));
        assert_eq!(
            driver.station_attempts,
            alloc::vec![Credentials::new("home", "hunter22")]
        );
        assert!(!driver.dns_started);
        assert!(driver.access_point.is_none());
    }

    #[test]
    fn test_slow_connect_within_ceiling_resolves_station() {
        let mut resolver = RoleResolver::default();
        let mut driver = FakeNetwork::connecting_after(5);
        let mut prefs = prefs_with(Some(("home", "pw")));
        let mut delay = ClockDelay::default();

        let role = resolver.resolve(&mut driver, &mut prefs, &mut delay).unwrap();

        assert_eq!(role, NetworkRole::Station);
        assert_eq!(delay.elapsed_ms(), 5_000);
    }

    #[test]
    fn test_connect_timeout_falls_back_without_retry() {
        let mut resolver = RoleResolver::default();
        let mut driver = FakeNetwork::never_connecting();
        let mut prefs = prefs_with(Some(("home", "wrong")));
        let mut delay = ClockDelay::default();

        let role = resolver.resolve(&mut driver, &mut prefs, &mut delay).unwrap();

        assert_eq!(role, NetworkRole::AccessPoint);
        assert!(!resolver.is_configured());
        assert!(driver.dns_started);
        assert_eq!(delay.elapsed_ms(), 20_000);
        // 20 one-second polls plus the initial sample
        assert_eq!(driver.connected_polls, 21);

        let again = resolver.resolve(&mut driver, &mut prefs, &mut delay).unwrap();
        assert_eq!(again, NetworkRole::AccessPoint);
        assert_eq!(driver.station_attempts.len(), 1);
        assert_eq!(delay.elapsed_ms(), 20_000);
    }

    #[test]
    fn test_connect_policy_is_configurable() {
        let mut resolver = RoleResolver::new(NetworkConfig {
            connect_attempts: 3,
            connect_poll_ms: 500,
            ..NetworkConfig::default()
        });
        let mut driver = FakeNetwork::never_connecting();
        let mut prefs = prefs_with(Some(("home", "pw")));
        let mut delay = ClockDelay::default();

        resolver.resolve(&mut driver, &mut prefs, &mut delay).unwrap();

        assert_eq!(delay.elapsed_ms(), 1_500);
    }

    #[test]
    fn test_zero_connect_attempts_samples_once_and_falls_back() {
        let mut resolver = RoleResolver::new(NetworkConfig {
            connect_attempts: 0,
            ..NetworkConfig::default()
        });
        let mut driver = FakeNetwork::never_connecting();
        let mut prefs = prefs_with(Some(("home", "pw")));
        let mut delay = ClockDelay::default();

        let role = resolver.resolve(&mut driver, &mut prefs, &mut delay).unwrap();

        assert_eq!(role, NetworkRole::AccessPoint);
        assert_eq!(driver.connected_polls, 1);
        assert_eq!(delay.elapsed_ns, 0);
        assert!(driver.dns_started);
    }

    #[test]
    fn test_zero_connect_attempts_accepts_an_existing_link() {
        let mut resolver = RoleResolver::new(NetworkConfig {
            connect_attempts: 0,
            ..NetworkConfig::default()
        });
        let mut driver = FakeNetwork::connecting_after(0);
        let mut prefs = prefs_with(Some(("home", "pw")));
        let mut delay = ClockDelay::default();

        let role = resolver.resolve(&mut driver, &mut prefs, &mut delay).unwrap();

        assert_eq!(role, NetworkRole::Station);
        assert_eq!(driver.connected_polls, 1);
    }

    #[test]
    fn test_save_credentials_raises_pending_flag_once() {
        let mut resolver = RoleResolver::default();
        let mut prefs = prefs_with(None);

        assert!(!resolver.take_pending_reresolution());
        resolver
            .save_credentials(&mut prefs, &Credentials::new("home", "pw"))
            .unwrap();

        assert!(resolver.reresolution_pending());
        assert!(resolver.take_pending_reresolution());
        assert!(!resolver.take_pending_reresolution());
        assert_eq!(
            prefs.credentials().unwrap(),
            Some((String::from("home"), String::from("pw")))
        );
    }

    #[test]
    fn test_reset_starts_a_new_cycle() {
        let mut resolver = RoleResolver::default();
        let mut driver = FakeNetwork::connecting_after(0);
        let mut prefs = prefs_with(None);
        let mut delay = ClockDelay::default();

        assert_eq!(
            resolver.resolve(&mut driver, &mut prefs, &mut delay).unwrap(),
            NetworkRole::AccessPoint
        );
        resolver
            .save_credentials(&mut prefs, &Credentials::new("home", "pw"))
            .unwrap();
        resolver.reset();

        assert_eq!(resolver.role(), None);
        assert_eq!(
            resolver.resolve(&mut driver, &mut prefs, &mut delay).unwrap(),
            NetworkRole::Station
        );
    }
}
