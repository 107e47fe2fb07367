//! Device context
//!
//! [`Device`] owns everything the frame needs at runtime: the panel, the
//! image pipeline, the preference store, the radio and the role resolver.
//! The firmware's setup routine calls [`Device::boot`] once and its main loop
//! calls [`Device::poll_network`] and [`Device::tick`]; web handlers go
//! through [`Device::display_image_from_storage`] and
//! [`Device::save_credentials`].
//!
//! Boot picks what the panel shows:
//!
//! - access point: the setup instructions image, or the text placeholder
//! - station with a selected image on storage: that image, once
//! - station otherwise: the station info image, or the text placeholder
//!
//! Setup screens never replace the selected image.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::display::{Display, PanelState};
use crate::dns::CaptiveDns;
use crate::error::Error;
use crate::interface::PanelBus;
use crate::network::{Credentials, NetworkConfig, NetworkDriver, NetworkError, NetworkRole, RoleResolver};
use crate::pipeline::{ImagePipeline, PipelineError};
use crate::storage::{KeyValueStore, Preferences, Storage};

/// Default interval between scheduled refreshes, one hour
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Image shown in access point mode
pub const SETUP_AP_IMAGE: &str = "setup_ap.bin";

/// Image shown in station mode when nothing is selected
pub const SETUP_STATION_IMAGE: &str = "setup_station.bin";

/// Device-level settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Connection policy and access point settings
    pub network: NetworkConfig,
    /// Interval between scheduled refreshes in milliseconds, 0 disables them
    pub refresh_interval_ms: u64,
    /// Image shown in access point mode
    pub setup_ap_image: &'static str,
    /// Image shown in station mode when nothing is selected
    pub setup_station_image: &'static str,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            setup_ap_image: SETUP_AP_IMAGE,
            setup_station_image: SETUP_STATION_IMAGE,
        }
    }
}

/// Fixed-interval schedule driven by a monotonic millisecond clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshSchedule {
    interval_ms: u64,
    last_ms: Option<u64>,
}

impl RefreshSchedule {
    /// Schedule firing every `interval_ms`; 0 never fires
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    /// Whether the interval has passed since the last mark
    ///
    /// The first observation only starts the clock.
    pub fn due(&mut self, now_ms: u64) -> bool {
        if self.interval_ms == 0 {
            return false;
        }
        match self.last_ms {
            None => {
                self.last_ms = Some(now_ms);
                false
            }
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        }
    }

    /// Restart the interval at `now_ms`
    pub fn mark(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
    }

    /// Interval in milliseconds
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

/// Errors surfaced by [`Device`] operations
#[derive(Debug)]
pub enum DeviceError<I, S, K, N>
where
    I: PanelBus,
    S: Storage,
    K: KeyValueStore,
    N: NetworkDriver,
{
    /// Panel operation failed
    Display(Error<I>),
    /// Loading or showing a stored image failed
    Pipeline(PipelineError<I, S::Error, K::Error>),
    /// Role resolution or the radio failed
    Network(NetworkError<N::Error, K::Error>),
    /// The image store failed
    Storage(S::Error),
    /// The preference store failed
    Preferences(K::Error),
}

impl<I, S, K, N> core::fmt::Display for DeviceError<I, S, K, N>
where
    I: PanelBus,
    S: Storage,
    K: KeyValueStore,
    N: NetworkDriver,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Display(e) => write!(f, "{e}"),
            Self::Pipeline(e) => write!(f, "{e}"),
            Self::Network(e) => write!(f, "{e}"),
            Self::Storage(e) => write!(f, "Storage error: {e:?}"),
            Self::Preferences(e) => write!(f, "Preferences error: {e:?}"),
        }
    }
}

impl<I, S, K, N> core::error::Error for DeviceError<I, S, K, N>
where
    I: PanelBus + Debug,
    S: Storage + Debug,
    K: KeyValueStore + Debug,
    N: NetworkDriver + Debug,
{
}

type DeviceResult<T, I, S, K, N> = core::result::Result<T, DeviceError<I, S, K, N>>;

fn dotted(addr: [u8; 4]) -> String {
    format!("{}.{}.{}.{}", addr[0], addr[1], addr[2], addr[3])
}

/// Runtime context of one picture frame
pub struct Device<I, S, K, N>
where
    I: PanelBus,
{
    display: Display<I>,
    pipeline: ImagePipeline<S>,
    prefs: Preferences<K>,
    network: N,
    resolver: RoleResolver,
    dns: Option<CaptiveDns>,
    schedule: RefreshSchedule,
    config: DeviceConfig,
}

impl<I, S, K, N> Device<I, S, K, N>
where
    I: PanelBus,
    S: Storage,
    K: KeyValueStore,
    N: NetworkDriver,
{
    /// Assemble a device from its collaborators
    pub fn new(display: Display<I>, storage: S, store: K, network: N, config: DeviceConfig) -> Self {
        Self {
            display,
            pipeline: ImagePipeline::new(storage),
            prefs: Preferences::new(store),
            network,
            resolver: RoleResolver::new(config.network.clone()),
            dns: None,
            schedule: RefreshSchedule::new(config.refresh_interval_ms),
            config,
        }
    }

    /// Resolve the network role and put the first picture on the panel
    ///
    /// A pending re-resolution from [`save_credentials`](Self::save_credentials)
    /// is consumed here and starts a fresh boot cycle.
    pub fn boot<D: DelayNs>(&mut self, delay: &mut D) -> DeviceResult<NetworkRole, I, S, K, N> {
        if self.resolver.take_pending_reresolution() {
            info!("credentials changed, resolving network role again");
            self.resolver.reset();
            self.dns = None;
        }

        if self.display.state() == PanelState::Uninitialized {
            self.display.begin().map_err(DeviceError::Display)?;
        }
        if let Err(e) = self.pipeline.ensure_image_dir() {
            warn!("image directory unavailable: {e:?}");
        }

        let role = self
            .resolver
            .resolve(&mut self.network, &mut self.prefs, delay)
            .map_err(DeviceError::Network)?;

        match role {
            NetworkRole::AccessPoint => {
                self.dns = self.resolver.address().map(CaptiveDns::new);
                let address = self.resolver.address().map(dotted).unwrap_or_default();
                let message = format!(
                    "Connect to Wi-Fi \"{}\" and open http://{}",
                    self.config.network.ap_ssid, address
                );
                self.show_setup(self.config.setup_ap_image, &message, delay)?;
            }
            NetworkRole::Station => {
                self.dns = None;
                if !self.show_selected(delay)? {
                    let address = self.resolver.address().map(dotted).unwrap_or_default();
                    let message = format!("Open http://{address} to choose an image");
                    self.show_setup(self.config.setup_station_image, &message, delay)?;
                }
            }
        }
        Ok(role)
    }

    /// Show the persisted selection; `false` when there is none to show
    fn show_selected<D: DelayNs>(&mut self, delay: &mut D) -> DeviceResult<bool, I, S, K, N> {
        let Some(name) = self.prefs.selected_image().map_err(DeviceError::Preferences)? else {
            return Ok(false);
        };
        if !self.pipeline.contains(&name) {
            warn!("selected image {name} is gone");
            return Ok(false);
        }
        self.pipeline
            .display_image_from_storage(&mut self.display, &mut self.prefs, &name, delay)
            .map_err(DeviceError::Pipeline)?;
        Ok(true)
    }

    /// Show a setup image, falling back to the text placeholder
    fn show_setup<D: DelayNs>(
        &mut self,
        image: &str,
        message: &str,
        delay: &mut D,
    ) -> DeviceResult<(), I, S, K, N> {
        if self.pipeline.contains(image) {
            match self
                .pipeline
                .show_image::<I, K::Error, D>(&mut self.display, image, delay)
            {
                Ok(()) => return Ok(()),
                Err(PipelineError::Display(e)) => return Err(DeviceError::Display(e)),
                Err(e) => warn!("{image} unusable ({e}), showing text"),
            }
        }
        self.display
            .display_text(message, delay)
            .map_err(DeviceError::Display)
    }

    /// Show a stored image and make it the selected image
    pub fn display_image_from_storage<D: DelayNs>(
        &mut self,
        name: &str,
        delay: &mut D,
    ) -> DeviceResult<(), I, S, K, N> {
        self.pipeline
            .display_image_from_storage(&mut self.display, &mut self.prefs, name, delay)
            .map_err(DeviceError::Pipeline)
    }

    /// Names of the stored images
    pub fn list_images(&mut self) -> DeviceResult<Vec<String>, I, S, K, N> {
        self.pipeline.list_images().map_err(DeviceError::Storage)
    }

    /// Role resolved this boot cycle
    pub fn network_role(&self) -> Option<NetworkRole> {
        self.resolver.role()
    }

    /// Whether the station joined with stored credentials
    pub fn is_configured(&self) -> bool {
        self.resolver.is_configured()
    }

    /// Persist station credentials; the next [`boot`](Self::boot) re-resolves
    pub fn save_credentials(&mut self, credentials: &Credentials) -> DeviceResult<(), I, S, K, N> {
        self.resolver
            .save_credentials(&mut self.prefs, credentials)
            .map_err(DeviceError::Preferences)
    }

    /// Consume the pending re-resolution flag without booting
    pub fn take_pending_reresolution(&mut self) -> bool {
        self.resolver.take_pending_reresolution()
    }

    /// Serve at most one captive DNS query; a no-op outside access point mode
    pub fn poll_network(&mut self) -> DeviceResult<bool, I, S, K, N> {
        let Some(dns) = self.dns.as_mut() else {
            return Ok(false);
        };
        dns.poll(&mut self.network)
            .map_err(|e| DeviceError::Network(NetworkError::Driver(e)))
    }

    /// Re-show the selected image when the refresh interval has passed
    ///
    /// Returns whether a refresh ran. Only a station with a selected image
    /// refreshes.
    pub fn tick<D: DelayNs>(&mut self, now_ms: u64, delay: &mut D) -> DeviceResult<bool, I, S, K, N> {
        if !self.schedule.due(now_ms) {
            return Ok(false);
        }
        self.schedule.mark(now_ms);
        if self.resolver.role() != Some(NetworkRole::Station) {
            return Ok(false);
        }
        info!("scheduled refresh");
        self.show_selected(delay)
    }

    /// The panel driver
    pub fn display(&self) -> &Display<I> {
        &self.display
    }

    /// The image pipeline
    pub fn pipeline(&self) -> &ImagePipeline<S> {
        &self.pipeline
    }

    /// The preference store
    pub fn preferences(&self) -> &Preferences<K> {
        &self.prefs
    }

    /// The radio driver
    pub fn network(&self) -> &N {
        &self.network
    }

    /// The captive DNS responder, in access point mode
    pub fn dns(&self) -> Option<&CaptiveDns> {
        self.dns.as_ref()
    }

    /// Device settings
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Take the device apart
    pub fn release(self) -> (Display<I>, S, K, N) {
        (
            self.display,
            self.pipeline.release(),
            self.prefs.into_inner(),
            self.network,
        )
    }
}
