//! Storage-to-panel image pipeline
//!
//! [`ImagePipeline`] owns the image store. A display request resolves the
//! file under `/images`, reads it into a buffer sized exactly to the file,
//! checks it is a full frame for the panel and hands it to
//! [`Display::display_bitmap`]. The name is persisted as the selected image
//! only after the panel has refreshed and gone back to sleep, so a failed
//! request never changes what the next boot shows.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut pipeline = ImagePipeline::new(sd_card);
//! pipeline.ensure_image_dir()?;
//! for name in pipeline.list_images()? {
//!     log::info!("found {name}");
//! }
//! pipeline.display_image_from_storage(&mut display, &mut prefs, "cat", &mut delay)?;
//! ```

use alloc::string::String;
use alloc::vec::Vec;
use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::display::Display;
use crate::error::Error;
use crate::interface::PanelBus;
use crate::storage::{IMAGE_DIR, IMAGE_SUFFIX, KeyValueStore, Preferences, Storage, image_path};

/// Ways a display-from-storage request can fail
///
/// None of them leave the selected image changed.
#[derive(Debug)]
pub enum PipelineError<I: PanelBus, S, K> {
    /// The store failed to list, size or read
    Storage(S),
    /// No file with that name
    NotFound,
    /// The name is not a bare filename
    InvalidName,
    /// The frame buffer could not be allocated
    Allocation {
        /// Bytes requested
        requested: usize,
    },
    /// Fewer bytes were read than the store reported
    ShortRead {
        /// Reported file size
        expected: usize,
        /// Bytes actually read
        read: usize,
    },
    /// The file is not one full frame for this panel
    FrameSize {
        /// Panel frame size in bytes
        expected: usize,
        /// File size in bytes
        provided: usize,
    },
    /// The panel operation failed
    Display(Error<I>),
    /// The selected image could not be persisted
    Preferences(K),
}

impl<I, S, K> core::fmt::Display for PipelineError<I, S, K>
where
    I: PanelBus,
    S: core::fmt::Debug,
    K: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "Storage error: {e:?}"),
            Self::NotFound => write!(f, "Image not found"),
            Self::InvalidName => write!(f, "Invalid image name"),
            Self::Allocation { requested } => {
                write!(f, "Could not allocate {requested} bytes")
            }
            Self::ShortRead { expected, read } => {
                write!(f, "Short read: {read} of {expected} bytes")
            }
            Self::FrameSize { expected, provided } => write!(
                f,
                "Image is {provided} bytes, panel frame is {expected} bytes"
            ),
            Self::Display(e) => write!(f, "{e}"),
            Self::Preferences(e) => write!(f, "Preferences error: {e:?}"),
        }
    }
}

impl<I, S, K> core::error::Error for PipelineError<I, S, K>
where
    I: PanelBus + core::fmt::Debug,
    S: core::fmt::Debug,
    K: core::fmt::Debug,
{
}

type PipelineResult<T, I, S, K> =
    core::result::Result<T, PipelineError<I, <S as Storage>::Error, <K as KeyValueStore>::Error>>;

/// Loads frame images from a [`Storage`] and shows them on the panel
pub struct ImagePipeline<S> {
    storage: S,
}

impl<S: Storage> ImagePipeline<S> {
    /// Create a pipeline over an image store
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Create `/images` if it does not exist yet
    pub fn ensure_image_dir(&mut self) -> Result<(), S::Error> {
        if !self.storage.exists(IMAGE_DIR) {
            info!("creating {IMAGE_DIR}");
            self.storage.mkdir(IMAGE_DIR)?;
        }
        Ok(())
    }

    /// Names of the stored images, in storage order
    pub fn list_images(&mut self) -> Result<Vec<String>, S::Error> {
        self.storage.list(IMAGE_DIR, IMAGE_SUFFIX)
    }

    /// Whether an image with this name is stored
    pub fn contains(&mut self, name: &str) -> bool {
        image_path(name).is_some_and(|path| self.storage.exists(&path))
    }

    /// Show a stored image and remember it as the selected image
    ///
    /// The whole file is read into one buffer of exactly the reported size.
    /// The buffer is dropped before this returns on every path.
    pub fn display_image_from_storage<I, K, D>(
        &mut self,
        display: &mut Display<I>,
        prefs: &mut Preferences<K>,
        name: &str,
        delay: &mut D,
    ) -> PipelineResult<(), I, S, K>
    where
        I: PanelBus,
        K: KeyValueStore,
        D: DelayNs,
    {
        self.show_image::<I, K::Error, D>(display, name, delay)?;
        prefs
            .set_selected_image(name)
            .map_err(PipelineError::Preferences)?;
        info!("displayed {name}");
        Ok(())
    }

    /// Show a stored image without changing the selected image
    ///
    /// Used for setup screens that must not replace the user's choice.
    pub fn show_image<I, K, D>(
        &mut self,
        display: &mut Display<I>,
        name: &str,
        delay: &mut D,
    ) -> Result<(), PipelineError<I, S::Error, K>>
    where
        I: PanelBus,
        D: DelayNs,
    {
        let frame = self.load::<I, K>(name)?;

        let expected = display.dimensions().buffer_size();
        if frame.len() != expected {
            warn!("{name}: {} bytes is not a {expected} byte frame", frame.len());
            return Err(PipelineError::FrameSize {
                expected,
                provided: frame.len(),
            });
        }

        display
            .display_bitmap(&frame, delay)
            .map_err(PipelineError::Display)
    }

    /// Read a whole image into a freshly allocated buffer
    fn load<I: PanelBus, K>(&mut self, name: &str) -> Result<Vec<u8>, PipelineError<I, S::Error, K>> {
        let Some(path) = image_path(name) else {
            warn!("rejecting image name {name:?}");
            return Err(PipelineError::InvalidName);
        };
        let size = self
            .storage
            .size(&path)
            .map_err(PipelineError::Storage)?
            .ok_or(PipelineError::NotFound)?;
        debug!("{path}: {size} bytes");

        let mut buf = Vec::new();
        if buf.try_reserve_exact(size).is_err() {
            warn!("{path}: cannot allocate {size} bytes");
            return Err(PipelineError::Allocation { requested: size });
        }
        buf.resize(size, 0);

        let read = self
            .storage
            .read(&path, &mut buf)
            .map_err(PipelineError::Storage)?;
        if read != size {
            warn!("{path}: read {read} of {size} bytes");
            return Err(PipelineError::ShortRead {
                expected: size,
                read,
            });
        }
        Ok(buf)
    }

    /// Access the underlying store
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutably access the underlying store
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Release the underlying store
    pub fn release(self) -> S {
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{DEEP_SLEEP, START_TRANSMISSION};
    use crate::config::{Builder, Dimensions};
    use crate::display::PanelState;
    use crate::interface::Controller;
    use crate::mock::{ClockDelay, MemoryKv, MemoryStorage, MockBus};
    use crate::storage::KEY_LAST_IMAGE;
    use alloc::vec;

    fn small_dims() -> Dimensions {
        Dimensions::new(32, 4).unwrap()
    }

    fn display(bus: MockBus, dims: Dimensions) -> Display<MockBus> {
        let config = Builder::new().dimensions(dims).build().unwrap();
        let mut display = Display::new(bus, config);
        display.begin().unwrap();
        display
    }

    fn prefs() -> Preferences<MemoryKv> {
        Preferences::new(MemoryKv::default())
    }

    #[test]
    fn test_list_images_filters_suffix() {
        let storage = MemoryStorage::new()
            .with_file("/images/a.bin", vec![0; 16])
            .with_file("/images/b.txt", vec![0; 16])
            .with_file("/other/c.bin", vec![0; 16]);
        let mut pipeline = ImagePipeline::new(storage);
        assert_eq!(pipeline.list_images().unwrap(), vec![String::from("a.bin")]);
    }

    #[test]
    fn test_ensure_image_dir_creates_once() {
        let mut pipeline = ImagePipeline::new(MemoryStorage::new());
        pipeline.ensure_image_dir().unwrap();
        pipeline.ensure_image_dir().unwrap();
        assert_eq!(pipeline.storage().dirs, vec![String::from(IMAGE_DIR)]);
    }

    #[test]
    fn test_display_persists_after_sleep() {
        let mut frame = vec![0xFFu8; 16];
        frame[..8].fill(0x00);
        let storage = MemoryStorage::new().with_file("/images/split.bin", frame.clone());
        let mut pipeline = ImagePipeline::new(storage);
        let mut display = display(MockBus::new(), small_dims());
        let mut prefs = prefs();
        let mut delay = ClockDelay::default();

        pipeline
            .display_image_from_storage(&mut display, &mut prefs, "split", &mut delay)
            .unwrap();

        assert_eq!(display.state(), PanelState::Sleeping);
        assert_eq!(display.interface().count_command(DEEP_SLEEP), 2);
        assert_eq!(
            display
                .interface()
                .data_after(Controller::Master, START_TRANSMISSION),
            vec![frame[..8].to_vec()]
        );
        assert_eq!(prefs.selected_image().unwrap(), Some(String::from("split")));
        assert!(prefs.store().open.is_none());
    }

    #[test]
    fn test_show_image_leaves_selection_alone() {
        let storage = MemoryStorage::new().with_file("/images/setup_ap.bin", vec![0xFF; 16]);
        let mut pipeline = ImagePipeline::new(storage);
        let mut display = display(MockBus::new(), small_dims());
        let mut delay = ClockDelay::default();

        let result: Result<(), PipelineError<MockBus, _, ()>> =
            pipeline.show_image(&mut display, "setup_ap", &mut delay);

        assert!(result.is_ok());
        assert_eq!(display.refreshes(), 1);
        assert_eq!(pipeline.storage().reads, vec![String::from("/images/setup_ap.bin")]);
    }

    #[test]
    fn test_missing_image_is_not_found() {
        let mut pipeline = ImagePipeline::new(MemoryStorage::new());
        let mut display = display(MockBus::new(), small_dims());
        let mut prefs = prefs();
        let mut delay = ClockDelay::default();

        let result =
            pipeline.display_image_from_storage(&mut display, &mut prefs, "nope", &mut delay);

        assert!(matches!(result, Err(PipelineError::NotFound)));
        assert_eq!(display.interface().transactions(), 0);
        assert_eq!(prefs.selected_image().unwrap(), None);
    }

    #[test]
    fn test_short_read_is_rejected() {
        let mut storage = MemoryStorage::new().with_file("/images/cut.bin", vec![0; 16]);
        storage.truncated.push(String::from("/images/cut.bin"));
        let mut pipeline = ImagePipeline::new(storage);
        let mut display = display(MockBus::new(), small_dims());
        let mut prefs = prefs();
        let mut delay = ClockDelay::default();

        let result =
            pipeline.display_image_from_storage(&mut display, &mut prefs, "cut.bin", &mut delay);

        assert!(matches!(
            result,
            Err(PipelineError::ShortRead {
                expected: 16,
                read: 8
            })
        ));
        assert_eq!(display.interface().transactions(), 0);
    }

    #[test]
    fn test_wrong_frame_size_never_reaches_panel() {
        let storage = MemoryStorage::new().with_file("/images/small.bin", vec![0; 12]);
        let mut pipeline = ImagePipeline::new(storage);
        let mut display = display(MockBus::new(), small_dims());
        let mut prefs = prefs();
        let mut delay = ClockDelay::default();

        let result =
            pipeline.display_image_from_storage(&mut display, &mut prefs, "small", &mut delay);

        assert!(matches!(
            result,
            Err(PipelineError::FrameSize {
                expected: 16,
                provided: 12
            })
        ));
        assert_eq!(display.interface().transactions(), 0);
    }

    #[test]
    fn test_empty_file_is_frame_size_error() {
        let storage = MemoryStorage::new().with_file("/images/empty.bin", Vec::new());
        let mut pipeline = ImagePipeline::new(storage);
        let mut display = display(MockBus::new(), small_dims());
        let mut prefs = prefs();
        let mut delay = ClockDelay::default();

        let result =
            pipeline.display_image_from_storage(&mut display, &mut prefs, "empty", &mut delay);

        assert!(matches!(result, Err(PipelineError::FrameSize { .. })));
        assert_eq!(display.interface().transactions(), 0);
    }

    #[test]
    fn test_panel_failure_keeps_previous_selection() {
        let storage = MemoryStorage::new().with_file("/images/new.bin", vec![0; 16]);
        let mut pipeline = ImagePipeline::new(storage);
        let mut display = display(MockBus::failing_data_at(8), small_dims());
        let mut prefs = prefs();
        prefs.set_selected_image("old").unwrap();
        let mut delay = ClockDelay::default();

        let result =
            pipeline.display_image_from_storage(&mut display, &mut prefs, "new", &mut delay);

        assert!(matches!(result, Err(PipelineError::Display(_))));
        assert_eq!(prefs.selected_image().unwrap(), Some(String::from("old")));
    }

    #[test]
    fn test_deep_sleep_failure_keeps_previous_selection() {
        let storage = MemoryStorage::new().with_file("/images/new.bin", vec![0; 16]);
        let mut pipeline = ImagePipeline::new(storage);
        // init: 8, halves: 2, then the master's deep sleep check byte
        let mut display = display(MockBus::failing_data_at(10), small_dims());
        let mut prefs = prefs();
        prefs.set_selected_image("old").unwrap();
        let mut delay = ClockDelay::default();

        let result =
            pipeline.display_image_from_storage(&mut display, &mut prefs, "new", &mut delay);

        assert!(matches!(result, Err(PipelineError::Display(_))));
        assert_eq!(display.refreshes(), 1);
        assert_ne!(display.state(), PanelState::Sleeping);
        assert_eq!(prefs.selected_image().unwrap(), Some(String::from("old")));
    }

    #[test]
    fn test_path_names_are_rejected_before_storage() {
        let storage = MemoryStorage::new().with_file("/secret.bin", vec![0; 16]);
        let mut pipeline = ImagePipeline::new(storage);
        let mut display = display(MockBus::new(), small_dims());
        let mut prefs = prefs();
        let mut delay = ClockDelay::default();

        let result =
            pipeline.display_image_from_storage(&mut display, &mut prefs, "../secret", &mut delay);

        assert!(matches!(result, Err(PipelineError::InvalidName)));
        assert!(!pipeline.contains("../secret"));
        assert!(pipeline.storage().reads.is_empty());
        assert_eq!(display.interface().transactions(), 0);
        assert_eq!(prefs.selected_image().unwrap(), None);
    }

    #[test]
    fn test_full_panel_round_trip() {
        let dims = Dimensions::PANEL_13IN3;
        let mut frame = vec![0xFFu8; dims.buffer_size()];
        frame[..dims.half_buffer_size()].fill(0x00);
        let storage = MemoryStorage::new().with_file("/images/split.bin", frame);
        let mut pipeline = ImagePipeline::new(storage);
        let mut display = display(MockBus::new(), dims);
        let mut prefs = prefs();
        let mut delay = ClockDelay::default();

        pipeline
            .display_image_from_storage(&mut display, &mut prefs, "split.bin", &mut delay)
            .unwrap();

        let bus = display.interface();
        let master = bus.data_after(Controller::Master, START_TRANSMISSION);
        let slave = bus.data_after(Controller::Slave, START_TRANSMISSION);
        assert_eq!(master[0].len(), 120_000);
        assert_eq!(slave[0].len(), 120_000);
        assert!(master[0].iter().all(|b| *b == 0x00));
        assert!(slave[0].iter().all(|b| *b == 0xFF));
        assert_eq!(
            prefs.get_or(KEY_LAST_IMAGE, "").unwrap(),
            String::from("split.bin")
        );
    }
}
