//! Storage collaborators
//!
//! Two narrow contracts the core depends on:
//!
//! - [`Storage`]: a flat file store (an SD card on the device) holding raw
//!   frame images.
//! - [`KeyValueStore`]: a namespaced string store (NVS/preferences on the
//!   device) holding Wi-Fi credentials and the selected image name.
//!
//! [`Preferences`] wraps a [`KeyValueStore`] and always closes the scoped
//! session it opens, so no read or write leaves the store open.
//!
//! With the `std` feature, [`DirStorage`] maps [`Storage`] onto a host
//! directory for simulators and tooling.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Debug;

/// Directory holding frame images
pub const IMAGE_DIR: &str = "/images";

/// Suffix of frame image files
pub const IMAGE_SUFFIX: &str = ".bin";

/// Namespace of the core's preference keys
pub const PREFS_NAMESPACE: &str = "epd";

/// Preference key of the Wi-Fi SSID
pub const KEY_WIFI_SSID: &str = "wifi_ssid";

/// Preference key of the Wi-Fi password
pub const KEY_WIFI_PASSWORD: &str = "wifi_pass";

/// Preference key of the last successfully displayed image
pub const KEY_LAST_IMAGE: &str = "last_image";

/// Flat file store
///
/// Paths are absolute, `/`-separated. Only one directory level is used.
pub trait Storage {
    /// Error type for storage operations
    type Error: Debug;

    /// Names (not paths) of the files in `dir` ending with `suffix`, in
    /// storage order
    fn list(&mut self, dir: &str, suffix: &str) -> Result<Vec<String>, Self::Error>;

    /// Whether a file or directory exists at `path`
    fn exists(&mut self, path: &str) -> bool;

    /// Create a directory
    fn mkdir(&mut self, path: &str) -> Result<(), Self::Error>;

    /// Reported size of the file at `path`, `None` if it does not exist
    fn size(&mut self, path: &str) -> Result<Option<usize>, Self::Error>;

    /// Read from the start of the file into `buf`
    ///
    /// Returns the number of bytes read, which may be less than `buf.len()`.
    fn read(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Create or replace the file at `path`
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error>;
}

/// Namespaced string key/value store
///
/// Every batch of reads or writes is bracketed by [`begin`](Self::begin) and
/// [`end`](Self::end). There is no transaction across keys.
pub trait KeyValueStore {
    /// Error type for store operations
    type Error: Debug;

    /// Open `namespace` for a batch of operations
    fn begin(&mut self, namespace: &str, read_only: bool) -> Result<(), Self::Error>;

    /// Close the namespace opened by [`begin`](Self::begin)
    fn end(&mut self);

    /// Value of `key`, `None` if absent
    fn get(&mut self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Store `value` under `key`
    fn put(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;
}

/// Path of an image by name
///
/// The image suffix is appended unless the name already ends with it.
/// Names must be bare filenames; anything that could leave the image
/// directory yields `None`.
///
/// ```
/// use duo_epd::storage::image_path;
///
/// assert_eq!(image_path("cat").as_deref(), Some("/images/cat.bin"));
/// assert_eq!(image_path("cat.bin").as_deref(), Some("/images/cat.bin"));
/// assert_eq!(image_path("../cat"), None);
/// ```
pub fn image_path(name: &str) -> Option<String> {
    if !is_image_name(name) {
        return None;
    }
    let mut path = String::with_capacity(IMAGE_DIR.len() + name.len() + IMAGE_SUFFIX.len() + 1);
    path.push_str(IMAGE_DIR);
    path.push('/');
    path.push_str(name);
    if !name.ends_with(IMAGE_SUFFIX) {
        path.push_str(IMAGE_SUFFIX);
    }
    Some(path)
}

/// Whether `name` is a bare filename inside the image directory
pub fn is_image_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Scoped access to the core's preference keys
pub struct Preferences<K> {
    store: K,
    namespace: &'static str,
}

impl<K: KeyValueStore> Preferences<K> {
    /// Wrap a store using the default namespace
    pub fn new(store: K) -> Self {
        Self::with_namespace(store, PREFS_NAMESPACE)
    }

    /// Wrap a store using a custom namespace
    pub fn with_namespace(store: K, namespace: &'static str) -> Self {
        Self { store, namespace }
    }

    /// Run `f` inside one session; the session is closed whatever `f` returns
    pub fn session<T>(
        &mut self,
        read_only: bool,
        f: impl FnOnce(&mut K) -> Result<T, K::Error>,
    ) -> Result<T, K::Error> {
        self.store.begin(self.namespace, read_only)?;
        let result = f(&mut self.store);
        self.store.end();
        result
    }

    /// Value of `key`, or `default` if absent
    pub fn get_or(&mut self, key: &str, default: &str) -> Result<String, K::Error> {
        self.session(true, |store| {
            Ok(store.get(key)?.unwrap_or_else(|| default.to_string()))
        })
    }

    /// Store one value
    pub fn put(&mut self, key: &str, value: &str) -> Result<(), K::Error> {
        self.session(false, |store| store.put(key, value))
    }

    /// Stored Wi-Fi credentials as `(ssid, password)`
    ///
    /// An empty or missing SSID counts as no credentials.
    pub fn credentials(&mut self) -> Result<Option<(String, String)>, K::Error> {
        self.session(true, |store| {
            let ssid = store.get(KEY_WIFI_SSID)?.unwrap_or_default();
            if ssid.is_empty() {
                return Ok(None);
            }
            let password = store.get(KEY_WIFI_PASSWORD)?.unwrap_or_default();
            Ok(Some((ssid, password)))
        })
    }

    /// Persist Wi-Fi credentials in one session
    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), K::Error> {
        self.session(false, |store| {
            store.put(KEY_WIFI_SSID, ssid)?;
            store.put(KEY_WIFI_PASSWORD, password)
        })
    }

    /// Name of the last successfully displayed image
    pub fn selected_image(&mut self) -> Result<Option<String>, K::Error> {
        let name = self.get_or(KEY_LAST_IMAGE, "")?;
        Ok((!name.is_empty()).then_some(name))
    }

    /// Persist the selected image name
    pub fn set_selected_image(&mut self, name: &str) -> Result<(), K::Error> {
        self.put(KEY_LAST_IMAGE, name)
    }

    /// Access the underlying store
    pub fn store(&self) -> &K {
        &self.store
    }

    /// Release the underlying store
    pub fn into_inner(self) -> K {
        self.store
    }
}

#[cfg(feature = "std")]
pub use dir::DirStorage;

#[cfg(feature = "std")]
mod dir {
    use super::Storage;
    use alloc::string::String;
    use alloc::vec::Vec;
    use std::fs;
    use std::io::{self, Read};
    use std::path::PathBuf;

    /// [`Storage`] backed by a host directory
    ///
    /// Storage paths are resolved relative to the root directory.
    #[derive(Debug, Clone)]
    pub struct DirStorage {
        root: PathBuf,
    }

    impl DirStorage {
        /// Use `root` as the storage root
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        fn resolve(&self, path: &str) -> PathBuf {
            self.root.join(path.trim_start_matches('/'))
        }
    }

    impl Storage for DirStorage {
        type Error = io::Error;

        fn list(&mut self, dir: &str, suffix: &str) -> Result<Vec<String>, Self::Error> {
            let mut names = Vec::new();
            for entry in fs::read_dir(self.resolve(dir))? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    if name.ends_with(suffix) {
                        names.push(String::from(name));
                    }
                }
            }
            names.sort();
            Ok(names)
        }

        fn exists(&mut self, path: &str) -> bool {
            self.resolve(path).exists()
        }

        fn mkdir(&mut self, path: &str) -> Result<(), Self::Error> {
            fs::create_dir_all(self.resolve(path))
        }

        fn size(&mut self, path: &str) -> Result<Option<usize>, Self::Error> {
            match fs::metadata(self.resolve(path)) {
                Ok(meta) if meta.is_file() => Ok(Some(meta.len() as usize)),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            }
        }

        fn read(&mut self, path: &str, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let mut file = fs::File::open(self.resolve(path))?;
            let mut filled = 0;
            while filled < buf.len() {
                match file.read(&mut buf[filled..])? {
                    0 => break,
                    n => filled += n,
                }
            }
            Ok(filled)
        }

        fn write(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error> {
            fs::write(self.resolve(path), data)
        }
    }

}
