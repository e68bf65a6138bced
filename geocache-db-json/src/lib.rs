//! A durable address store backed by a single JSON file.
//!
//! The file contains a flat JSON object that maps the canonical string
//! of a coordinate to its address, e.g.
//!
//! ```json
//! {
//!   "-33.4372,-70.6506": "Plaza de Armas, Santiago, Chile"
//! }
//! ```
//!
//! Keys are written in sorted order so that the file can be diffed and
//! edited by hand.

use geocache_core::{
    entities::CoordinateKey,
    repositories::{AddressRepo, Error, Result},
};
use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    addresses: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Loads the store from `path`.
    ///
    /// A missing file results in an empty store that will be created
    /// on the first [`save`](Self::save).
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!(
                    "No address store found at '{}' => start with an empty store",
                    path.display()
                );
                return Ok(Self::new(path));
            }
            Err(err) => return Err(Error::corrupt_store(path, err)),
        };
        let addresses: BTreeMap<String, String> =
            serde_json::from_str(&json).map_err(|err| Error::corrupt_store(&path, err))?;
        log::debug!(
            "Loaded {} addresses from '{}'",
            addresses.len(),
            path.display()
        );
        Ok(Self { path, addresses })
    }

    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            addresses: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &CoordinateKey) -> Option<&str> {
        self.addresses
            .get(&key.canonical_string())
            .map(String::as_str)
    }

    pub fn put(&mut self, key: &CoordinateKey, address: String) {
        self.addresses.insert(key.canonical_string(), address);
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// All entries ordered by key.
    ///
    /// Keys are returned verbatim, hand-edited keys that are not a valid
    /// canonical string included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.addresses
            .iter()
            .map(|(key, address)| (key.as_str(), address.as_str()))
    }

    /// Writes all entries to the file the store has been loaded from.
    pub fn save(&self) -> Result<()> {
        self.save_as(&self.path)
    }

    /// Writes all entries to `path`, replacing any previous content.
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        write_atomically(path, &self.addresses)
            .map_err(|err| Error::store_write_failed(path, err))?;
        log::debug!("Saved {} addresses to '{}'", self.len(), path.display());
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut file_name = OsString::from(".");
    file_name.push(path.file_name().unwrap_or_else(|| "addresses".as_ref()));
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

// The previous content stays intact until the new content has been
// written completely.
fn write_atomically(path: &Path, addresses: &BTreeMap<String, String>) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(addresses)?;
    let tmp_path = tmp_path(path);
    let mut file = File::create(&tmp_path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp_path, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp_path);
    })
}

impl AddressRepo for JsonFileStore {
    fn get_address(&self, key: &CoordinateKey) -> Option<String> {
        self.get(key).map(ToOwned::to_owned)
    }

    fn put_address(&mut self, key: &CoordinateKey, address: String) {
        self.put(key, address);
    }

    fn count_addresses(&self) -> usize {
        self.len()
    }

    fn flush(&mut self) -> Result<()> {
        self.save()
    }
}
