//! Store and index creation. Only valid inside an upgrade handler; the host rejects schema changes elsewhere.

use serde::Deserialize;
use tracing::{debug, error};
use wasm_bindgen::JsValue;
use web_sys::{IdbDatabase, IdbIndex, IdbIndexParameters, IdbObjectStore, IdbObjectStoreParameters};

use crate::error::Result;
use crate::util::require::WBGRequire;

/// A single property path, or several for a compound key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KeyPath {
    Single(String),
    Compound(Vec<String>),
}

impl KeyPath {
    pub fn to_js(&self) -> JsValue {
        match self {
            KeyPath::Single(path) => JsValue::from_str(path),
            KeyPath::Compound(paths) => paths.iter().map(|p| JsValue::from_str(p)).collect::<js_sys::Array>().into(),
        }
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self { KeyPath::Single(path.to_owned()) }
}

impl From<&[&str]> for KeyPath {
    fn from(paths: &[&str]) -> Self { KeyPath::Compound(paths.iter().map(|p| (*p).to_owned()).collect()) }
}

impl<const N: usize> From<[&str; N]> for KeyPath {
    fn from(paths: [&str; N]) -> Self { KeyPath::from(&paths[..]) }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexOptions {
    pub unique: bool,
    pub multi_entry: bool,
}

/// `{ name, kp, options }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    #[serde(rename = "kp")]
    pub key_path: KeyPath,
    #[serde(default)]
    pub options: IndexOptions,
}

impl IndexConfig {
    pub fn new(name: impl Into<String>, key_path: impl Into<KeyPath>) -> Self {
        Self { name: name.into(), key_path: key_path.into(), options: IndexOptions::default() }
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.options.unique = unique;
        self
    }

    pub fn multi_entry(mut self, multi_entry: bool) -> Self {
        self.options.multi_entry = multi_entry;
        self
    }
}

/// `{ name, keyPath, autoIncrement, indices }`. Without a key path the store uses out-of-line keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub name: String,
    #[serde(default)]
    pub key_path: Option<KeyPath>,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(default)]
    pub indices: Vec<IndexConfig>,
}

impl StoreConfig {
    pub fn new(name: impl Into<String>, key_path: impl Into<KeyPath>) -> Self {
        Self { name: name.into(), key_path: Some(key_path.into()), auto_increment: false, indices: Vec::new() }
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn index(mut self, index: IndexConfig) -> Self {
        self.indices.push(index);
        self
    }
}

pub fn create_index(store: &IdbObjectStore, config: &IndexConfig) -> Result<IdbIndex> {
    let params = IdbIndexParameters::new();
    params.set_unique(config.options.unique);
    params.set_multi_entry(config.options.multi_entry);

    debug!("creating index {}.{} on {:?}", store.name(), config.name, config.key_path);
    match &config.key_path {
        KeyPath::Single(path) => store.create_index_with_str_and_optional_parameters(&config.name, path, &params),
        KeyPath::Compound(_) => store.create_index_with_str_sequence_and_optional_parameters(&config.name, &config.key_path.to_js(), &params),
    }
    .require("create index")
}

/// Create each index in order, stopping at the first failure.
///
/// Indexes created before the failure stay in place; the rest are never attempted.
pub fn create_indexes(store: &IdbObjectStore, configs: &[IndexConfig]) -> Result<()> {
    for config in configs {
        create_index(store, config)?;
    }
    Ok(())
}

/// Create a store and its indexes. The store is returned even when some of its indexes could not be created.
pub fn initialize_store(db: &IdbDatabase, config: &StoreConfig) -> Result<IdbObjectStore> {
    let params = IdbObjectStoreParameters::new();
    if let Some(key_path) = &config.key_path {
        params.set_key_path(&key_path.to_js());
    }
    params.set_auto_increment(config.auto_increment);

    let store = db.create_object_store_with_optional_parameters(&config.name, &params).require("create object store")?;
    if let Err(e) = create_indexes(&store, &config.indices) {
        error!("store {} created with incomplete indexes: {e}", config.name);
    }
    Ok(store)
}
