use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use js_sys::Reflect;
use send_wrapper::SendWrapper;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, error, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{prelude::*, JsCast};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Event, IdbDatabase, IdbIndex, IdbObjectStore, IdbOpenDbRequest, IdbTransactionMode, IdbVersionChangeEvent, StorageManager};

use crate::error::{IdbError, Result};
use crate::util::{
    cb_future::CBFuture,
    cb_race::CBRace,
    require::WBGRequire,
    vendor::{self, FACTORY_GLOBALS},
};

/// Runs inside the `upgradeneeded` event with the live handle. Returning an error aborts the upgrade.
pub type UpgradeHandler = Box<dyn Fn(&IdbVersionChangeEvent, &IdbDatabase) -> Result<()>>;

/// Access mode for the transaction behind a store or index handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum TransactionMode {
    #[default]
    #[strum(serialize = "readonly")]
    ReadOnly,
    #[strum(serialize = "readwrite")]
    ReadWrite,
}

impl From<TransactionMode> for IdbTransactionMode {
    fn from(mode: TransactionMode) -> Self {
        match mode {
            TransactionMode::ReadOnly => IdbTransactionMode::Readonly,
            TransactionMode::ReadWrite => IdbTransactionMode::Readwrite,
        }
    }
}

/// What to open and how.
pub struct DatabaseConfig {
    name: String,
    version: f64,
    persistent: bool,
    on_upgrade: Option<UpgradeHandler>,
    factory_globals: &'static [&'static str],
}

impl DatabaseConfig {
    /// `version` goes to the host unchanged; it rejects anything that is not an integer in `1..=2^53-1`.
    pub fn new(name: impl Into<String>, version: impl Into<f64>) -> Self {
        Self { name: name.into(), version: version.into(), persistent: false, on_upgrade: None, factory_globals: FACTORY_GLOBALS }
    }

    /// Ask the browser to make storage persistent before opening.
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn on_upgrade<F>(mut self, handler: F) -> Self
    where F: Fn(&IdbVersionChangeEvent, &IdbDatabase) -> Result<()> + 'static {
        self.on_upgrade = Some(Box::new(handler));
        self
    }

    /// Globals searched, in order, for the storage factory.
    pub fn factory_globals(mut self, names: &'static [&'static str]) -> Self {
        self.factory_globals = names;
        self
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("persistent", &self.persistent)
            .field("on_upgrade", &self.on_upgrade.is_some())
            .finish()
    }
}

/// A connection that starts opening the moment it is constructed.
///
/// Clones share the same handle and the same initialization outcome.
#[derive(Clone)]
pub struct Database {
    name: Rc<str>,
    state: Rc<State>,
    initialization: Shared<LocalBoxFuture<'static, Result<()>>>,
}

#[derive(Default)]
struct State {
    ready: Cell<bool>,
    persistent: Cell<bool>,
    db: RefCell<Option<IdbDatabase>>,
    /// Keep onversionchange handler alive for the lifetime of the connection
    onversionchange: RefCell<Option<Closure<dyn FnMut(IdbVersionChangeEvent)>>>,
}

impl State {
    fn settle(&self, db: Option<IdbDatabase>) {
        self.ready.set(db.is_some());
        *self.db.borrow_mut() = db;
    }

    fn close(&self) {
        if let Some(db) = self.db.borrow_mut().take() {
            db.set_onversionchange(None);
            db.close();
        }
        self.onversionchange.borrow_mut().take();
        self.ready.set(false);
    }
}

impl Database {
    /// Begin opening `config.name` at `config.version`. Never blocks; see [`Database::wait`].
    pub fn open(config: DatabaseConfig) -> Self {
        let name: Rc<str> = config.name.as_str().into();
        let state = Rc::new(State::default());
        let (sender, receiver) = oneshot::channel();

        wasm_bindgen_futures::spawn_local({
            let state = state.clone();
            async move {
                let outcome = initialize(&state, config).await;
                let _ = sender.send(outcome);
            }
        });

        let initialization = receiver.map(|outcome| outcome.unwrap_or(Err(IdbError::Missing("initialization outcome")))).boxed_local().shared();
        Self { name, state, initialization }
    }

    /// Resolves once the open sequence has settled. Every call observes the same outcome.
    pub async fn wait(&self) -> Result<()> { self.initialization.clone().await }

    pub fn name(&self) -> &str { &self.name }

    pub fn is_ready(&self) -> bool { self.state.ready.get() }

    /// True only when the connection is ready and the browser granted persistent storage.
    pub fn is_persistent_storage(&self) -> bool { self.state.ready.get() && self.state.persistent.get() }

    /// The underlying handle; `None` until the open (or upgrade) hands it over.
    pub fn idb_instance(&self) -> Option<IdbDatabase> { self.state.db.borrow().clone() }

    /// A store handle in a fresh transaction scoped to that store.
    pub fn object_store(&self, store_name: &str, mode: TransactionMode) -> Result<IdbObjectStore> {
        let db = self.connection()?;
        let transaction = db.transaction_with_str_and_mode(store_name, mode.into()).require("open transaction")?;
        transaction.object_store(store_name).require("get object store")
    }

    pub fn index(&self, store_name: &str, index_name: &str, mode: TransactionMode) -> Result<IdbIndex> {
        self.object_store(store_name, mode)?.index(index_name).require("get index")
    }

    /// Close the handle. The connection is not ready afterwards.
    pub fn close(&self) {
        info!("closing IndexedDB {}", self.name);
        self.state.close();
    }

    /// Delete a database entirely. Resolves once deleted, or once the delete is blocked by open connections
    /// (the host finishes it when they close).
    pub async fn delete_database(name: &str) -> Result<()> {
        let factory = vendor::idb_factory(FACTORY_GLOBALS).ok_or(IdbError::NotSupported)?;
        let request = factory.delete_database(name).require("delete database")?;
        CBFuture::new(&request, &["success", "blocked"], "error").await.map_err(|event| IdbError::Request(SendWrapper::new(event)))?;
        info!("deleted IndexedDB {name}");
        Ok(())
    }

    fn connection(&self) -> Result<IdbDatabase> {
        if !self.state.ready.get() {
            return Err(IdbError::NotReady);
        }
        self.state.db.borrow().clone().ok_or(IdbError::NotReady)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("ready", &self.state.ready.get())
            .field("persistent", &self.state.persistent.get())
            .finish()
    }
}

async fn initialize(state: &Rc<State>, config: DatabaseConfig) -> Result<()> {
    if config.persistent {
        state.persistent.set(request_persistence().await);
    }

    match connect(state, config).await {
        Ok(db) => {
            watch_version_change(state, &db);
            state.settle(Some(db));
            Ok(())
        }
        Err(e) => {
            warn!("IndexedDB open failed: {e}");
            state.settle(None);
            Err(e)
        }
    }
}

async fn connect(state: &Rc<State>, config: DatabaseConfig) -> Result<IdbDatabase> {
    let DatabaseConfig { name, version, on_upgrade, factory_globals, .. } = config;
    let factory = vendor::idb_factory(factory_globals).ok_or(IdbError::NotSupported)?;

    info!("opening IndexedDB {name} at version {version}");
    let open_request: IdbOpenDbRequest = factory.open_with_f64(&name, version).require("open database")?;

    let race = CBRace::new();
    let onupgradeneeded = race.wrap({
        let state = state.clone();
        let open_request = open_request.clone();
        move |event: IdbVersionChangeEvent| -> Result<()> {
            info!("upgrading IndexedDB from version {} to {:?}", event.old_version(), event.new_version());
            let db: IdbDatabase = open_request.result().require("get upgrade database")?.unchecked_into();
            state.settle(Some(db.clone()));

            let Some(handler) = &on_upgrade else {
                return Ok(());
            };
            handler(&event, &db).inspect_err(|e| {
                error!("upgrade handler failed, aborting upgrade: {e}");
                if let Some(transaction) = open_request.transaction() {
                    let _ = transaction.abort();
                }
            })
        }
    });
    open_request.set_onupgradeneeded(Some(onupgradeneeded.as_ref().unchecked_ref()));

    let onblocked = Closure::wrap(Box::new({
        let name = name.clone();
        move |_event: Event| warn!("opening IndexedDB {name} is blocked by another open connection")
    }) as Box<dyn FnMut(_)>);
    open_request.set_onblocked(Some(onblocked.as_ref().unchecked_ref()));

    let outcome = CBFuture::new(&open_request, "success", "error").await;
    open_request.set_onupgradeneeded(None);
    open_request.set_onblocked(None);

    match outcome {
        Ok(_) => {
            debug!("IndexedDB {name} open");
            Ok(open_request.result().require("get database result")?.unchecked_into())
        }
        Err(event) => match race.take_err() {
            Some(e) => Err(IdbError::Upgrade(Box::new(e))),
            None => Err(IdbError::Open(SendWrapper::new(event))),
        },
    }
}

/// Another connection wants a newer version. Ours stays open, so that opener waits on `blocked` until [`Database::close`].
fn watch_version_change(state: &Rc<State>, db: &IdbDatabase) {
    let name = db.name();
    let onversionchange = Closure::wrap(Box::new(move |event: IdbVersionChangeEvent| {
        warn!("version change of IndexedDB {name} to {:?} requested elsewhere; close this connection to let it proceed", event.new_version());
    }) as Box<dyn FnMut(IdbVersionChangeEvent)>);
    db.set_onversionchange(Some(onversionchange.as_ref().unchecked_ref()));
    *state.onversionchange.borrow_mut() = Some(onversionchange);
}

/// Best effort: any failure along the way just means "not persistent".
async fn request_persistence() -> bool {
    match probe_persistence().await {
        Ok(granted) => {
            info!("persistent storage granted: {granted}");
            granted
        }
        Err(e) => {
            warn!("persistent storage probe failed: {e}");
            false
        }
    }
}

async fn probe_persistence() -> Result<bool> {
    let navigator = vendor::property(&js_sys::global(), "navigator").require("get navigator")?;
    let storage: StorageManager = Reflect::get(&navigator, &JsValue::from_str("storage"))
        .require("get navigator.storage")?
        .dyn_into()
        .map_err(|v| IdbError::host("navigator.storage is not a StorageManager", v))?;

    let persisted = JsFuture::from(storage.persisted().require("query persisted storage")?).await.require("await persisted storage")?;
    if persisted.as_bool() == Some(true) {
        return Ok(true);
    }
    let granted = JsFuture::from(storage.persist().require("request persistent storage")?).await.require("await persistent storage")?;
    Ok(granted.as_bool() == Some(true))
}
