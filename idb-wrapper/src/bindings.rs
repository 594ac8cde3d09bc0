//! The `IDBWrapper` class for JavaScript callers.

use js_sys::{Function, Object as JsObject, Promise, Reflect};
use std::cell::OnceCell;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{IdbDatabase, IdbFactory, IdbIndex, IdbKeyRange, IdbObjectStore};

use crate::database::{Database, DatabaseConfig, TransactionMode};
use crate::error::{IdbError, Result};
use crate::key_range::{self, CursorDirection, KeyRangeSettings, QueryType};
use crate::schema::{self, IndexConfig, StoreConfig};
use crate::statics::*;
use crate::util::{object::Object, require::WBGRequire, vendor};

/// Install the console tracing layer (once) and the panic hook. `level` defaults to `info`.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) -> std::result::Result<(), JsValue> {
    static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

    let level = match level {
        Some(level) => tracing::Level::from_str(&level).map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => tracing::Level::INFO,
    };
    if !TRACING_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing_wasm::set_as_global_default_with_config(tracing_wasm::WASMLayerConfigBuilder::new().set_max_level(level).build());
    }
    console_error_panic_hook::set_once();
    Ok(())
}

#[wasm_bindgen(js_name = IDBWrapper)]
pub struct JsIdbWrapper {
    db: Database,
}

#[wasm_bindgen(js_class = IDBWrapper)]
impl JsIdbWrapper {
    /// `new IDBWrapper({ dbName, dbVersion, upgradeHandler, persistent })` starts opening right away.
    ///
    /// `upgradeHandler(event, db)` is called with `this` bound to a wrapper over the same connection.
    #[wasm_bindgen(constructor)]
    pub fn new(args: JsValue) -> std::result::Result<JsIdbWrapper, JsValue> {
        let args = Object::new(&args);
        let name = args.string(&DB_NAME_KEY)?.require("dbName")?;
        let version = args.number(&DB_VERSION_KEY)?.require("dbVersion")?;
        let persistent = args.boolean(&PERSISTENT_KEY)?.unwrap_or(false);

        let mut config = DatabaseConfig::new(name, version).persistent(persistent);
        // filled in right after the open starts; the handler only runs once the host reports an upgrade
        let this: Rc<OnceCell<Database>> = Rc::default();
        if let Some(handler) = args.cast::<Function>(&UPGRADE_HANDLER_KEY)? {
            let this = this.clone();
            config = config.on_upgrade(move |event, db| {
                let this = this.get().map(|db| JsValue::from(JsIdbWrapper { db: db.clone() })).unwrap_or(JsValue::UNDEFINED);
                handler.call2(&this, event, db).require("upgrade handler")?;
                Ok(())
            });
        }
        let db = Database::open(config);
        let _ = this.set(db.clone());
        Ok(Self { db })
    }

    /// The shared initialization promise.
    pub fn wait(&self) -> Promise {
        let db = self.db.clone();
        future_to_promise(async move {
            db.wait().await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(getter, js_name = isReady)]
    pub fn is_ready(&self) -> bool { self.db.is_ready() }

    #[wasm_bindgen(getter, js_name = isPersistentStorage)]
    pub fn is_persistent_storage(&self) -> bool { self.db.is_persistent_storage() }

    #[wasm_bindgen(getter, js_name = idbInstance)]
    pub fn idb_instance(&self) -> Option<IdbDatabase> { self.db.idb_instance() }

    #[wasm_bindgen(js_name = getObjectStore)]
    pub fn get_object_store(&self, store_name: &str, mode: Option<String>) -> std::result::Result<IdbObjectStore, JsValue> {
        Ok(self.db.object_store(store_name, parse_mode(mode)?)?)
    }

    #[wasm_bindgen(js_name = getIndex)]
    pub fn get_index(&self, store_name: &str, index_name: &str, mode: Option<String>) -> std::result::Result<IdbIndex, JsValue> {
        Ok(self.db.index(store_name, index_name, parse_mode(mode)?)?)
    }

    #[wasm_bindgen(js_name = openCursor)]
    pub fn open_cursor(&self, store_name: String, mode: Option<String>, settings: JsValue) -> Promise {
        let db = self.db.clone();
        future_to_promise(async move {
            let settings = key_range_settings(&settings)?;
            let cursor = db.open_cursor(&store_name, parse_mode(mode)?, settings.as_ref()).await?;
            Ok(cursor.map(JsValue::from).unwrap_or(JsValue::NULL))
        })
    }

    #[wasm_bindgen(js_name = openIndexCursor)]
    pub fn open_index_cursor(&self, store_name: String, index_name: String, mode: Option<String>, settings: JsValue) -> Promise {
        let db = self.db.clone();
        future_to_promise(async move {
            let settings = key_range_settings(&settings)?;
            let cursor = db.open_index_cursor(&store_name, &index_name, parse_mode(mode)?, settings.as_ref()).await?;
            Ok(cursor.map(JsValue::from).unwrap_or(JsValue::NULL))
        })
    }

    pub fn get(&self, store_name: String, query: JsValue) -> Promise {
        let db = self.db.clone();
        future_to_promise(async move { Ok(db.get(&store_name, &query).await?) })
    }

    #[wasm_bindgen(js_name = getAll)]
    pub fn get_all(&self, store_name: String) -> Promise {
        let db = self.db.clone();
        future_to_promise(async move { Ok(db.get_all(&store_name).await?.into()) })
    }

    pub fn add(&self, store_name: String, value: JsValue) -> Promise {
        let db = self.db.clone();
        future_to_promise(async move {
            db.add(&store_name, &value).await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn put(&self, store_name: String, value: JsValue) -> Promise {
        let db = self.db.clone();
        future_to_promise(async move {
            db.put(&store_name, &value).await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn delete(&self, store_name: String, query: JsValue) -> Promise {
        let db = self.db.clone();
        future_to_promise(async move {
            db.delete(&store_name, &query).await?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = indexedDBFactory)]
    pub fn indexed_db_factory() -> Option<IdbFactory> { vendor::idb_factory(vendor::FACTORY_GLOBALS) }

    #[wasm_bindgen(js_name = createKeyRange)]
    pub fn create_key_range(settings: JsValue) -> std::result::Result<IdbKeyRange, JsValue> {
        let settings = key_range_settings(&settings)?.unwrap_or_default();
        Ok(key_range::create_key_range(&settings)?)
    }

    #[wasm_bindgen(js_name = createIndex)]
    pub fn create_index(store: &IdbObjectStore, config: JsValue) -> std::result::Result<IdbIndex, JsValue> {
        let config: IndexConfig = serde_wasm_bindgen::from_value(config).map_err(IdbError::from)?;
        Ok(schema::create_index(store, &config)?)
    }

    /// `undefined` when every index was created, otherwise `{ error }` for the first failure.
    #[wasm_bindgen(js_name = createIndexes)]
    pub fn create_indexes(store: &IdbObjectStore, configs: JsValue) -> std::result::Result<JsValue, JsValue> {
        let configs: Vec<IndexConfig> = serde_wasm_bindgen::from_value(configs).map_err(IdbError::from)?;
        match schema::create_indexes(store, &configs) {
            Ok(()) => Ok(JsValue::UNDEFINED),
            Err(e) => {
                let report = JsObject::new();
                Reflect::set(&report, &ERROR_KEY, &e.into())?;
                Ok(report.into())
            }
        }
    }

    #[wasm_bindgen(js_name = initializeStore)]
    pub fn initialize_store(db: &IdbDatabase, config: JsValue) -> std::result::Result<IdbObjectStore, JsValue> {
        let config: StoreConfig = serde_wasm_bindgen::from_value(config).map_err(IdbError::from)?;
        Ok(schema::initialize_store(db, &config)?)
    }
}

fn parse_mode(mode: Option<String>) -> Result<TransactionMode> {
    match mode {
        Some(mode) => TransactionMode::from_str(&mode).map_err(|_| IdbError::UnknownMode(mode)),
        None => Ok(TransactionMode::default()),
    }
}

/// `{ queryType, direction, lowerKeyPath, upperBoundKeyPath, lowerExclusive, upperExclusive }`, or `None` when the
/// argument is absent. Unknown query types and directions are treated as missing.
fn key_range_settings(value: &JsValue) -> Result<Option<KeyRangeSettings>> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    let settings = Object::new(value);
    Ok(Some(KeyRangeSettings {
        query_type: settings.number(&QUERY_TYPE_KEY)?.filter(|code| code.fract() == 0.0 && *code >= 0.0).and_then(|code| QueryType::from_repr(code as u8)),
        direction: settings.string(&DIRECTION_KEY)?.and_then(|direction| CursorDirection::from_str(&direction).ok()),
        lower: settings.get_opt(&LOWER_KEY)?,
        upper: settings.get_opt(&UPPER_KEY)?,
        lower_exclusive: settings.get_opt(&LOWER_EXCLUSIVE_KEY)?.is_some_and(|flag| flag.is_truthy()),
        upper_exclusive: settings.get_opt(&UPPER_EXCLUSIVE_KEY)?.is_some_and(|flag| flag.is_truthy()),
    }))
}
