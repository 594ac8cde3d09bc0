//! Capability lookup over vendor-prefixed globals.

use js_sys::Reflect;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::IdbFactory;

/// Storage factory globals, most preferred first.
pub const FACTORY_GLOBALS: &[&str] = &["indexedDB", "mozIndexedDB", "webkitIndexedDB", "msIndexedDB"];

/// Key range constructor globals, most preferred first.
pub const KEY_RANGE_GLOBALS: &[&str] = &["IDBKeyRange", "webkitIDBKeyRange", "msIDBKeyRange"];

/// The first global in `names` that is present. A getter that throws counts as absent.
pub fn first_global(names: &[&str]) -> Option<JsValue> {
    let global = js_sys::global();
    names.iter().find_map(|name| property(&global, name))
}

/// `target[name]`, or `None` when it is missing, `null`, or its getter throws.
pub fn property(target: &JsValue, name: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(name)).ok().filter(|v| !v.is_undefined() && !v.is_null())
}

pub fn idb_factory(names: &[&str]) -> Option<IdbFactory> {
    // prefixed factories are not instances of the standard IDBFactory
    first_global(names).map(JsCast::unchecked_into)
}

pub fn key_range_constructor() -> Option<JsValue> { first_global(KEY_RANGE_GLOBALS) }
