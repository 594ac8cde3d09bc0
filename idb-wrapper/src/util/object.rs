use send_wrapper::SendWrapper;
use wasm_bindgen::{JsCast, JsValue};

use crate::error::IdbError;

/// Read-only view over a plain JS options object.
pub struct Object<'a> {
    obj: &'a JsValue,
}

impl<'a> Object<'a> {
    pub fn new(obj: &'a JsValue) -> Self { Self { obj } }

    /// The property value, treating `null` and `undefined` alike as absent
    pub fn get_opt(&self, key: &Property) -> Result<Option<JsValue>, IdbError> {
        if self.obj.is_undefined() || self.obj.is_null() {
            return Ok(None);
        }
        let v = js_sys::Reflect::get(self.obj, key).map_err(|e| IdbError::host(key.name, e))?;
        if v.is_null() || v.is_undefined() {
            return Ok(None);
        }
        Ok(Some(v))
    }

    pub fn string(&self, key: &Property) -> Result<Option<String>, IdbError> { self.get_opt(key)?.map(|v| v.as_string().ok_or_else(|| mistyped(key, v))).transpose() }

    pub fn number(&self, key: &Property) -> Result<Option<f64>, IdbError> { self.get_opt(key)?.map(|v| v.as_f64().ok_or_else(|| mistyped(key, v))).transpose() }

    pub fn boolean(&self, key: &Property) -> Result<Option<bool>, IdbError> { self.get_opt(key)?.map(|v| v.as_bool().ok_or_else(|| mistyped(key, v))).transpose() }

    pub fn cast<T: JsCast>(&self, key: &Property) -> Result<Option<T>, IdbError> { self.get_opt(key)?.map(|v| v.dyn_into::<T>().map_err(|v| mistyped(key, v))).transpose() }
}

fn mistyped(key: &Property, value: JsValue) -> IdbError {
    IdbError::host(key.name, js_sys::TypeError::new(&format!("unexpected type for {}: {}", key.name, crate::error::extract_message(&value))).into())
}

pub struct Property {
    key: SendWrapper<JsValue>,
    name: &'static str,
}

impl Property {
    pub fn new(key: &'static str) -> Self { Self { key: SendWrapper::new(key.into()), name: key } }
}

impl std::ops::Deref for Property {
    type Target = JsValue;
    fn deref(&self) -> &Self::Target { &self.key }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.name) }
}

impl From<&Property> for JsValue {
    fn from(prop: &Property) -> Self { (*prop.key).clone() }
}
