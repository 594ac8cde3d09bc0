use send_wrapper::SendWrapper;
use wasm_bindgen::JsValue;

use crate::error::IdbError;

/// Helper trait a bit like expect, except it's tailored for wasm-bindgen use cases.
/// Host failures keep the thrown value; absent values become `IdbError::Missing`.
pub trait WBGRequire<T> {
    fn require(self, context: &'static str) -> Result<T, IdbError>;
}

impl<T> WBGRequire<T> for Result<T, JsValue> {
    fn require(self, context: &'static str) -> Result<T, IdbError> { self.map_err(|error| IdbError::Host { context, error: SendWrapper::new(error) }) }
}

impl<T> WBGRequire<T> for Option<T> {
    fn require(self, context: &'static str) -> Result<T, IdbError> { self.ok_or(IdbError::Missing(context)) }
}

impl<T> WBGRequire<T> for Result<Option<T>, JsValue> {
    fn require(self, context: &'static str) -> Result<T, IdbError> {
        match self {
            Ok(Some(res)) => Ok(res),
            Ok(None) => Err(IdbError::Missing(context)),
            Err(error) => Err(IdbError::host(context, error)),
        }
    }
}
