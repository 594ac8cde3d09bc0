use send_wrapper::SendWrapper;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{DomException, Event, IdbRequest};

pub type Result<T, E = IdbError> = std::result::Result<T, E>;

/// Everything the wrapper can fail with.
///
/// Host values (error events, thrown exceptions) are kept as-is inside a `SendWrapper` so callers can inspect the
/// host object while the error itself stays `Send + Sync` for boxing and `anyhow`.
#[derive(Error, Debug, Clone)]
pub enum IdbError {
    #[error("IndexedDB not supported")]
    NotSupported,

    #[error("IndexedDB is not ready")]
    NotReady,

    #[error("Invalid query arguments")]
    InvalidQuery,

    #[error("Upper bound values not specified for Bound query type")]
    UpperBoundMissing,

    #[error("unknown transaction mode {0:?}")]
    UnknownMode(String),

    #[error("IndexedDB open failed: {}", describe_event(.0))]
    Open(SendWrapper<Event>),

    #[error("upgrade handler failed: {0}")]
    Upgrade(#[source] Box<IdbError>),

    #[error("IndexedDB request failed: {}", describe_event(.0))]
    Request(SendWrapper<Event>),

    #[error("{context}: {}", extract_message(.error))]
    Host { context: &'static str, error: SendWrapper<JsValue> },

    #[error("{0} is None")]
    Missing(&'static str),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl IdbError {
    pub(crate) fn host(context: &'static str, error: JsValue) -> Self { IdbError::Host { context, error: SendWrapper::new(error) } }

    /// The host error event behind an open or request failure.
    pub fn event(&self) -> Option<&Event> {
        match self {
            IdbError::Open(event) | IdbError::Request(event) => Some(&**event),
            IdbError::Upgrade(inner) => inner.event(),
            _ => None,
        }
    }

    /// The `DOMException` name reported by the host, when there is one.
    pub fn dom_name(&self) -> Option<String> {
        match self {
            IdbError::Host { error, .. } => error.dyn_ref::<DomException>().map(|e| e.name()),
            IdbError::Upgrade(inner) => inner.dom_name(),
            _ => {
                let request: IdbRequest = self.event()?.target()?.dyn_into().ok()?;
                request.error().ok().flatten().map(|e| e.name())
            }
        }
    }
}

impl From<serde_wasm_bindgen::Error> for IdbError {
    fn from(e: serde_wasm_bindgen::Error) -> Self { IdbError::Serialization(e.to_string()) }
}

impl From<IdbError> for JsValue {
    fn from(err: IdbError) -> Self {
        match err {
            IdbError::Open(event) | IdbError::Request(event) => event.take().into(),
            IdbError::Host { error, .. } => error.take(),
            IdbError::Upgrade(inner) => (*inner).into(),
            other => {
                let error = js_sys::Error::new(&other.to_string());
                error.set_name("IDBWrapperError");
                error.into()
            }
        }
    }
}

pub(crate) fn extract_message(err: &JsValue) -> String {
    // If it's a JS Error object (DOMException included), grab its `message`
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return format!("{}: {}", e.name(), e.message());
    }

    if let Some(s) = err.as_string() {
        return s;
    }

    js_sys::JSON::stringify(err).ok().and_then(|s| s.as_string()).unwrap_or_else(|| format!("{:?}", err))
}

/// Renders an error event by looking through its target for the request's `DOMException`.
pub(crate) fn describe_event(event: &Event) -> String {
    let Some(target) = event.target() else {
        return format!("{} event without target", event.type_());
    };
    match target.dyn_into::<IdbRequest>() {
        Ok(request) => match request.error() {
            Ok(Some(dom_exception)) => format!("{}: {} (code: {})", dom_exception.name(), dom_exception.message(), dom_exception.code()),
            Ok(None) => format!("{} event", event.type_()),
            Err(e) => extract_message(&e),
        },
        Err(_) => format!("{} event", event.type_()),
    }
}
