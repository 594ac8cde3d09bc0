//! Building host `IDBKeyRange`s from a declarative query description.

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{IdbCursorDirection, IdbKeyRange};

use crate::error::{IdbError, Result};
use crate::util::{require::WBGRequire, vendor};

/// Shape of a range query. The discriminants are the numeric codes accepted from JS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::FromRepr)]
#[repr(u8)]
pub enum QueryType {
    /// Exactly the lower key.
    Only = 0,
    /// From the lower key to the upper key.
    Bound = 1,
    /// The lower key and everything above it.
    LowerBound = 2,
    /// The (lower) key and everything below it.
    UpperBound = 3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum CursorDirection {
    #[default]
    #[strum(serialize = "next")]
    Next,
    #[strum(serialize = "nextunique")]
    NextUnique,
    #[strum(serialize = "prev")]
    Prev,
    #[strum(serialize = "prevunique")]
    PrevUnique,
}

impl From<CursorDirection> for IdbCursorDirection {
    fn from(direction: CursorDirection) -> Self {
        match direction {
            CursorDirection::Next => IdbCursorDirection::Next,
            CursorDirection::NextUnique => IdbCursorDirection::Nextunique,
            CursorDirection::Prev => IdbCursorDirection::Prev,
            CursorDirection::PrevUnique => IdbCursorDirection::Prevunique,
        }
    }
}

/// A range query: kind, cursor direction, boundary keys and per-boundary exclusivity.
///
/// Every kind uses `lower` as its key (for `UpperBound` it is the upper edge); only `Bound` uses `upper`.
/// A boundary holding JS `null` or `undefined` counts as missing.
#[derive(Debug, Clone, Default)]
pub struct KeyRangeSettings {
    pub query_type: Option<QueryType>,
    pub direction: Option<CursorDirection>,
    pub lower: Option<JsValue>,
    pub upper: Option<JsValue>,
    pub lower_exclusive: bool,
    pub upper_exclusive: bool,
}

impl KeyRangeSettings {
    fn new(query_type: QueryType, lower: JsValue, upper: Option<JsValue>) -> Self {
        Self { query_type: Some(query_type), direction: Some(CursorDirection::Next), lower: Some(lower), upper, ..Default::default() }
    }

    pub fn only(key: impl Into<JsValue>) -> Self { Self::new(QueryType::Only, key.into(), None) }

    pub fn bound(lower: impl Into<JsValue>, upper: impl Into<JsValue>) -> Self { Self::new(QueryType::Bound, lower.into(), Some(upper.into())) }

    pub fn lower_bound(key: impl Into<JsValue>) -> Self { Self::new(QueryType::LowerBound, key.into(), None) }

    pub fn upper_bound(key: impl Into<JsValue>) -> Self { Self::new(QueryType::UpperBound, key.into(), None) }

    pub fn with_direction(mut self, direction: CursorDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_lower_exclusive(mut self, exclusive: bool) -> Self {
        self.lower_exclusive = exclusive;
        self
    }

    pub fn with_upper_exclusive(mut self, exclusive: bool) -> Self {
        self.upper_exclusive = exclusive;
        self
    }
}

enum Shape<'a> {
    Only(&'a JsValue),
    Bound(&'a JsValue, &'a JsValue),
    LowerBound(&'a JsValue),
    UpperBound(&'a JsValue),
}

fn present(value: &Option<JsValue>) -> Option<&JsValue> { value.as_ref().filter(|v| !v.is_undefined() && !v.is_null()) }

fn shape(settings: &KeyRangeSettings) -> Result<(Shape<'_>, CursorDirection)> {
    let (Some(query_type), Some(direction), Some(lower)) = (settings.query_type, settings.direction, present(&settings.lower)) else {
        return Err(IdbError::InvalidQuery);
    };
    let shape = match query_type {
        QueryType::Only => Shape::Only(lower),
        QueryType::Bound => Shape::Bound(lower, present(&settings.upper).ok_or(IdbError::UpperBoundMissing)?),
        QueryType::LowerBound => Shape::LowerBound(lower),
        QueryType::UpperBound => Shape::UpperBound(lower),
    };
    Ok((shape, direction))
}

/// Build the host key range described by `settings`.
///
/// Fails with [`IdbError::InvalidQuery`] when the kind, direction or lower key is missing and with
/// [`IdbError::UpperBoundMissing`] for a `Bound` query without an upper key. Keys the host rejects (e.g. a lower
/// key above the upper key) surface as [`IdbError::Host`].
pub fn create_key_range(settings: &KeyRangeSettings) -> Result<IdbKeyRange> { range_and_direction(settings).map(|(range, _)| range) }

pub(crate) fn range_and_direction(settings: &KeyRangeSettings) -> Result<(IdbKeyRange, IdbCursorDirection)> {
    let (shape, direction) = shape(settings)?;
    let constructor = vendor::key_range_constructor().ok_or(IdbError::NotSupported)?;
    let lower_open = JsValue::from_bool(settings.lower_exclusive);
    let upper_open = JsValue::from_bool(settings.upper_exclusive);

    let range = match shape {
        Shape::Only(key) => construct(&constructor, "only", &Array::of1(key)),
        Shape::Bound(lower, upper) => construct(&constructor, "bound", &Array::of4(lower, upper, &lower_open, &upper_open)),
        Shape::LowerBound(key) => construct(&constructor, "lowerBound", &Array::of2(key, &lower_open)),
        Shape::UpperBound(key) => construct(&constructor, "upperBound", &Array::of2(key, &upper_open)),
    }?;
    Ok((range.unchecked_into(), direction.into()))
}

/// Call one of the static factory methods on the resolved key range constructor.
fn construct(constructor: &JsValue, method: &'static str, args: &Array) -> Result<JsValue> {
    let factory: Function =
        Reflect::get(constructor, &JsValue::from_str(method)).require(method)?.dyn_into().map_err(|v| IdbError::host(method, v))?;
    factory.apply(constructor, args).require(method)
}
