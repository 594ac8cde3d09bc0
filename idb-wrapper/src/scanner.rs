//! Cursor iteration as a stream.
//!
//! A cursor request re-fires `success` after every `continue()`, ending with a `null` result once the range is
//! exhausted. The scan advances the cursor as soon as a record has been read so the transaction stays busy.

use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use wasm_bindgen::prelude::*;
use web_sys::{IdbCursorWithValue, IdbRequest};

use crate::error::Result;
use crate::util::cb_stream::{cb_stream, CBStream};
use crate::util::require::WBGRequire;

/// Stream the values under a freshly opened cursor request.
pub fn records(request: IdbRequest) -> impl Stream<Item = Result<JsValue>> {
    let events = Box::pin(cb_stream(&request));
    futures::stream::unfold(Some(events), |events| async move {
        let mut events = events?;
        match next_record(&mut events).await? {
            Ok(value) => Some((Ok(value), Some(events))),
            // an error ends the scan
            Err(e) => Some((Err(e), None)),
        }
    })
}

async fn next_record(events: &mut Pin<Box<CBStream>>) -> Option<Result<JsValue>> {
    let cursor_result = match events.next().await? {
        Ok(val) => val,
        Err(e) => return Some(Err(e)),
    };

    // Check for end of cursor
    if cursor_result.is_null() || cursor_result.is_undefined() {
        return None;
    }
    let cursor: IdbCursorWithValue = cursor_result.unchecked_into();

    let value = match cursor.value().require("read cursor value") {
        Ok(v) => v,
        Err(e) => return Some(Err(e)),
    };
    if let Err(e) = cursor.continue_().require("advance cursor") {
        return Some(Err(e));
    }
    Some(Ok(value))
}
