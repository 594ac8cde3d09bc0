//! One transaction, one request, one settlement per call.

use futures::stream::Stream;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{IdbCursorWithValue, IdbRequest};

use crate::database::{Database, TransactionMode};
use crate::error::Result;
use crate::key_range::{range_and_direction, KeyRangeSettings};
use crate::scanner::records;
use crate::util::{cb_future::settle, require::WBGRequire};

/// Where a cursor is opened.
enum Source<'a> {
    Store(&'a str),
    Index(&'a str, &'a str),
}

impl Database {
    /// The record stored under `query` (a key or a key range); `undefined` when there is none.
    pub async fn get(&self, store_name: &str, query: &JsValue) -> Result<JsValue> {
        let request = self.object_store(store_name, TransactionMode::ReadOnly)?.get(query).require("issue get request")?;
        settle(&request).await
    }

    /// Every record in the store, in key order.
    pub async fn get_all(&self, store_name: &str) -> Result<js_sys::Array> {
        let request = self.object_store(store_name, TransactionMode::ReadOnly)?.get_all().require("issue getAll request")?;
        Ok(settle(&request).await?.unchecked_into())
    }

    /// Insert a record; fails if its key already exists.
    pub async fn add(&self, store_name: &str, value: &JsValue) -> Result<()> {
        let request = self.object_store(store_name, TransactionMode::ReadWrite)?.add(value).require("issue add request")?;
        settle(&request).await?;
        Ok(())
    }

    /// Insert or replace a record.
    pub async fn put(&self, store_name: &str, value: &JsValue) -> Result<()> {
        let request = self.object_store(store_name, TransactionMode::ReadWrite)?.put(value).require("issue put request")?;
        settle(&request).await?;
        Ok(())
    }

    /// Delete whatever `query` matches. Matching nothing is not an error.
    pub async fn delete(&self, store_name: &str, query: &JsValue) -> Result<()> {
        let request = self.object_store(store_name, TransactionMode::ReadWrite)?.delete(query).require("issue delete request")?;
        settle(&request).await?;
        Ok(())
    }

    pub async fn clear(&self, store_name: &str) -> Result<()> {
        let request = self.object_store(store_name, TransactionMode::ReadWrite)?.clear().require("issue clear request")?;
        settle(&request).await?;
        Ok(())
    }

    pub async fn get_record<T: DeserializeOwned>(&self, store_name: &str, query: &JsValue) -> Result<Option<T>> {
        let value = self.get(store_name, query).await?;
        if value.is_undefined() {
            return Ok(None);
        }
        Ok(Some(serde_wasm_bindgen::from_value(value)?))
    }

    pub async fn get_all_records<T: DeserializeOwned>(&self, store_name: &str) -> Result<Vec<T>> {
        Ok(serde_wasm_bindgen::from_value(self.get_all(store_name).await?.into())?)
    }

    pub async fn add_record<T: Serialize>(&self, store_name: &str, record: &T) -> Result<()> {
        self.add(store_name, &serde_wasm_bindgen::to_value(record)?).await
    }

    pub async fn put_record<T: Serialize>(&self, store_name: &str, record: &T) -> Result<()> {
        self.put(store_name, &serde_wasm_bindgen::to_value(record)?).await
    }

    /// Open a cursor over a store. `None` when the range holds no records.
    ///
    /// With `settings` the cursor is bounded and ordered accordingly; without, it walks the whole store in key order.
    pub async fn open_cursor(&self, store_name: &str, mode: TransactionMode, settings: Option<&KeyRangeSettings>) -> Result<Option<IdbCursorWithValue>> {
        let request = self.cursor_request(Source::Store(store_name), mode, settings)?;
        Ok(cursor(settle(&request).await?))
    }

    /// Open a cursor over an index of a store. `None` when the range holds no records.
    pub async fn open_index_cursor(
        &self,
        store_name: &str,
        index_name: &str,
        mode: TransactionMode,
        settings: Option<&KeyRangeSettings>,
    ) -> Result<Option<IdbCursorWithValue>> {
        let request = self.cursor_request(Source::Index(store_name, index_name), mode, settings)?;
        Ok(cursor(settle(&request).await?))
    }

    /// Every record value in range, advancing the cursor after each one.
    ///
    /// The transaction only stays alive while the stream is polled without awaiting anything else in between.
    pub fn scan(
        &self,
        store_name: &str,
        index_name: Option<&str>,
        settings: Option<&KeyRangeSettings>,
    ) -> Result<impl Stream<Item = Result<JsValue>>> {
        let source = match index_name {
            Some(index_name) => Source::Index(store_name, index_name),
            None => Source::Store(store_name),
        };
        Ok(records(self.cursor_request(source, TransactionMode::ReadOnly, settings)?))
    }

    fn cursor_request(&self, source: Source<'_>, mode: TransactionMode, settings: Option<&KeyRangeSettings>) -> Result<IdbRequest> {
        // an invalid range fails the call before any transaction is opened
        let bounds = settings.map(range_and_direction).transpose()?;
        let request = match source {
            Source::Store(store_name) => {
                debug!("opening cursor on {store_name}");
                let store = self.object_store(store_name, mode)?;
                match &bounds {
                    Some((range, direction)) => store.open_cursor_with_range_and_direction(range, *direction),
                    None => store.open_cursor(),
                }
            }
            Source::Index(store_name, index_name) => {
                debug!("opening cursor on {store_name}.{index_name}");
                let index = self.index(store_name, index_name, mode)?;
                match &bounds {
                    Some((range, direction)) => index.open_cursor_with_range_and_direction(range, *direction),
                    None => index.open_cursor(),
                }
            }
        };
        request.require("open cursor")
    }
}

fn cursor(result: JsValue) -> Option<IdbCursorWithValue> {
    if result.is_null() || result.is_undefined() {
        return None;
    }
    Some(result.unchecked_into())
}
