#![allow(dead_code)]

use idb_wrapper::schema::{initialize_store, IndexConfig, StoreConfig};
use idb_wrapper::{Database, DatabaseConfig};
use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_wasm::{ConsoleConfig, WASMLayerConfigBuilder};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

pub const BOOKS: &str = "books";
pub const BY_YEAR: &str = "by_year";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: String,
    pub title: String,
    pub year: u32,
}

impl Book {
    pub fn new(isbn: &str, title: &str, year: u32) -> Self { Self { isbn: isbn.to_owned(), title: title.to_owned(), year } }
}

pub fn setup() {
    console_error_panic_hook::set_once();

    let _ = tracing::subscriber::set_global_default(
        tracing_subscriber::registry::Registry::default().with(tracing_wasm::WASMLayer::new(
            WASMLayerConfigBuilder::new()
                .set_report_logs_in_timings(true)
                .set_console_config(ConsoleConfig::ReportWithoutConsoleColor)
                .set_max_level(tracing::Level::INFO)
                .build(),
        )),
    );
}

/// A database name no other test run will collide with
pub fn db_name(prefix: &str) -> String {
    format!("{prefix}_{}_{}", js_sys::Date::now() as u64, (js_sys::Math::random() * 1e9) as u64)
}

/// Opens a fresh database holding a `books` store keyed by `isbn` with a `by_year` index
pub async fn open_library(prefix: &str) -> Result<Database, anyhow::Error> {
    setup();
    let db = Database::open(DatabaseConfig::new(db_name(prefix), 1).on_upgrade(|_event, db| {
        initialize_store(db, &StoreConfig::new(BOOKS, "isbn").index(IndexConfig::new(BY_YEAR, "year")))?;
        Ok(())
    }));
    db.wait().await?;
    Ok(db)
}

pub async fn shelve(db: &Database, books: &[Book]) -> Result<(), anyhow::Error> {
    for book in books {
        db.put_record(BOOKS, book).await?;
    }
    Ok(())
}

pub fn library() -> Vec<Book> {
    vec![
        Book::new("0-01", "Dune", 1965),
        Book::new("0-02", "Neuromancer", 1984),
        Book::new("0-03", "Hyperion", 1989),
        Book::new("0-04", "Anathem", 2008),
        Book::new("0-05", "Blindsight", 2006),
    ]
}

pub async fn cleanup(db: Database) -> Result<(), anyhow::Error> {
    let name = db.name().to_owned();
    db.close();
    Database::delete_database(&name).await?;
    Ok(())
}

pub fn key(s: &str) -> JsValue { JsValue::from_str(s) }
