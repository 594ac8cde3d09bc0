mod common;
use common::*;

use futures::StreamExt;
use idb_wrapper::{CursorDirection, IdbError, KeyRangeSettings, QueryType, TransactionMode};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

fn book(value: JsValue) -> Book { serde_wasm_bindgen::from_value(value).expect("a book") }

#[wasm_bindgen_test]
pub async fn test_put_then_get() -> Result<(), anyhow::Error> {
    let db = open_library("test_put_get").await?;

    let dune = Book::new("0-01", "Dune", 1965);
    db.put_record(BOOKS, &dune).await?;
    assert_eq!(db.get_record::<Book>(BOOKS, &key("0-01")).await?, Some(dune.clone()));

    // put replaces
    let revised = Book::new("0-01", "Dune Messiah", 1969);
    db.put_record(BOOKS, &revised).await?;
    assert_eq!(db.get_record::<Book>(BOOKS, &key("0-01")).await?, Some(revised));

    assert_eq!(db.get_record::<Book>(BOOKS, &key("9-99")).await?, None);
    assert!(db.get(BOOKS, &key("9-99")).await?.is_undefined());

    cleanup(db).await
}

#[wasm_bindgen_test]
pub async fn test_add_refuses_existing_keys() -> Result<(), anyhow::Error> {
    let db = open_library("test_add").await?;

    let dune = Book::new("0-01", "Dune", 1965);
    db.add_record(BOOKS, &dune).await?;
    let err = db.add_record(BOOKS, &Book::new("0-01", "Not Dune", 2000)).await.expect_err("duplicate key");

    assert!(matches!(err, IdbError::Request(_)), "got {err:?}");
    assert!(err.event().is_some());
    assert_eq!(err.dom_name().as_deref(), Some("ConstraintError"));
    assert_eq!(db.get_record::<Book>(BOOKS, &key("0-01")).await?, Some(dune));

    cleanup(db).await
}

#[wasm_bindgen_test]
pub async fn test_delete() -> Result<(), anyhow::Error> {
    let db = open_library("test_delete").await?;
    shelve(&db, &library()).await?;

    db.delete(BOOKS, &key("0-03")).await?;
    assert_eq!(db.get_record::<Book>(BOOKS, &key("0-03")).await?, None);
    // deleting what is not there succeeds
    db.delete(BOOKS, &key("0-03")).await?;
    db.delete(BOOKS, &key("never-stored")).await?;

    // a key range deletes everything it covers
    let range = idb_wrapper::create_key_range(&KeyRangeSettings::bound("0-04", "0-05"))?;
    db.delete(BOOKS, &range.into()).await?;

    let isbns: Vec<String> = db.get_all_records::<Book>(BOOKS).await?.into_iter().map(|b| b.isbn).collect();
    assert_eq!(isbns, vec!["0-01", "0-02"]);

    cleanup(db).await
}

#[wasm_bindgen_test]
pub async fn test_get_all_and_clear() -> Result<(), anyhow::Error> {
    let db = open_library("test_get_all").await?;
    assert_eq!(db.get_all(BOOKS).await?.length(), 0);

    // written out of order, read back in key order
    let mut books = library();
    books.reverse();
    shelve(&db, &books).await?;
    assert_eq!(db.get_all_records::<Book>(BOOKS).await?, library());

    db.clear(BOOKS).await?;
    assert!(db.get_all_records::<Book>(BOOKS).await?.is_empty());

    cleanup(db).await
}

#[wasm_bindgen_test]
pub async fn test_unknown_store() -> Result<(), anyhow::Error> {
    let db = open_library("test_unknown_store").await?;

    let err = db.get("magazines", &key("0-01")).await.expect_err("no such store");
    assert!(matches!(err, IdbError::Host { .. }), "got {err:?}");
    assert_eq!(err.dom_name().as_deref(), Some("NotFoundError"));

    cleanup(db).await
}

#[wasm_bindgen_test]
pub async fn test_open_cursor() -> Result<(), anyhow::Error> {
    let db = open_library("test_cursor").await?;
    shelve(&db, &library()).await?;

    // no range: first record in key order
    let cursor = db.open_cursor(BOOKS, TransactionMode::ReadOnly, None).await?.expect("records exist");
    assert_eq!(cursor.key().expect("key"), key("0-01"));
    assert_eq!(book(cursor.value().expect("value")).title, "Dune");

    // walking backwards from the top of the range
    let settings = KeyRangeSettings::bound("0-02", "0-04").with_direction(CursorDirection::Prev);
    let cursor = db.open_cursor(BOOKS, TransactionMode::ReadOnly, Some(&settings)).await?.expect("records in range");
    assert_eq!(book(cursor.value().expect("value")).isbn, "0-04");

    let exclusive = KeyRangeSettings::bound("0-02", "0-04").with_direction(CursorDirection::Prev).with_upper_exclusive(true);
    let cursor = db.open_cursor(BOOKS, TransactionMode::ReadOnly, Some(&exclusive)).await?.expect("records in range");
    assert_eq!(book(cursor.value().expect("value")).isbn, "0-03");

    let only = KeyRangeSettings::only("0-05");
    let cursor = db.open_cursor(BOOKS, TransactionMode::ReadOnly, Some(&only)).await?.expect("exact match");
    assert_eq!(book(cursor.value().expect("value")).title, "Blindsight");

    cleanup(db).await
}

#[wasm_bindgen_test]
pub async fn test_empty_range_gives_no_cursor() -> Result<(), anyhow::Error> {
    let db = open_library("test_empty_cursor").await?;
    assert!(db.open_cursor(BOOKS, TransactionMode::ReadOnly, None).await?.is_none());

    shelve(&db, &library()).await?;
    let nothing = KeyRangeSettings::lower_bound("1-00");
    assert!(db.open_cursor(BOOKS, TransactionMode::ReadOnly, Some(&nothing)).await?.is_none());
    assert!(db.open_index_cursor(BOOKS, BY_YEAR, TransactionMode::ReadOnly, Some(&KeyRangeSettings::only(1900))).await?.is_none());

    cleanup(db).await
}

#[wasm_bindgen_test]
pub async fn test_invalid_settings_fail_before_any_transaction() -> Result<(), anyhow::Error> {
    let db = open_library("test_invalid_cursor").await?;

    let no_direction = KeyRangeSettings { direction: None, ..KeyRangeSettings::only("0-01") };
    let err = db.open_cursor(BOOKS, TransactionMode::ReadOnly, Some(&no_direction)).await.expect_err("invalid settings");
    assert!(matches!(err, IdbError::InvalidQuery), "got {err:?}");

    // the range is checked before the store is even looked up
    let err = db.open_cursor("magazines", TransactionMode::ReadOnly, Some(&no_direction)).await.expect_err("invalid settings");
    assert!(matches!(err, IdbError::InvalidQuery), "got {err:?}");

    let no_upper = KeyRangeSettings { upper: None, ..KeyRangeSettings::bound(1960, 1990) };
    let err = db.open_index_cursor(BOOKS, BY_YEAR, TransactionMode::ReadOnly, Some(&no_upper)).await.expect_err("no upper key");
    assert!(matches!(err, IdbError::UpperBoundMissing), "got {err:?}");

    assert!(db.scan(BOOKS, None, Some(&no_direction)).is_err());

    cleanup(db).await
}

#[wasm_bindgen_test]
pub async fn test_open_index_cursor() -> Result<(), anyhow::Error> {
    let db = open_library("test_index_cursor").await?;
    shelve(&db, &library()).await?;

    // newest book published in the eighties
    let settings = KeyRangeSettings::bound(1980, 1990).with_upper_exclusive(true).with_direction(CursorDirection::Prev);
    let cursor = db.open_index_cursor(BOOKS, BY_YEAR, TransactionMode::ReadOnly, Some(&settings)).await?.expect("eighties books");
    assert_eq!(cursor.key().expect("index key"), JsValue::from(1989));
    assert_eq!(cursor.primary_key().expect("primary key"), key("0-03"));

    // an upper bound query takes its key from the lower slot
    let settings = KeyRangeSettings {
        query_type: Some(QueryType::UpperBound),
        direction: Some(CursorDirection::Prev),
        lower: Some(JsValue::from(2007)),
        ..Default::default()
    };
    let cursor = db.open_index_cursor(BOOKS, BY_YEAR, TransactionMode::ReadOnly, Some(&settings)).await?.expect("older books");
    assert_eq!(book(cursor.value().expect("value")).title, "Blindsight");

    cleanup(db).await
}

#[wasm_bindgen_test]
pub async fn test_cursor_in_readwrite_mode_can_update() -> Result<(), anyhow::Error> {
    let db = open_library("test_cursor_update").await?;
    shelve(&db, &library()).await?;

    let cursor = db.open_cursor(BOOKS, TransactionMode::ReadWrite, Some(&KeyRangeSettings::only("0-02"))).await?.expect("record");
    let updated = serde_wasm_bindgen::to_value(&Book::new("0-02", "Count Zero", 1986)).expect("serializable");
    let request = cursor.update(&updated).expect("update request");
    succeeded(&request).await;

    assert_eq!(db.get_record::<Book>(BOOKS, &key("0-02")).await?.map(|b| b.title).as_deref(), Some("Count Zero"));

    cleanup(db).await
}

async fn succeeded(request: &web_sys::IdbRequest) {
    let done = js_sys::Promise::new(&mut |resolve, _reject| request.set_onsuccess(Some(&resolve)));
    wasm_bindgen_futures::JsFuture::from(done).await.expect("update settles");
}

#[wasm_bindgen_test]
pub async fn test_scan() -> Result<(), anyhow::Error> {
    let db = open_library("test_scan").await?;
    shelve(&db, &library()).await?;

    let everything: Vec<_> = db.scan(BOOKS, None, None)?.collect().await;
    let titles: Vec<String> = everything.into_iter().map(|v| v.map(|v| book(v).title)).collect::<Result<_, _>>()?;
    assert_eq!(titles, vec!["Dune", "Neuromancer", "Hyperion", "Anathem", "Blindsight"]);

    let recent = KeyRangeSettings::lower_bound(1985).with_direction(CursorDirection::Prev);
    let years: Vec<u32> = db
        .scan(BOOKS, Some(BY_YEAR), Some(&recent))?
        .map(|v| v.map(|v| book(v).year))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_, _>>()?;
    assert_eq!(years, vec![2008, 2006, 1989]);

    let none: Vec<_> = db.scan(BOOKS, Some(BY_YEAR), Some(&KeyRangeSettings::only(1900)))?.collect().await;
    assert!(none.is_empty());

    cleanup(db).await
}

#[wasm_bindgen_test]
pub async fn test_scan_of_unknown_index() -> Result<(), anyhow::Error> {
    let db = open_library("test_scan_unknown").await?;

    let err = db.scan(BOOKS, Some("by_author"), None).err().expect("no such index");
    assert_eq!(err.dom_name().as_deref(), Some("NotFoundError"));

    cleanup(db).await
}
