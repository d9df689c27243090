use std::sync::Arc;

use countrydesk_core::{Buffer, Column, ColumnValue, ContentItem, DocumentId, GroupedList};
use countrydesk_engine::{Desk, DeskConfig, EngineError, NewCountry, StagedFile};
use countrydesk_harness::{COLLECTION, RecordingNotifier, ScriptedGate, TestDesk};
use countrydesk_storage::LocalCache;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn norway() -> NewCountry {
    NewCountry {
        name: "Norway".into(),
        region: "Europe".into(),
        flag: Some(StagedFile::new("flag.png", b"png".to_vec())),
    }
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn incomplete_form_makes_no_remote_calls() -> TestResult {
    let t = TestDesk::new()?;
    let new = NewCountry {
        name: "Norway".into(),
        ..NewCountry::default()
    };

    match t.desk.create_country(new).await {
        Err(EngineError::Validation(err)) => assert_eq!(err.missing, vec!["flag", "region"]),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(t.blobs.uploads().is_empty());
    assert!(t.notices.notices().is_empty());
    assert!(t.desk.countries().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn created_country_has_every_section() -> TestResult {
    let t = TestDesk::new()?;
    let id = t.desk.create_country(norway()).await?;

    assert_eq!(t.notices.successes(), vec!["Norway created successfully!".to_string()]);
    assert_eq!(t.blobs.read("countries/norway/flag.png"), Some(b"png".to_vec()));

    let doc = t.desk.country(id).await?;
    assert_eq!(doc.name(), Some("Norway"));
    assert_eq!(doc.text(Column::Region), Some("Europe"));
    assert_eq!(
        doc.column(Column::Flag),
        Some(&ColumnValue::Items(vec![ContentItem::stored_asset(
            t.blob_url("countries/norway/flag.png")
        )]))
    );
    assert_eq!(
        doc.column(Column::Transport),
        Some(&GroupedList::with_keys(Column::Transport.group_keys()).to_column())
    );
    assert_eq!(doc.column(Column::Gallery), Some(&ColumnValue::Items(Vec::new())));
    Ok(())
}

#[tokio::test]
async fn names_are_trimmed() -> TestResult {
    let t = TestDesk::new()?;
    let id = t
        .desk
        .create_country(NewCountry {
            name: "  Norway ".into(),
            ..norway()
        })
        .await?;
    assert_eq!(t.desk.country(id).await?.name(), Some("Norway"));
    assert!(t.blobs.contains("countries/norway/flag.png"));
    Ok(())
}

#[tokio::test]
async fn flag_upload_failure_creates_nothing() -> TestResult {
    let t = TestDesk::new()?;
    t.blobs.fail_upload_of("countries/norway/flag.png");

    assert!(t.desk.create_country(norway()).await.is_err());
    assert_eq!(
        t.notices.errors(),
        vec!["Failed to upload countries/norway/flag.png.".to_string()]
    );
    assert!(t.desk.countries().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn new_country_is_listed_after_creation() -> TestResult {
    let t = TestDesk::new()?;
    assert!(t.desk.countries().await?.is_empty());
    let id = t.desk.create_country(norway()).await?;

    let listed = t.desk.countries().await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    Ok(())
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn list_is_served_from_cache() -> TestResult {
    let t = TestDesk::new()?;
    t.seed_country("Chile", vec![]).await?;

    t.desk.countries().await?;
    t.desk.countries().await?;
    assert_eq!(t.store.fetch_count(), 1);

    t.desk.repository().refresh().await?;
    assert_eq!(t.store.fetch_count(), 2);
    Ok(())
}

#[tokio::test]
async fn logout_forces_refetch() -> TestResult {
    let t = TestDesk::new()?;
    t.seed_country("Chile", vec![]).await?;

    t.desk.countries().await?;
    t.desk.logout()?;
    assert_eq!(t.cache.get(COLLECTION)?, None);

    t.desk.countries().await?;
    assert_eq!(t.store.fetch_count(), 2);
    Ok(())
}

#[tokio::test]
async fn unknown_country_is_not_found() -> TestResult {
    let t = TestDesk::new()?;
    t.seed_country("Chile", vec![]).await?;
    let err = t.desk.country(DocumentId::new()).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn disk_cache_holds_saved_sections() -> TestResult {
    let t = TestDesk::with_disk_cache()?;
    let id = t.seed_country("Chile", vec![]).await?;

    let mut cities = t
        .desk
        .open_section::<Vec<ContentItem>>(id, Column::Cities)
        .await?;
    cities.add(ContentItem::scalar("Valparaíso"), None)?;
    cities.save().await?;

    let cached = t.cache.get(COLLECTION)?.ok_or("cache entry missing")?;
    assert_eq!(
        cached[0].column(Column::Cities),
        Some(&ColumnValue::Items(vec![ContentItem::scalar("Valparaíso")]))
    );
    assert_eq!(t.store.fetch_count(), 1);
    Ok(())
}

// ============================================================================
// Configured desk
// ============================================================================

#[tokio::test]
async fn configured_desk_writes_flags_to_disk() -> TestResult {
    let dir = tempfile::tempdir()?;
    let config = DeskConfig::from_toml_str(&format!(
        "[store]\npath = \":memory:\"\n\n[blobs]\nroot = {:?}\npublic_base = \"https://cdn.test/\"\n",
        dir.path().join("blobs")
    ))?;
    let gate = Arc::new(ScriptedGate::new());
    let notices = Arc::new(RecordingNotifier::new());
    let desk = Desk::open(&config, gate, notices.clone())?;

    let id = desk.create_country(norway()).await?;
    let written = std::fs::read(dir.path().join("blobs/countries/norway/flag.png"))?;
    assert_eq!(written, b"png");

    let doc = desk.country(id).await?;
    assert_eq!(
        doc.column(Column::Flag),
        Some(&ColumnValue::Items(vec![ContentItem::stored_asset(
            "https://cdn.test/countries/norway/flag.png"
        )]))
    );
    assert_eq!(notices.successes(), vec!["Norway created successfully!".to_string()]);
    Ok(())
}

#[tokio::test]
async fn flag_without_usable_name_uploads_nothing() -> TestResult {
    let t = TestDesk::new()?;
    let new = NewCountry {
        flag: Some(StagedFile::new("...", b"png".to_vec())),
        ..norway()
    };

    assert!(matches!(t.desk.create_country(new).await, Err(EngineError::Core(_))));
    assert!(t.blobs.uploads().is_empty());
    assert!(t.desk.countries().await?.is_empty());
    Ok(())
}
