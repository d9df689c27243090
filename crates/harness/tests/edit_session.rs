use countrydesk_core::{Change, Column, ColumnValue, ContentItem, Slot};
use countrydesk_engine::{EditSession, EngineError, Notice, DELETE_PROMPT, DISCARD_PROMPT};
use countrydesk_harness::{StoreFailure, TestDesk};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn facts(items: &[&str]) -> Vec<ContentItem> {
    items.iter().map(|s| ContentItem::scalar(*s)).collect()
}

async fn fun_facts_session(
    t: &TestDesk,
    initial: &[&str],
) -> Result<EditSession<Vec<ContentItem>>, EngineError> {
    let id = t
        .seed_country("Portugal", vec![(Column::FunFacts, ColumnValue::Items(facts(initial)))])
        .await?;
    t.desk.open_section(id, Column::FunFacts).await
}

// ============================================================================
// Cancel
// ============================================================================

#[tokio::test]
async fn clean_cancel_reverts_without_prompt() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["fact1"]).await?;

    assert!(!session.is_dirty());
    assert!(session.cancel().await);
    assert!(session.cancel().await);
    assert!(t.gate.prompts().is_empty());
    assert_eq!(session.buffer(), session.canonical());
    Ok(())
}

#[tokio::test]
async fn dirty_cancel_confirmed_reverts() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["fact1"]).await?;
    session.add(ContentItem::scalar("draft"), None)?;

    t.gate.answer(true);
    assert!(session.cancel().await);
    assert_eq!(t.gate.prompts(), vec![DISCARD_PROMPT.to_string()]);
    assert_eq!(session.buffer(), &facts(&["fact1"]));
    assert!(!session.is_dirty());
    Ok(())
}

#[tokio::test]
async fn dirty_cancel_declined_keeps_edits() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["fact1"]).await?;
    session.add(ContentItem::scalar("draft"), None)?;

    t.gate.answer(false);
    assert!(!session.cancel().await);
    assert_eq!(session.buffer(), &facts(&["fact1", "draft"]));
    assert!(session.is_dirty());
    Ok(())
}

// ============================================================================
// Dirty tracking
// ============================================================================

#[tokio::test]
async fn inverse_edits_restore_clean_state() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["a", "b"]).await?;

    session.add(ContentItem::scalar("c"), None)?;
    assert!(session.is_dirty());
    t.gate.answer(true);
    assert!(session.remove(Slot::flat(2)).await?);
    assert!(!session.is_dirty());

    session.change(Slot::flat(1), Change::Replace(ContentItem::scalar("B")))?;
    assert!(session.is_dirty());
    session.change(Slot::flat(1), Change::field("text", "b"))?;
    assert!(!session.is_dirty());
    Ok(())
}

#[tokio::test]
async fn reordering_counts_as_a_change() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["a", "b"]).await?;
    session.change(Slot::flat(0), Change::field("text", "b"))?;
    session.change(Slot::flat(1), Change::field("text", "a"))?;
    assert!(session.is_dirty());
    Ok(())
}

#[tokio::test]
async fn failed_change_leaves_buffer_untouched() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["a"]).await?;
    assert!(session.change(Slot::flat(5), Change::field("text", "x")).is_err());
    assert!(session.change(Slot::grouped(0, 0), Change::field("text", "x")).is_err());
    assert_eq!(session.buffer(), &facts(&["a"]));
    assert!(!session.is_dirty());
    Ok(())
}

// ============================================================================
// Add / remove
// ============================================================================

#[tokio::test]
async fn add_signals_scroll_to_new_item() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["a", "b"]).await?;
    let index = session.add(ContentItem::scalar(""), None)?;
    assert_eq!(index, 2);
    assert_eq!(
        t.notices.notices(),
        vec![Notice::ScrollToEnd {
            column: Column::FunFacts,
            group: None,
            index: 2,
        }]
    );
    Ok(())
}

#[tokio::test]
async fn delete_is_positional_and_confirmed() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["A", "B", "C"]).await?;

    t.gate.answer(true);
    assert!(session.remove(Slot::flat(1)).await?);
    assert_eq!(session.buffer(), &facts(&["A", "C"]));
    assert_eq!(t.gate.prompts(), vec![DELETE_PROMPT.to_string()]);
    Ok(())
}

#[tokio::test]
async fn declined_delete_changes_nothing() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["A", "B", "C"]).await?;

    t.gate.answer(false);
    assert!(!session.remove(Slot::flat(1)).await?);
    assert_eq!(session.buffer(), &facts(&["A", "B", "C"]));
    assert!(!session.is_dirty());
    Ok(())
}

// ============================================================================
// Save
// ============================================================================

#[tokio::test]
async fn fun_facts_end_to_end() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["fact1", "fact2"]).await?;

    session.add(ContentItem::scalar(""), None)?;
    assert_eq!(session.buffer(), &facts(&["fact1", "fact2", ""]));
    assert!(session.is_dirty());

    session.change(Slot::flat(2), Change::Replace(ContentItem::scalar("fact3")))?;
    assert_eq!(session.buffer(), &facts(&["fact1", "fact2", "fact3"]));

    session.save().await?;
    assert_eq!(session.canonical(), &facts(&["fact1", "fact2", "fact3"]));
    assert!(!session.is_dirty());
    assert!(!session.is_busy());
    assert_eq!(t.notices.successes(), vec!["Fun facts updated successfully!".to_string()]);

    // Persisted remotely.
    let fresh = t.desk.repository().refresh().await?;
    assert_eq!(
        fresh[0].column(Column::FunFacts),
        Some(&ColumnValue::Items(facts(&["fact1", "fact2", "fact3"])))
    );
    Ok(())
}

#[tokio::test]
async fn cancel_after_save_keeps_saved_buffer() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["a"]).await?;
    session.add(ContentItem::scalar("b"), None)?;
    session.save().await?;

    assert!(session.cancel().await);
    assert!(t.gate.prompts().is_empty());
    assert_eq!(session.buffer(), &facts(&["a", "b"]));
    Ok(())
}

#[tokio::test]
async fn missing_document_keeps_edits() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["a"]).await?;
    session.add(ContentItem::scalar("b"), None)?;

    t.store.fail_next_update(StoreFailure::NotFound);
    let err = session.save().await.unwrap_err();
    assert!(err.is_not_found());
    assert!(session.is_dirty());
    assert!(!session.is_busy());
    assert_eq!(session.buffer(), &facts(&["a", "b"]));
    assert_eq!(session.canonical(), &facts(&["a"]));
    assert_eq!(t.notices.errors(), vec!["Document not found!".to_string()]);
    Ok(())
}

#[tokio::test]
async fn network_failure_allows_retry() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["a"]).await?;
    session.add(ContentItem::scalar("b"), None)?;

    t.store.fail_next_update(StoreFailure::Network);
    assert!(session.save().await.is_err());
    assert_eq!(t.notices.errors(), vec!["Failed to update fun facts.".to_string()]);
    assert_eq!(t.store.update_count(), 0);

    session.save().await?;
    assert!(!session.is_dirty());
    assert_eq!(t.store.update_count(), 1);
    Ok(())
}

#[tokio::test]
async fn saving_a_clean_session_still_writes() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["a"]).await?;
    session.save().await?;
    assert_eq!(t.store.update_count(), 1);
    assert!(!session.is_dirty());
    Ok(())
}

#[tokio::test]
async fn text_columns_do_not_open_sessions() -> TestResult {
    let t = TestDesk::new()?;
    let id = t.seed_country("Chile", vec![]).await?;
    let result = t.desk.open_section::<Vec<ContentItem>>(id, Column::Name).await;
    assert!(result.is_err());
    Ok(())
}

// ============================================================================
// Busy flag
// ============================================================================

#[tokio::test]
async fn busy_only_while_save_is_in_flight() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["a"]).await?;
    session.add(ContentItem::scalar("b"), None)?;
    let busy = session.busy_flag();
    assert!(!busy.is_set());

    t.store.update_hold.arm();
    let observe = async {
        t.store.update_hold.entered().await;
        let during = busy.is_set();
        t.store.update_hold.release();
        during
    };
    let (saved, during) = tokio::join!(session.save(), observe);
    saved?;

    assert!(during);
    assert!(!session.is_busy());
    assert!(!session.is_dirty());
    Ok(())
}

#[tokio::test]
async fn abandoned_save_clears_busy() -> TestResult {
    let t = TestDesk::new()?;
    let mut session = fun_facts_session(&t, &["a"]).await?;
    session.add(ContentItem::scalar("b"), None)?;
    let busy = session.busy_flag();

    t.store.update_hold.arm();
    let observe = async {
        t.store.update_hold.entered().await;
        busy.is_set()
    };
    let during = tokio::select! {
        _ = session.save() => None,
        during = observe => Some(during),
    };

    assert_eq!(during, Some(true));
    assert!(!session.is_busy());
    assert!(session.is_dirty());
    assert_eq!(t.store.update_count(), 0);

    session.save().await?;
    assert!(!session.is_dirty());
    Ok(())
}
