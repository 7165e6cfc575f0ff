use captain_core::db::open_db_in_memory;
use captain_core::{
    ActionMode, ActionWorkflow, FilteredProjection, FixedClock, PreferenceStore, Profile,
    ProfiledSession, RecordStore, SqlitePreferenceStore, Stueck, PROFILE_PREFERENCE_KEY,
};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn preferences_with(code: Option<&str>) -> SqlitePreferenceStore {
    let mut preferences = SqlitePreferenceStore::new(open_db_in_memory().unwrap());
    if let Some(code) = code {
        preferences.set(PROFILE_PREFERENCE_KEY, code).unwrap();
    }
    preferences
}

fn seeded_store() -> Arc<RecordStore<Stueck>> {
    let store = RecordStore::spawn(open_db_in_memory().unwrap()).unwrap();
    store.insert(Stueck::new("A", "XX XX XX     ")).wait().unwrap();
    store.insert(Stueck::new("C", " X  X  X     ")).wait().unwrap();
    Arc::new(store)
}

fn session(
    store: Arc<RecordStore<Stueck>>,
    preferences: SqlitePreferenceStore,
) -> ProfiledSession<Stueck, SqlitePreferenceStore> {
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    ProfiledSession::with_parts(
        ActionWorkflow::with_clock(store, FixedClock(today)),
        FilteredProjection::with_seed(5),
        preferences,
    )
    .unwrap()
}

fn projected(session: &ProfiledSession<Stueck, SqlitePreferenceStore>) -> Vec<String> {
    session
        .projection()
        .records()
        .iter()
        .map(|record| record.name.clone())
        .collect()
}

#[test]
fn stored_profile_is_loaded_on_open() {
    let mut session = session(seeded_store(), preferences_with(Some("X  X  X      ")));
    assert_eq!(session.profile().encode(), "X  X  X      ");

    assert!(session.wait_for_update(WAIT));
    assert_eq!(session.all_records().unwrap().len(), 2);
    assert_eq!(projected(&session), vec!["A"]);
}

#[test]
fn missing_or_invalid_preference_falls_back_to_default() {
    let fresh = session(seeded_store(), preferences_with(None));
    assert_eq!(fresh.profile(), &Profile::default());

    let broken = session(seeded_store(), preferences_with(Some("X  X         ")));
    assert_eq!(broken.profile(), &Profile::default());
}

#[test]
fn set_profile_persists_and_recomputes() {
    let mut session = session(seeded_store(), preferences_with(Some("X  X  X      ")));
    assert!(session.wait_for_update(WAIT));

    assert!(session.set_profile(" X  X  X     "));
    assert_eq!(projected(&session), vec!["A", "C"]);
    assert_eq!(
        session.preferences().get(PROFILE_PREFERENCE_KEY).unwrap().as_deref(),
        Some(" X  X  X     ")
    );
}

#[test]
fn invalid_profile_change_is_refused() {
    let mut session = session(seeded_store(), preferences_with(Some("X  X  X      ")));
    assert!(session.wait_for_update(WAIT));

    assert!(!session.set_profile("XXXXXXXXXXXXXX"));
    assert!(!session.set_profile("X  X         "));
    assert_eq!(session.profile().encode(), "X  X  X      ");
    assert_eq!(projected(&session), vec!["A"]);
    assert_eq!(
        session.preferences().get(PROFILE_PREFERENCE_KEY).unwrap().as_deref(),
        Some("X  X  X      ")
    );
}

#[test]
fn committed_changes_reach_projection_and_gate_after_sync() {
    let mut session = session(seeded_store(), preferences_with(Some("X  X  X      ")));
    assert!(session.wait_for_update(WAIT));
    assert!(!session.sync(), "nothing new queued yet");

    let workflow = session.workflow_mut();
    workflow.begin(ActionMode::Insert, Some(Stueck::new("B", "X  X  X     X")));
    workflow.commit().unwrap().wait().unwrap();

    assert!(session.sync());
    assert_eq!(projected(&session), vec!["A", "B"]);
    assert_eq!(session.projection().pending_len(), 2);
    assert_eq!(session.workflow().observed().map(<[Stueck]>::len), Some(3));
    assert_eq!(
        session
            .workflow()
            .observed()
            .unwrap()
            .iter()
            .find(|record| record.name == "B")
            .map(|record| record.update_day.as_str()),
        Some("01-06-2024")
    );
}

#[test]
fn feed_style_profile_code_is_persisted_canonically() {
    let mut session = session(seeded_store(), preferences_with(None));

    assert!(session.set_profile("XYYXYYXYYYYYY"));
    assert_eq!(session.profile().encode(), "X  X  X      ");
    assert_eq!(
        session.preferences().get(PROFILE_PREFERENCE_KEY).unwrap().as_deref(),
        Some("X  X  X      ")
    );
}
