use captain_core::db::open_db_in_memory;
use captain_core::{
    ActionMode, ActionWorkflow, BusinessCheck, FixedClock, Item, ProtectMode, RecordStore, Stuck,
    Stueck, WorkflowError, WorkflowState,
};
use chrono::NaiveDate;
use std::sync::Arc;

const ALL: &str = "XXXXXXXXXXXXX";

fn workflow<E: captain_core::SqlRecord>() -> ActionWorkflow<E> {
    let store = RecordStore::spawn(open_db_in_memory().unwrap()).unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    ActionWorkflow::with_clock(Arc::new(store), FixedClock(today))
}

fn refresh<E: captain_core::SqlRecord>(workflow: &mut ActionWorkflow<E>) {
    let all = workflow.store().list_all().unwrap();
    workflow.observe(Arc::new(all));
}

fn insert_named(workflow: &mut ActionWorkflow<Stueck>, name: &str) -> Stueck {
    workflow.begin(ActionMode::Insert, Some(Stueck::new(name, ALL)));
    let id = workflow.commit().unwrap().wait().unwrap();
    refresh(workflow);
    workflow
        .observed()
        .unwrap()
        .iter()
        .find(|record| record.id == id)
        .cloned()
        .unwrap()
}

#[test]
fn starts_idle_and_tracks_action_changes() {
    let mut workflow = workflow::<Stueck>();
    assert_eq!(workflow.state(), WorkflowState::Idle);
    assert!(workflow.target().is_none());

    workflow.select_target(Some(Stueck::new("Alpha", ALL)));
    workflow.select_action(ActionMode::Update);
    assert_eq!(workflow.state(), WorkflowState::PendingUpdate);
    assert_eq!(workflow.target().map(|t| t.name.as_str()), Some("Alpha"));

    workflow.select_action(ActionMode::Delete);
    assert_eq!(workflow.state(), WorkflowState::PendingDelete);
    assert!(workflow.target().is_some(), "changing the action keeps the target");

    workflow.reset();
    assert_eq!(workflow.state(), WorkflowState::Idle);
    assert!(workflow.target().is_none());
}

#[test]
fn insert_gate_reports_no_record_no_name_and_collisions() {
    let mut workflow = workflow::<Stueck>();
    insert_named(&mut workflow, "Alpha");

    assert_eq!(
        workflow.check_business_logic(None, ActionMode::Insert),
        BusinessCheck::NoRecord
    );
    assert_eq!(
        workflow.check_business_logic(Some(&Stueck::new("Alpha", ALL)), ActionMode::Insert),
        BusinessCheck::NameExists
    );
    assert_eq!(
        workflow.check_business_logic(Some(&Stueck::new("", ALL)), ActionMode::Insert),
        BusinessCheck::NoName
    );
    assert_eq!(
        workflow.check_business_logic(Some(&Stueck::new("Beta", ALL)), ActionMode::Insert),
        BusinessCheck::Ok
    );
}

#[test]
fn gate_without_observed_set_does_not_block() {
    let mut workflow = workflow::<Stueck>();
    workflow.begin(ActionMode::Insert, Some(Stueck::new("Alpha", ALL)));
    workflow.commit().unwrap().wait().unwrap();

    assert!(workflow.observed().is_none());
    assert_eq!(
        workflow.check_business_logic(Some(&Stueck::new("Alpha", ALL)), ActionMode::Insert),
        BusinessCheck::Ok
    );
}

#[test]
fn update_keeping_current_name_is_always_ok() {
    let mut workflow = workflow::<Stueck>();
    let alpha = insert_named(&mut workflow, "Alpha");
    insert_named(&mut workflow, "Beta");

    workflow.begin(ActionMode::Update, Some(alpha));
    assert_eq!(
        workflow.check_business_logic(Some(&Stueck::new("Alpha", ALL)), ActionMode::Update),
        BusinessCheck::Ok
    );
    assert_eq!(
        workflow.check_business_logic(Some(&Stueck::new("Beta", ALL)), ActionMode::Update),
        BusinessCheck::NameExists
    );
    assert_eq!(
        workflow.check_business_logic(Some(&Stueck::new("Gamma", ALL)), ActionMode::Update),
        BusinessCheck::Ok
    );
}

#[test]
fn update_self_rename_ignores_other_records_sharing_the_name() {
    let store = RecordStore::spawn(open_db_in_memory().unwrap()).unwrap();
    store.insert(Stueck::new("Alpha", ALL)).wait().unwrap();
    store.insert(Stueck::new("Alpha", ALL)).wait().unwrap();
    let mut workflow = ActionWorkflow::new(Arc::new(store));
    refresh(&mut workflow);

    let target = workflow.observed().unwrap()[0].clone();
    workflow.begin(ActionMode::Update, Some(target));
    assert_eq!(
        workflow.check_business_logic(Some(&Stueck::new("Alpha", ALL)), ActionMode::Update),
        BusinessCheck::Ok
    );
}

#[test]
fn invalid_profile_is_reported_for_the_profiled_variant_only() {
    let stuecks = workflow::<Stueck>();
    assert_eq!(
        stuecks.check_business_logic(
            Some(&Stueck::new("Alpha", "X  X         ")),
            ActionMode::Insert
        ),
        BusinessCheck::InvalidProfile
    );

    let stucks = workflow::<Stuck>();
    assert_eq!(
        stucks.check_business_logic(Some(&Stuck::new("Alpha", "anything")), ActionMode::Insert),
        BusinessCheck::Ok
    );
}

#[test]
fn commit_insert_stamps_today_and_gets_store_id() {
    let mut workflow = workflow::<Stueck>();
    let created = insert_named(&mut workflow, "Alpha");

    assert!(created.id > 0);
    assert_eq!(created.update_day, "15-03-2024");
}

#[test]
fn commit_insert_refuses_targets_with_an_id() {
    let mut workflow = workflow::<Stueck>();
    let mut record = Stueck::new("Alpha", ALL);
    record.id = 3;
    workflow.begin(ActionMode::Insert, Some(record));

    assert_eq!(workflow.commit().unwrap_err(), WorkflowError::NonZeroId(3));
}

#[test]
fn commit_requires_action_and_target() {
    let mut workflow = workflow::<Stueck>();
    assert_eq!(workflow.commit().unwrap_err(), WorkflowError::NoPendingAction);

    workflow.select_action(ActionMode::Insert);
    assert_eq!(workflow.commit().unwrap_err(), WorkflowError::NoTarget);
}

#[test]
fn fill_user_fields_requires_a_target_and_keeps_identity() {
    let mut workflow = workflow::<Item>();
    let input = Item::new("Mail", "pw", "web", "", ProtectMode::NotFingerprintProtected);
    assert!(!workflow.fill_user_fields(&input));

    let mut existing = Item::new("Old", "x", "y", "z", ProtectMode::FingerprintProtected);
    existing.id = 12;
    existing.update_day = "01-01-2020".to_string();
    workflow.begin(ActionMode::Update, Some(existing));

    assert!(workflow.fill_user_fields(&input));
    let target = workflow.target().unwrap();
    assert_eq!(target.id, 12);
    assert_eq!(target.update_day, "01-01-2020");
    assert_eq!(target.name, "Mail");
    assert_eq!(target.value, "pw");
    assert_eq!(target.protect_mode, ProtectMode::NotFingerprintProtected);
}

#[test]
fn commit_update_restamps_the_day() {
    let mut workflow = workflow::<Stueck>();
    let mut alpha = insert_named(&mut workflow, "Alpha");
    alpha.update_day = "01-01-2000".to_string();

    workflow.begin(ActionMode::Update, Some(alpha.clone()));
    workflow.fill_user_fields(&Stueck::new("Alpha v2", "X  X  X      "));
    workflow.commit().unwrap().wait().unwrap();

    let stored = workflow.store().list_all().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, alpha.id);
    assert_eq!(stored[0].name, "Alpha v2");
    assert_eq!(stored[0].bool_fields, "X  X  X      ");
    assert_eq!(stored[0].update_day, "15-03-2024");
}

#[test]
fn undo_delete_restores_original_id_and_day() {
    let store = RecordStore::spawn(open_db_in_memory().unwrap()).unwrap();
    let mut original = Stueck::new("X", ALL);
    original.id = 7;
    original.update_day = "01-01-2024".to_string();
    store.insert(original.clone()).wait().unwrap();

    let today = NaiveDate::from_ymd_opt(2030, 12, 31).unwrap();
    let mut workflow = ActionWorkflow::with_clock(Arc::new(store), FixedClock(today));
    workflow.begin(ActionMode::Delete, Some(original.clone()));
    workflow.commit().unwrap().wait().unwrap();
    assert!(workflow.store().list_all().unwrap().is_empty());
    assert_eq!(workflow.last_deleted(), Some(&original));

    assert_eq!(workflow.undo_delete().unwrap().wait().unwrap(), 7);
    assert_eq!(workflow.store().list_all().unwrap(), vec![original]);
    assert!(workflow.last_deleted().is_none());
    assert_eq!(workflow.undo_delete().unwrap_err(), WorkflowError::NothingToUndo);
}

#[test]
fn undo_is_independent_of_later_target_changes() {
    let mut workflow = workflow::<Stueck>();
    let alpha = insert_named(&mut workflow, "Alpha");

    workflow.begin(ActionMode::Delete, Some(alpha.clone()));
    workflow.commit().unwrap().wait().unwrap();
    workflow.begin(ActionMode::Insert, Some(Stueck::new("Other", ALL)));

    workflow.undo_delete().unwrap().wait().unwrap();
    assert_eq!(workflow.store().list_all().unwrap(), vec![alpha]);
}

#[test]
fn delete_of_unpersisted_target_is_refused_and_leaves_nothing_to_undo() {
    let mut workflow = workflow::<Stueck>();
    workflow.begin(ActionMode::Delete, Some(Stueck::new("Never", ALL)));

    assert_eq!(workflow.commit().unwrap_err(), WorkflowError::NotPersisted);
    assert!(workflow.last_deleted().is_none());
    assert_eq!(workflow.undo_delete().unwrap_err(), WorkflowError::NothingToUndo);
    assert!(workflow.store().list_all().unwrap().is_empty());
}
