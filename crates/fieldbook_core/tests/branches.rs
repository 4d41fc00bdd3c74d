use fieldbook_core::{
    ConflictError, CustomerInput, DataStore, DueDay, EntityRef, Plan, Settings, StoreError,
    ValidationError,
};

fn add_customer(store: &DataStore, name: &str, branch: &str) -> i64 {
    store
        .save_customer(
            &CustomerInput {
                name: name.to_string(),
                branch: branch.to_string(),
                plan: Some(Plan::Start),
                due_day: Some(DueDay::Day5),
            },
            None,
        )
        .unwrap()
        .id
}

#[test]
fn add_branch_appends_and_rejects_duplicates() {
    let store = DataStore::open_in_memory().unwrap();

    let settings = store.add_branch("  Eldorado ").unwrap();
    assert_eq!(settings.branches.last().map(String::as_str), Some("Eldorado"));

    assert!(matches!(
        store.add_branch("Eldorado"),
        Err(StoreError::Conflict(ConflictError::BranchExists(_)))
    ));
    assert!(matches!(
        store.add_branch("   "),
        Err(StoreError::Validation(ValidationError::EmptyBranchName))
    ));
}

#[test]
fn save_settings_rejects_duplicate_or_blank_names() {
    let store = DataStore::open_in_memory().unwrap();

    let duplicate = Settings {
        branches: vec!["A".to_string(), " A ".to_string()],
        last_backup_timestamp: None,
    };
    assert!(matches!(
        store.save_settings(&duplicate),
        Err(StoreError::Validation(ValidationError::DuplicateBranch(_)))
    ));
    assert_eq!(store.settings().unwrap(), Settings::default());
}

#[test]
fn remove_unused_branch_succeeds() {
    let mut store = DataStore::open_in_memory().unwrap();
    let settings = store.remove_branch("Juquiaguassu").unwrap();
    assert_eq!(settings.branches, vec!["Iporanga", "Rio Preto"]);
    assert_eq!(store.settings().unwrap(), settings);
}

#[test]
fn remove_branch_trims_the_name_like_add_branch() {
    let mut store = DataStore::open_in_memory().unwrap();
    store.add_branch(" Eldorado ").unwrap();

    let settings = store.remove_branch("  Eldorado ").unwrap();
    assert!(!settings.has_branch("Eldorado"));

    let settings = store.remove_branch(" Juquiaguassu\t").unwrap();
    assert_eq!(settings.branches, vec!["Iporanga", "Rio Preto"]);

    add_customer(&store, "Ana", "Rio Preto");
    assert!(matches!(
        store.remove_branch(" Rio Preto "),
        Err(StoreError::Conflict(ConflictError::BranchInUse { branch, count: 1 })) if branch == "Rio Preto"
    ));
}

#[test]
fn remove_branch_in_use_reports_count_including_canceled() {
    let mut store = DataStore::open_in_memory().unwrap();
    add_customer(&store, "Ana", "Rio Preto");
    let bruno = add_customer(&store, "Bruno", "Rio Preto");
    store.cancel_customer(bruno).unwrap();

    let err = store.remove_branch("Rio Preto").unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict(ConflictError::BranchInUse { count: 2, .. })
    ));
    assert!(store.settings().unwrap().has_branch("Rio Preto"));
}

#[test]
fn remove_unknown_branch_is_not_found() {
    let mut store = DataStore::open_in_memory().unwrap();
    assert!(matches!(
        store.remove_branch("Atlantis"),
        Err(StoreError::NotFound(EntityRef::Branch(name))) if name == "Atlantis"
    ));
}

#[test]
fn migrate_moves_customers_then_removes_branch() {
    let mut store = DataStore::open_in_memory().unwrap();
    let ana = add_customer(&store, "Ana", "Rio Preto");
    let bruno = add_customer(&store, "Bruno", "Rio Preto");

    let settings = store
        .migrate_and_remove_branch("Rio Preto", "Iporanga", &[ana, bruno])
        .unwrap();

    assert!(!settings.has_branch("Rio Preto"));
    let snapshot = store.load_snapshot().unwrap();
    assert!(snapshot
        .customers
        .iter()
        .all(|customer| customer.branch == "Iporanga"));
    assert!(snapshot.customers_in_branch("Rio Preto").is_empty());
}

#[test]
fn migrate_rolls_back_on_missing_customer() {
    let mut store = DataStore::open_in_memory().unwrap();
    let ana = add_customer(&store, "Ana", "Rio Preto");

    let err = store
        .migrate_and_remove_branch("Rio Preto", "Iporanga", &[ana, 999])
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(EntityRef::Customer(999))));

    assert_eq!(store.get_customer(ana).unwrap().branch, "Rio Preto");
    assert!(store.settings().unwrap().has_branch("Rio Preto"));
}

#[test]
fn migrate_rolls_back_when_unlisted_customers_remain() {
    let mut store = DataStore::open_in_memory().unwrap();
    let ana = add_customer(&store, "Ana", "Rio Preto");
    add_customer(&store, "Bruno", "Rio Preto");

    let err = store
        .migrate_and_remove_branch("Rio Preto", "Iporanga", &[ana])
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict(ConflictError::BranchInUse { count: 1, .. })
    ));
    assert_eq!(store.get_customer(ana).unwrap().branch, "Rio Preto");
    assert!(store.settings().unwrap().has_branch("Rio Preto"));
}

#[test]
fn migrate_rolls_back_on_name_collision_in_target() {
    let mut store = DataStore::open_in_memory().unwrap();
    add_customer(&store, "Ana", "Iporanga");
    let moved = add_customer(&store, "Ana", "Rio Preto");

    let err = store
        .migrate_and_remove_branch("Rio Preto", "Iporanga", &[moved])
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict(ConflictError::DuplicateCustomer { .. })
    ));
    assert_eq!(store.get_customer(moved).unwrap().branch, "Rio Preto");
}

#[test]
fn migrate_requires_ids_and_distinct_configured_target() {
    let mut store = DataStore::open_in_memory().unwrap();
    let ana = add_customer(&store, "Ana", "Rio Preto");

    assert!(matches!(
        store.migrate_and_remove_branch("Rio Preto", "Iporanga", &[]),
        Err(StoreError::Validation(ValidationError::MissingFields(_)))
    ));
    assert!(matches!(
        store.migrate_and_remove_branch("Rio Preto", "Rio Preto", &[ana]),
        Err(StoreError::Validation(ValidationError::InvalidArgument(_)))
    ));
    assert!(matches!(
        store.migrate_and_remove_branch("Rio Preto", "Atlantis", &[ana]),
        Err(StoreError::Validation(ValidationError::UnknownBranch(_)))
    ));
}
