use fieldbook_core::{
    BackupBundle, CustomerInput, CustomerStatus, DataStore, DueDay, InstallationInput,
    PaymentMethod, Plan, StoreError, BACKUP_FORMAT_VERSION,
};

fn seeded_store() -> DataStore {
    let mut store = DataStore::open_in_memory().unwrap();
    store.add_branch("Eldorado").unwrap();
    let ana = store
        .save_customer(
            &CustomerInput {
                name: "Ana".to_string(),
                branch: "Eldorado".to_string(),
                plan: Some(Plan::Master),
                due_day: Some(DueDay::Day25),
            },
            None,
        )
        .unwrap();
    store
        .save_installation(
            &InstallationInput {
                branch: "Eldorado".to_string(),
                plan: Some(Plan::Master),
                due_day: Some(DueDay::Day25),
                method1: Some(PaymentMethod::Pix),
                amount1: "100".to_string(),
                method2: Some(PaymentMethod::Cash),
                amount2: "79.9".to_string(),
            },
            ana.id,
            None,
        )
        .unwrap();
    store
        .import_customers("Bruno\nCarla", "Iporanga", Some(Plan::Start), Some(DueDay::Day5))
        .unwrap();
    store
}

#[test]
fn export_then_restore_into_empty_store_reproduces_state() {
    let source = seeded_store();
    let bundle = source.export_snapshot().unwrap();
    assert_eq!(bundle.version, BACKUP_FORMAT_VERSION);
    assert!(bundle.backup_date.is_some());

    let json = bundle.to_json_pretty().unwrap();
    let parsed = BackupBundle::from_json(&json).unwrap();

    let mut target = DataStore::open_in_memory().unwrap();
    let summary = target.import_snapshot(&parsed).unwrap();
    assert_eq!(summary.customers, 3);
    assert_eq!(summary.installations, 1);

    let before = source.load_snapshot().unwrap();
    let after = target.load_snapshot().unwrap();
    assert_eq!(after.customers, before.customers);
    assert_eq!(after.installations, before.installations);
    assert_eq!(after.settings, before.settings);
}

#[test]
fn restore_replaces_existing_state_entirely() {
    let source = seeded_store();
    let bundle = source.export_snapshot().unwrap();

    let mut target = DataStore::open_in_memory().unwrap();
    target
        .import_customers("Zeca\nYara\nXavier\nWalter", "Rio Preto", Some(Plan::Start), Some(DueDay::Day30))
        .unwrap();
    target.import_snapshot(&bundle).unwrap();

    let snapshot = target.load_snapshot().unwrap();
    let names = snapshot
        .customers
        .iter()
        .map(|customer| customer.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Ana", "Bruno", "Carla"]);
    assert!(snapshot.settings.has_branch("Eldorado"));
}

#[test]
fn restored_totals_are_recomputed_from_payments() {
    let source = seeded_store();
    let mut bundle = source.export_snapshot().unwrap();
    bundle.installations[0].total = 1.0;

    let mut target = DataStore::open_in_memory().unwrap();
    target.import_snapshot(&bundle).unwrap();

    let installation = &target.load_snapshot().unwrap().installations[0];
    assert!((installation.total - 179.9).abs() < 1e-9);
}

#[test]
fn rejected_bundle_leaves_store_untouched() {
    let mut store = seeded_store();
    let before = store.load_snapshot().unwrap();

    let mut bundle = store.export_snapshot().unwrap();
    bundle.installations[0].customer_id = 4242;
    let err = store.import_snapshot(&bundle).unwrap_err();
    assert!(matches!(err, StoreError::MalformedBackup(_)));

    let mut wrong_version = store.export_snapshot().unwrap();
    wrong_version.version = "fieldbook_v2".to_string();
    assert!(matches!(
        store.import_snapshot(&wrong_version),
        Err(StoreError::IncompatibleVersion { .. })
    ));

    assert_eq!(store.load_snapshot().unwrap(), before);
}

#[test]
fn backup_file_roundtrip_stamps_last_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("backup.json");

    let source = seeded_store();
    assert!(source.settings().unwrap().last_backup_timestamp.is_none());
    let bundle = source.backup_to_file(&path).unwrap();

    assert_eq!(
        source.settings().unwrap().last_backup_timestamp,
        bundle.backup_date
    );
    let leftovers = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);

    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["version"], BACKUP_FORMAT_VERSION);
    assert_eq!(value["clients"][0]["status"], "installed");
    assert_eq!(value["clients"][0]["dueDay"], "25");
    assert_eq!(value["installations"][0]["customerId"], 1);

    let mut target = DataStore::open_in_memory().unwrap();
    let summary = target.restore_from_file(&path).unwrap();
    assert_eq!(summary.customers, 3);
    assert_eq!(
        target.get_customer(1).unwrap().status,
        CustomerStatus::Installed
    );
}

#[test]
fn restore_from_missing_or_malformed_file_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = seeded_store();
    let before = store.load_snapshot().unwrap();

    let missing = store.restore_from_file(dir.path().join("absent.json"));
    assert!(matches!(missing, Err(StoreError::Io { .. })));

    let garbage = dir.path().join("garbage.json");
    std::fs::write(&garbage, "{ not json").unwrap();
    assert!(matches!(
        store.restore_from_file(&garbage),
        Err(StoreError::MalformedBackup(_))
    ));

    let partial = dir.path().join("partial.json");
    std::fs::write(&partial, r#"{"clients": [], "version": "fieldbook_v1"}"#).unwrap();
    assert!(matches!(
        store.restore_from_file(&partial),
        Err(StoreError::MalformedBackup(_))
    ));

    assert_eq!(store.load_snapshot().unwrap(), before);
}
