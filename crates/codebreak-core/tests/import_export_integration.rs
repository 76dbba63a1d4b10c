//! Export/import round-trips through the registry, including collision
//! renaming and the replace-all path.

use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use codebreak_core::{
    DirtyFlag, EventBus, ExportFormat, JsonProfileStore, Profile, ProfileRegistry, ProfileStore,
};

fn registry_with_store() -> (TempDir, Arc<dyn ProfileStore>, ProfileRegistry) {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn ProfileStore> = Arc::new(JsonProfileStore::at(dir.path()));
    let registry = ProfileRegistry::load(
        store.as_ref(),
        Arc::new(EventBus::new()),
        Arc::new(DirtyFlag::new()),
    );
    (dir, store, registry)
}

#[test]
fn roundtrip_renames_collisions_but_preserves_fields() {
    let (dir, store, mut registry) = registry_with_store();
    let exported: Vec<Profile> = registry.profiles().to_vec();

    for (format, file) in [(ExportFormat::Json, "profiles.json.bak"), (ExportFormat::Text, "profiles.txt")] {
        let path = dir.path().join(file);
        store.export_to_file(&exported, &path, format).unwrap();

        let before = registry.profiles().len();
        let report = registry.import_profiles(store.as_ref(), &path);
        assert!(report.success, "{}", report.message);
        assert_eq!(report.added, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(registry.profiles().len(), before + 3);

        // Every import got a fresh name but kept its field values.
        for original in &exported {
            let copy = registry
                .profiles()
                .iter()
                .filter(|p| p.name.starts_with(&original.name) && p.name != original.name)
                .last()
                .expect("renamed copy present");
            assert!(copy.fields_eq(original), "{} vs {}", copy.name, original.name);
        }
    }
}

#[test]
fn import_skips_duplicates_within_the_file() {
    let (dir, store, mut registry) = registry_with_store();

    let twice = vec![Profile::new("Repeated"), Profile::new("Repeated")];
    let path = dir.path().join("twice.json");
    store
        .export_to_file(&twice, &path, ExportFormat::Json)
        .unwrap();

    // Field validation does not reject repeated names; the second entry is
    // skipped once the first has claimed the name.
    let report = registry.import_profiles(store.as_ref(), &path);
    assert!(report.success, "{}", report.message);
    assert_eq!(report.added, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(registry.profiles().len(), 4);
}

#[test]
fn import_rejects_invalid_profiles_wholesale() {
    let (dir, store, mut registry) = registry_with_store();

    let mut bad = Profile::new("Broken");
    bad.work_minutes = 999;
    let path = dir.path().join("bad.json");
    store
        .export_to_file(&[Profile::new("Fine"), bad], &path, ExportFormat::Json)
        .unwrap();

    let report = registry.import_profiles(store.as_ref(), &path);
    assert!(!report.success);
    assert_eq!(report.added, 0);
    assert_eq!(registry.profiles().len(), 3);
}

#[test]
fn import_from_missing_file_reports_failure() {
    let (dir, store, mut registry) = registry_with_store();
    let report = registry.import_profiles(store.as_ref(), &dir.path().join("absent.json"));
    assert!(!report.success);
    assert!(report.message.contains("import failed"));
}

#[test]
fn replace_all_swaps_the_list_and_reselects() {
    let (dir, store, mut registry) = registry_with_store();

    let replacement = vec![Profile::new("Morning"), Profile::new("Evening")];
    let path = dir.path().join("replacement.json");
    store
        .export_to_file(&replacement, &path, ExportFormat::Json)
        .unwrap();

    let report = registry.replace_all_profiles(store.as_ref(), &path);
    assert!(report.success, "{}", report.message);
    assert_eq!(report.added, 2);
    assert_eq!(registry.profiles().len(), 2);
    assert_eq!(registry.current_profile().name, "Morning");
    assert_eq!(registry.settings().selected_profile, "Morning");
}

#[test]
fn replace_all_keeps_the_old_list_on_bad_input() {
    let (dir, store, mut registry) = registry_with_store();

    let path = dir.path().join("garbage.json");
    std::fs::write(&path, "** not a profile file **").unwrap();

    let report = registry.replace_all_profiles(store.as_ref(), &path);
    assert!(!report.success);
    assert_eq!(registry.profiles().len(), 3);
    assert_eq!(registry.current_profile().name, "Pomodoro");
}

#[test]
fn shared_registry_supports_concurrent_style_access() {
    // The registry is owned behind a mutex in the application; make sure the
    // public API composes that way.
    let (dir, store, registry) = registry_with_store();
    let registry = Arc::new(Mutex::new(registry));

    let path = dir.path().join("export.json");
    {
        let registry = registry.lock().unwrap();
        store
            .export_to_file(registry.profiles(), &path, ExportFormat::Json)
            .unwrap();
    }
    let report = registry
        .lock()
        .unwrap()
        .import_profiles(store.as_ref(), &path);
    assert!(report.success);
}
