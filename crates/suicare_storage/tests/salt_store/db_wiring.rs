#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use suicare_kernel_contracts::{Salt, SaltRecord, SubjectId};
use suicare_storage::{JsonFileSaltStore, SaltStore, StorageError};

fn subject(id: &str) -> SubjectId {
    SubjectId::new(id).unwrap()
}

fn temp_db(name: &str) -> (PathBuf, PathBuf) {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(1);
    let base = std::env::temp_dir().join(format!("suicare-salt-db-{name}-{suffix}"));
    fs::create_dir_all(&base).unwrap();
    let path = base.join("salt_db.json");
    (base, path)
}

#[test]
fn at_salt_db_01_reference_layout_loads_unchanged() {
    let (base, path) = temp_db("reference");
    fs::write(
        &path,
        r#"{
  "104526873194827364519": "219375048162093847561029384756102938475",
  "user-abc123": "7"
}"#,
    )
    .unwrap();

    let store = JsonFileSaltStore::open(&path).unwrap();
    assert_eq!(store.record_count().unwrap(), 2);
    assert_eq!(
        store.read(&subject("user-abc123")).unwrap(),
        Some(Salt::new("7").unwrap())
    );
    fs::remove_dir_all(base).unwrap();
}

#[test]
fn at_salt_db_02_reopen_returns_persisted_salt() {
    let (base, path) = temp_db("reopen");
    let salt = Salt::from_u128(0x1234_5678_9abc_def0_1122_3344_5566_7788);
    {
        let store = JsonFileSaltStore::open(&path).unwrap();
        store
            .insert_if_absent(SaltRecord::new(subject("user-abc123"), salt.clone()))
            .unwrap();
    }

    let reopened = JsonFileSaltStore::open(&path).unwrap();
    assert_eq!(reopened.read(&subject("user-abc123")).unwrap(), Some(salt));

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(raw.is_object());
    assert_eq!(raw.as_object().unwrap().len(), 1);
    fs::remove_dir_all(base).unwrap();
}

#[test]
fn at_salt_db_03_existing_subject_is_never_overwritten() {
    let (base, path) = temp_db("immutable");
    let store = JsonFileSaltStore::open(&path).unwrap();
    let first = store
        .insert_if_absent(SaltRecord::new(subject("user-abc123"), Salt::from_u128(1)))
        .unwrap();
    let second = store
        .insert_if_absent(SaltRecord::new(subject("user-abc123"), Salt::from_u128(2)))
        .unwrap();
    assert_eq!(first, second);

    let reopened = JsonFileSaltStore::open(&path).unwrap();
    assert_eq!(
        reopened.read(&subject("user-abc123")).unwrap(),
        Some(Salt::from_u128(1))
    );
    fs::remove_dir_all(base).unwrap();
}

#[test]
fn at_salt_db_04_malformed_json_fails_closed() {
    let (base, path) = temp_db("malformed");
    fs::write(&path, "{ \"user-abc123\": ").unwrap();
    let err = JsonFileSaltStore::open(&path).expect_err("truncated json must fail");
    assert!(matches!(err, StorageError::Corrupt { .. }));
    fs::remove_dir_all(base).unwrap();
}

#[test]
fn at_salt_db_05_invalid_salt_entry_fails_closed() {
    let (base, path) = temp_db("bad-salt");
    fs::write(&path, r#"{ "user-abc123": "MOCK_SALT" }"#).unwrap();
    let err = JsonFileSaltStore::open(&path).expect_err("non-decimal salt must fail");
    assert!(err.to_string().contains("user-abc123"));
    fs::remove_dir_all(base).unwrap();
}

#[test]
fn at_salt_db_06_failed_write_leaves_no_record() {
    let (base, path) = temp_db("write-fail");
    let store = JsonFileSaltStore::open(&path).unwrap();
    // A directory squatting on the temp file name makes the write fail.
    let mut tmp = path.clone();
    tmp.set_extension("tmp");
    fs::create_dir_all(&tmp).unwrap();

    let err = store
        .insert_if_absent(SaltRecord::new(subject("user-abc123"), Salt::from_u128(3)))
        .expect_err("write must fail");
    assert!(matches!(err, StorageError::Io(_)));
    assert_eq!(store.read(&subject("user-abc123")).unwrap(), None);
    assert_eq!(store.record_count().unwrap(), 0);
    assert!(!path.exists());
    fs::remove_dir_all(base).unwrap();
}

#[test]
fn at_salt_db_07_concurrent_new_subjects_are_all_kept() {
    let (base, path) = temp_db("lost-update");
    let store = Arc::new(JsonFileSaltStore::open(&path).unwrap());
    let workers = 16;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store
                    .insert_if_absent(SaltRecord::new(
                        subject(&format!("user-{i}")),
                        Salt::from_u128(i as u128),
                    ))
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let reopened = JsonFileSaltStore::open(&path).unwrap();
    assert_eq!(reopened.record_count().unwrap(), workers);
    fs::remove_dir_all(base).unwrap();
}

#[test]
fn at_salt_db_08_concurrent_same_subject_keeps_one_salt() {
    let (base, path) = temp_db("same-subject");
    let store = Arc::new(JsonFileSaltStore::open(&path).unwrap());
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store
                    .insert_if_absent(SaltRecord::new(
                        subject("user-abc123"),
                        Salt::from_u128(1_000 + i as u128),
                    ))
                    .unwrap()
            })
        })
        .collect();
    let winners: Vec<Salt> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(winners.windows(2).all(|w| w[0] == w[1]));

    let reopened = JsonFileSaltStore::open(&path).unwrap();
    assert_eq!(reopened.record_count().unwrap(), 1);
    assert_eq!(
        reopened.read(&subject("user-abc123")).unwrap(),
        Some(winners[0].clone())
    );
    fs::remove_dir_all(base).unwrap();
}

#[cfg(unix)]
#[test]
fn at_salt_db_09_salt_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let (base, path) = temp_db("mode");
    let store = JsonFileSaltStore::open(&path).unwrap();
    store
        .insert_if_absent(SaltRecord::new(subject("user-abc123"), Salt::from_u128(5)))
        .unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);

    store
        .insert_if_absent(SaltRecord::new(subject("user-xyz789"), Salt::from_u128(6)))
        .unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    fs::remove_dir_all(base).unwrap();
}

#[test]
fn at_salt_db_10_unusual_subject_keys_load_verbatim() {
    let (base, path) = temp_db("legacy-keys");
    fs::write(&path, r#"{ " ": "5", " padded ": "6", "user-abc123": "7" }"#).unwrap();

    let store = JsonFileSaltStore::open(&path).unwrap();
    assert_eq!(store.record_count().unwrap(), 3);
    assert_eq!(
        store.read(&subject(" ")).unwrap(),
        Some(Salt::new("5").unwrap())
    );
    assert_eq!(
        store.read(&subject(" padded ")).unwrap(),
        Some(Salt::new("6").unwrap())
    );
    assert_eq!(store.read(&subject("padded")).unwrap(), None);
    fs::remove_dir_all(base).unwrap();
}
