use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;
use tokio::sync::oneshot;

use super::*;
use crate::directory::StaticDirectory;
use crate::storage::MemoryStorage;

// =============================================================================
// Test doubles
// =============================================================================

fn staff() -> StaticDirectory {
    StaticDirectory::new(vec![
        json!({ "id": 1, "nombre": "ana", "contraseña": "1234", "rol": "administrador" }),
        json!({ "id": 2, "nombre": "beto", "contraseña": "abcd", "rol": "mesero" }),
        json!({ "id": 3, "nombre": "chema", "contraseña": "wok", "rol": "chef" }),
    ])
}

/// Storage that counts writes so tests can assert "exactly one write".
#[derive(Default)]
struct CountingStorage {
    inner: MemoryStorage,
    sets: AtomicUsize,
}

impl DurableStorage for CountingStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

struct ReadOnlyStorage;

impl DurableStorage for ReadOnlyStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only")))
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

struct DownDirectory;

#[async_trait::async_trait]
impl UserDirectory for DownDirectory {
    async fn find_user(&self, _identifier: &str, _secret: &str) -> Result<Option<User>, DirectoryError> {
        Err(DirectoryError::Api { status: 503, message: "service unavailable".into() })
    }
}

/// Directory whose lookups block until the test releases them.
struct GatedDirectory {
    inner: StaticDirectory,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    started: Mutex<Vec<String>>,
}

impl GatedDirectory {
    fn new() -> Self {
        Self { inner: staff(), gates: Mutex::new(HashMap::new()), started: Mutex::new(Vec::new()) }
    }

    fn gate(&self, identifier: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(identifier.to_owned(), rx);
        tx
    }

    fn has_started(&self, identifier: &str) -> bool {
        self.started.lock().unwrap().iter().any(|s| s == identifier)
    }
}

#[async_trait::async_trait]
impl UserDirectory for GatedDirectory {
    async fn find_user(&self, identifier: &str, secret: &str) -> Result<Option<User>, DirectoryError> {
        let gate = self.gates.lock().unwrap().remove(identifier);
        self.started.lock().unwrap().push(identifier.to_owned());
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.inner.find_user(identifier, secret).await
    }
}

fn store_with(storage: Arc<dyn DurableStorage>) -> SessionStore {
    SessionStore::new(Arc::new(staff()), storage)
}

fn assert_auth_invariant(store: &SessionStore) {
    let session = store.snapshot();
    assert_eq!(session.is_authenticated(), session.user.is_some());
    assert_eq!(session.role().is_some(), session.user.is_some());
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    while !done() {
        tokio::task::yield_now().await;
    }
}

// =============================================================================
// initial state
// =============================================================================

#[test]
fn new_store_is_logged_out() {
    let store = store_with(Arc::new(MemoryStorage::new()));
    assert_eq!(store.snapshot(), Session::default());
    assert!(!store.is_authenticated());
    assert!(store.role().is_none());
    assert_auth_invariant(&store);
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn login_success_sets_user_persists_and_returns_role() {
    let storage = Arc::new(CountingStorage::default());
    let store = store_with(storage.clone());

    let role = store.login("beto", "abcd").await.unwrap();

    assert_eq!(role, "mesero");
    let user = store.user().unwrap();
    assert_eq!(user.name, "beto");
    assert_eq!(store.role().as_deref(), Some("mesero"));
    assert!(store.last_error().is_none());
    assert!(!store.is_loading());
    assert_eq!(storage.sets.load(Ordering::SeqCst), 1);

    let raw = storage.get(SESSION_STORAGE_KEY).unwrap().unwrap();
    let persisted: User = serde_json::from_str(&raw).unwrap();
    assert_eq!(persisted, user);
    assert!(!raw.contains("contraseña"));
    assert_auth_invariant(&store);
}

#[tokio::test]
async fn login_invalid_credentials_keeps_user_and_records_message() {
    let storage = Arc::new(CountingStorage::default());
    let store = store_with(storage.clone());
    store.login("ana", "1234").await.unwrap();

    let err = store.login("ana", "wrong").await.unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredentials));
    assert_eq!(err.to_string(), INVALID_CREDENTIALS_MESSAGE);
    assert_eq!(store.last_error().as_deref(), Some(INVALID_CREDENTIALS_MESSAGE));
    assert_eq!(store.user().unwrap().name, "ana");
    assert!(!store.is_loading());
    assert_eq!(storage.sets.load(Ordering::SeqCst), 1);
    assert_auth_invariant(&store);
}

#[tokio::test]
async fn unknown_user_and_wrong_secret_fail_identically() {
    let store = store_with(Arc::new(MemoryStorage::new()));
    let unknown = store.login("nadie", "1234").await.unwrap_err();
    let wrong = store.login("ana", "nope").await.unwrap_err();
    assert_eq!(unknown.to_string(), wrong.to_string());
}

#[tokio::test]
async fn login_backend_failure_passes_message_through() {
    let store = SessionStore::new(Arc::new(DownDirectory), Arc::new(MemoryStorage::new()));

    let err = store.login("ana", "1234").await.unwrap_err();

    assert!(matches!(err, AuthError::Backend(DirectoryError::Api { status: 503, .. })));
    assert_eq!(store.last_error().as_deref(), Some("service unavailable"));
    assert!(!store.is_loading());
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn login_storage_failure_does_not_authenticate() {
    let store = store_with(Arc::new(ReadOnlyStorage));

    let err = store.login("ana", "1234").await.unwrap_err();

    assert!(matches!(err, AuthError::Storage(_)));
    assert!(store.last_error().unwrap().starts_with("session storage failed"));
    assert!(!store.is_authenticated());
    assert_auth_invariant(&store);
}

#[tokio::test]
async fn new_attempt_clears_previous_error() {
    let store = store_with(Arc::new(MemoryStorage::new()));
    store.login("ana", "bad").await.unwrap_err();
    assert!(store.last_error().is_some());

    store.login("ana", "1234").await.unwrap();
    assert!(store.last_error().is_none());
}

#[tokio::test]
async fn loading_is_true_only_while_in_flight() {
    let directory = Arc::new(GatedDirectory::new());
    let release = directory.gate("chema");
    let store = Arc::new(SessionStore::new(directory.clone(), Arc::new(MemoryStorage::new())));

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.login("chema", "wok").await }
    });
    wait_until(|| directory.has_started("chema")).await;
    assert!(store.is_loading());
    assert!(store.last_error().is_none());

    release.send(()).unwrap();
    assert_eq!(task.await.unwrap().unwrap(), "chef");
    assert!(!store.is_loading());
}

// =============================================================================
// overlapping logins
// =============================================================================

#[tokio::test]
async fn login_result_from_superseded_attempt_is_not_applied() {
    let directory = Arc::new(GatedDirectory::new());
    let release_ana = directory.gate("ana");
    let release_beto = directory.gate("beto");
    let storage = Arc::new(MemoryStorage::new());
    let store = Arc::new(SessionStore::new(directory.clone(), storage.clone()));

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.login("ana", "1234").await }
    });
    wait_until(|| directory.has_started("ana")).await;
    let second = tokio::spawn({
        let store = store.clone();
        async move { store.login("beto", "abcd").await }
    });
    wait_until(|| directory.has_started("beto")).await;

    release_beto.send(()).unwrap();
    assert_eq!(second.await.unwrap().unwrap(), "mesero");
    release_ana.send(()).unwrap();
    // The caller still learns its own outcome.
    assert_eq!(first.await.unwrap().unwrap(), "administrador");

    assert_eq!(store.user().unwrap().name, "beto");
    let raw = storage.get(SESSION_STORAGE_KEY).unwrap().unwrap();
    assert!(raw.contains("beto"));
    assert!(!store.is_loading());
}

#[tokio::test]
async fn logout_supersedes_in_flight_login() {
    let directory = Arc::new(GatedDirectory::new());
    let release = directory.gate("ana");
    let storage = Arc::new(MemoryStorage::new());
    let store = Arc::new(SessionStore::new(directory.clone(), storage.clone()));

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.login("ana", "1234").await }
    });
    wait_until(|| directory.has_started("ana")).await;
    store.logout().unwrap();
    assert!(!store.is_loading());

    release.send(()).unwrap();
    task.await.unwrap().unwrap();
    assert!(!store.is_authenticated());
    assert!(storage.is_empty());
}

// =============================================================================
// logout
// =============================================================================

#[tokio::test]
async fn logout_clears_user_and_storage() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_with(storage.clone());
    store.login("ana", "1234").await.unwrap();

    store.logout().unwrap();

    assert!(store.user().is_none());
    assert!(storage.get(SESSION_STORAGE_KEY).unwrap().is_none());
    assert_auth_invariant(&store);
}

#[test]
fn logout_is_idempotent() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_with(storage.clone());
    store.logout().unwrap();
    let once = store.snapshot();
    store.logout().unwrap();
    assert_eq!(store.snapshot(), once);
    assert!(storage.is_empty());
}

// =============================================================================
// check_auth
// =============================================================================

#[test]
fn check_auth_restores_persisted_chef() {
    let storage = Arc::new(MemoryStorage::new());
    storage
        .set(SESSION_STORAGE_KEY, r#"{"id":3,"nombre":"chema","rol":"chef"}"#)
        .unwrap();
    let store = store_with(storage);
    assert!(store.user().is_none());

    store.check_auth().unwrap();

    assert_eq!(store.role().as_deref(), Some("chef"));
    assert_eq!(store.user().unwrap().name, "chema");
    assert_auth_invariant(&store);
}

#[tokio::test]
async fn check_auth_overwrites_in_memory_user() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_with(storage.clone());
    store.login("ana", "1234").await.unwrap();
    storage
        .set(SESSION_STORAGE_KEY, r#"{"nombre":"beto","rol":"mesero"}"#)
        .unwrap();

    store.check_auth().unwrap();

    assert_eq!(store.role().as_deref(), Some("mesero"));
}

#[tokio::test]
async fn check_auth_without_record_leaves_user_untouched() {
    let storage = Arc::new(MemoryStorage::new());
    let store = store_with(storage.clone());
    store.login("ana", "1234").await.unwrap();
    storage.remove(SESSION_STORAGE_KEY).unwrap();

    store.check_auth().unwrap();

    assert_eq!(store.user().unwrap().name, "ana");
}

#[test]
fn check_auth_corrupt_record_is_typed_error() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set(SESSION_STORAGE_KEY, "{not json").unwrap();
    let store = store_with(storage);

    let err = store.check_auth().unwrap_err();

    assert!(matches!(err, AuthError::CorruptSession(_)));
    assert!(!store.is_authenticated());
}

#[test]
fn check_auth_record_without_role_is_corrupt() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set(SESSION_STORAGE_KEY, r#"{"nombre":"x"}"#).unwrap();
    let store = store_with(storage);
    assert!(matches!(store.check_auth(), Err(AuthError::CorruptSession(_))));
}

#[tokio::test]
async fn session_survives_store_restart_via_storage() {
    let storage = Arc::new(MemoryStorage::new());
    store_with(storage.clone()).login("chema", "wok").await.unwrap();

    let restarted = store_with(storage);
    assert!(!restarted.is_authenticated());
    restarted.check_auth().unwrap();
    assert_eq!(restarted.role().as_deref(), Some("chef"));
}

#[tokio::test]
async fn damaged_storage_file_does_not_block_login_or_logout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local-storage.json");
    std::fs::write(&path, "garbage").unwrap();
    let store = store_with(Arc::new(crate::storage::FileStorage::new(&path)));

    assert_eq!(store.login("ana", "1234").await.unwrap(), "administrador");
    store.logout().unwrap();
    assert!(!store.is_authenticated());
    assert_auth_invariant(&store);

    std::fs::write(&path, "garbage").unwrap();
    store.logout().unwrap();
    assert_eq!(store.login("beto", "abcd").await.unwrap(), "mesero");
    assert!(store.is_authenticated());
}
