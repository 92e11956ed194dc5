use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use weixin_sdk::{
    check_response, Client, ClientConfig, Credential, CredentialIssuer, CredentialManager,
    CredentialManagerExt, Error, Lang, MemoryCredentialManager, Result,
};

/// Issues `token-1`, `token-2`, ... and counts calls.
#[derive(Default)]
struct FakeIssuer {
    issued: AtomicUsize,
    failing: AtomicBool,
}

impl FakeIssuer {
    fn failing() -> Self {
        let issuer = Self::default();
        issuer.failing.store(true, Ordering::SeqCst);
        issuer
    }

    fn count(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialIssuer for FakeIssuer {
    async fn issue(&self) -> Result<Credential> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Api {
                code: 45009,
                message: "reach max api daily quota limit".to_string(),
            });
        }
        Ok(Credential::new(format!("token-{n}")))
    }
}

/// Wraps a manager and counts forced refreshes.
struct CountingManager {
    inner: MemoryCredentialManager,
    refreshes: AtomicUsize,
}

impl CountingManager {
    fn new(issuer: Arc<FakeIssuer>) -> Self {
        Self {
            inner: MemoryCredentialManager::new(issuer),
            refreshes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CredentialManager for CountingManager {
    async fn acquire(&self) -> Result<Credential> {
        self.inner.acquire().await
    }

    async fn force_refresh(&self) -> Result<Credential> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.inner.force_refresh().await
    }
}

fn expired() -> Error {
    Error::CredentialExpired {
        code: 40001,
        message: "invalid credential".to_string(),
    }
}

#[tokio::test]
async fn test_acquire_reuses_cached_credential() {
    let issuer = Arc::new(FakeIssuer::default());
    let manager = MemoryCredentialManager::new(issuer.clone());

    assert!(manager.cached().await.is_none());

    let first = manager.acquire().await.unwrap();
    let second = manager.acquire().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.as_str(), "token-1");
    assert_eq!(issuer.count(), 1);
}

#[tokio::test]
async fn test_force_refresh_replaces_credential() {
    let issuer = Arc::new(FakeIssuer::default());
    let manager = MemoryCredentialManager::new(issuer.clone());

    manager.acquire().await.unwrap();
    let refreshed = manager.force_refresh().await.unwrap();

    assert_eq!(refreshed.as_str(), "token-2");
    assert_eq!(manager.acquire().await.unwrap(), refreshed);
    assert_eq!(issuer.count(), 2);
}

#[tokio::test]
async fn test_failed_refresh_leaves_cache_empty() {
    let issuer = Arc::new(FakeIssuer::default());
    let manager = MemoryCredentialManager::new(issuer.clone());

    manager.acquire().await.unwrap();
    issuer.failing.store(true, Ordering::SeqCst);

    assert!(manager.force_refresh().await.is_err());
    assert!(manager.cached().await.is_none());

    // Acquisition is retried lazily by the next caller, not internally.
    issuer.failing.store(false, Ordering::SeqCst);
    assert_eq!(manager.acquire().await.unwrap().as_str(), "token-3");
}

#[tokio::test]
async fn test_retry_once_after_expiry() {
    let issuer = Arc::new(FakeIssuer::default());
    let manager = CountingManager::new(issuer.clone());
    let calls = AtomicUsize::new(0);

    let result = manager
        .run_with_credential(|credential| {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(expired())
                } else {
                    Ok(credential.as_str().to_string())
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(result, "token-2");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(manager.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_persistent_expiry_is_retried_exactly_once() {
    let issuer = Arc::new(FakeIssuer::default());
    let manager = CountingManager::new(issuer.clone());
    let calls = AtomicUsize::new(0);

    let result: Result<()> = manager
        .run_with_credential(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(expired()) }
        })
        .await;

    assert!(matches!(result, Err(Error::CredentialExpired { code: 40001, .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(manager.refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(issuer.count(), 2);
}

#[tokio::test]
async fn test_other_failures_are_not_retried() {
    let issuer = Arc::new(FakeIssuer::default());
    let manager = CountingManager::new(issuer.clone());
    let calls = AtomicUsize::new(0);

    let result: Result<()> = manager
        .run_with_credential(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(Error::UserUnsubscribed {
                    message: "require subscribe".to_string(),
                })
            }
        })
        .await;

    assert!(matches!(result, Err(Error::UserUnsubscribed { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(manager.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_acquisition_failure_skips_operation() {
    let issuer = Arc::new(FakeIssuer::failing());
    let manager = MemoryCredentialManager::new(issuer.clone());
    let calls = AtomicUsize::new(0);

    let result: Result<()> = manager
        .run_with_credential(|_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .await;

    assert!(matches!(result, Err(Error::Api { code: 45009, .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(issuer.count(), 1);
}

#[tokio::test]
async fn test_run_with_credential_through_trait_object() {
    let issuer = Arc::new(FakeIssuer::default());
    let manager: Arc<dyn CredentialManager> = Arc::new(MemoryCredentialManager::new(issuer));

    let token = manager
        .run_with_credential(|credential| async move { Ok(credential) })
        .await
        .unwrap();

    assert_eq!(token.as_str(), "token-1");
}

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_replaces_credential_each_period() {
    let issuer = Arc::new(FakeIssuer::default());
    let manager = Arc::new(MemoryCredentialManager::new(issuer.clone()));
    let _refresh = manager.spawn_auto_refresh(Duration::from_secs(60)).unwrap();

    manager.acquire().await.unwrap();
    assert_eq!(issuer.count(), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(issuer.count(), 2);
    assert_eq!(manager.cached().await.unwrap().as_str(), "token-2");

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(issuer.count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_survives_failures() {
    let issuer = Arc::new(FakeIssuer::failing());
    let manager = Arc::new(MemoryCredentialManager::new(issuer.clone()));
    let refresh = manager.spawn_auto_refresh(Duration::from_secs(60)).unwrap();

    tokio::time::sleep(Duration::from_secs(125)).await;

    assert_eq!(issuer.count(), 2);
    assert!(refresh.is_running());
    refresh.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_auto_refresh_stops_when_handle_dropped() {
    let issuer = Arc::new(FakeIssuer::default());
    let manager = Arc::new(MemoryCredentialManager::new(issuer.clone()));
    let refresh = manager.spawn_auto_refresh(Duration::from_secs(60)).unwrap();

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(issuer.count(), 1);

    drop(refresh);
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(issuer.count(), 1);
}

#[test]
fn test_check_response_classification() {
    assert!(check_response(json!({"access_token": "abc"})).is_ok());
    assert!(check_response(json!({"errcode": 0, "errmsg": "ok"})).is_ok());

    for code in [40001, 40014, 42001] {
        let err = check_response(json!({"errcode": code, "errmsg": "expired"})).unwrap_err();
        assert!(err.is_credential_expired(), "code {code} should be expiry");
    }

    let err =
        check_response(json!({"errcode": 43004, "errmsg": "require subscribe"})).unwrap_err();
    assert!(
        matches!(err, Error::UserUnsubscribed { ref message } if message == "require subscribe")
    );

    let err = check_response(json!({"errcode": 40013, "errmsg": "invalid appid"})).unwrap_err();
    match err {
        Error::Api { code, message } => {
            assert_eq!(code, 40013);
            assert_eq!(message, "invalid appid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_credential_debug_is_redacted() {
    let credential = Credential::new("very-secret-token");
    assert!(!format!("{credential:?}").contains("very-secret-token"));
}

#[tokio::test]
async fn test_client_surfaces_acquisition_failure() {
    let issuer = Arc::new(FakeIssuer::failing());
    let manager: Arc<dyn CredentialManager> =
        Arc::new(MemoryCredentialManager::new(issuer.clone()));
    let config = ClientConfig::new("wx123", "secret").with_api_base("http://127.0.0.1:9");
    let client = Client::with_credential_manager(config, reqwest::Client::new(), manager);

    let result = client.user_info("openid-1", Lang::ZhCn).await;

    assert!(matches!(result, Err(Error::Api { code: 45009, .. })));
    assert_eq!(issuer.count(), 1);
    assert!(!client.is_auto_refreshing());
}

#[test]
fn test_user_info_tolerates_sparse_profile() {
    let info: weixin_sdk::UserInfo = serde_json::from_value(json!({
        "subscribe": 1,
        "openid": "openid-1",
        "subscribe_scene": "ADD_SCENE_QR_CODE",
        "qr_scene": 98765
    }))
    .unwrap();

    assert!(info.is_subscribed());
    assert_eq!(info.qr_scene, 98765);
    assert_eq!(info.unionid, None);
    assert!(info.tagid_list.is_empty());
    assert_eq!(Lang::default().as_str(), "en");
}

#[test]
fn test_auto_refresh_without_runtime_is_an_error() {
    let issuer = Arc::new(FakeIssuer::default());
    let manager = Arc::new(MemoryCredentialManager::new(issuer.clone()));

    let result = manager.spawn_auto_refresh(Duration::from_secs(60));

    assert!(matches!(result, Err(Error::Runtime(_))));
    assert_eq!(issuer.count(), 0);
}

#[test]
fn test_client_with_auto_refresh_outside_runtime_is_an_error() {
    let config = ClientConfig::new("wx123", "secret").with_auto_refresh(Duration::from_secs(60));

    let result = Client::new(config);

    assert!(matches!(result, Err(Error::Runtime(_))));
}
