use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::{check_response, Result};
use crate::types::{AppIdentity, Credential};

#[cfg(feature = "metrics")]
fn metric_inc(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn metric_inc(_name: &'static str) {}

/// Credential lifecycle contract.
///
/// Implementations own the credential of exactly one application identity.
/// The in-memory implementation is [`MemoryCredentialManager`]; a store shared
/// between processes plugs in behind this same trait.
#[async_trait]
pub trait CredentialManager: Send + Sync {
    /// Return the current credential, issuing one only when none is cached.
    async fn acquire(&self) -> Result<Credential>;

    /// Discard any cached credential and issue a fresh one.
    async fn force_refresh(&self) -> Result<Credential>;
}

/// Retry-once-after-refresh protocol, available on every manager.
pub trait CredentialManagerExt: CredentialManager {
    /// Run `operation` with the current credential.
    ///
    /// If it fails with [`Error::CredentialExpired`](crate::Error::CredentialExpired),
    /// the credential is force refreshed and `operation` runs exactly once
    /// more. Any other failure, or a second expiry, is returned unchanged.
    fn run_with_credential<'a, T, F, Fut>(
        &'a self,
        mut operation: F,
    ) -> impl Future<Output = Result<T>> + Send + 'a
    where
        T: Send + 'a,
        F: FnMut(Credential) -> Fut + Send + 'a,
        Fut: Future<Output = Result<T>> + Send + 'a,
    {
        async move {
            let credential = self.acquire().await?;
            match operation(credential).await {
                Err(err) if err.is_credential_expired() => {
                    tracing::warn!(error = %err, "credential rejected, retrying once");
                    metric_inc("weixin.credential.retry");
                    let credential = self.force_refresh().await?;
                    operation(credential).await
                }
                other => other,
            }
        }
    }
}

impl<M: CredentialManager + ?Sized> CredentialManagerExt for M {}

/// Performs the platform's credential-issuing call.
///
/// Issuing a credential silently invalidates every credential previously
/// issued for the same identity, anywhere. Only a credential manager should
/// call this.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self) -> Result<Credential>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    #[serde(default)]
    expires_in: u64,
}

/// Issues credentials from the platform token endpoint.
pub struct PlatformIssuer {
    http: reqwest::Client,
    token_url: String,
    identity: AppIdentity,
}

impl PlatformIssuer {
    pub fn new(http: reqwest::Client, api_base: &str, identity: AppIdentity) -> Self {
        Self {
            http,
            token_url: format!("{}/cgi-bin/token", api_base.trim_end_matches('/')),
            identity,
        }
    }
}

#[async_trait]
impl CredentialIssuer for PlatformIssuer {
    async fn issue(&self) -> Result<Credential> {
        let body: serde_json::Value = self
            .http
            .get(&self.token_url)
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", self.identity.app_id.as_str()),
                ("secret", self.identity.app_secret.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        let response: TokenResponse = serde_json::from_value(check_response(body)?)?;
        tracing::debug!(app_id = %self.identity.app_id, "issued access token");
        Ok(Credential::new(response.access_token))
    }
}

/// Process-local credential manager.
///
/// The credential is empty until the first [`acquire`](CredentialManager::acquire),
/// cleared by [`force_refresh`](CredentialManager::force_refresh) and
/// repopulated lazily.
///
/// The cache lock is never held across the issuing call: concurrent first
/// acquisitions may each issue a credential. Every caller still receives a
/// credential that was valid when issued, and the retry protocol absorbs the
/// ones superseded in the meantime.
///
/// Only correct within a single process. Two managers for the same identity
/// keep invalidating each other's credential.
pub struct MemoryCredentialManager {
    issuer: Arc<dyn CredentialIssuer>,
    cached: RwLock<Option<Credential>>,
}

impl MemoryCredentialManager {
    pub fn new(issuer: Arc<dyn CredentialIssuer>) -> Self {
        Self {
            issuer,
            cached: RwLock::new(None),
        }
    }

    /// Currently cached credential, without issuing.
    pub async fn cached(&self) -> Option<Credential> {
        self.cached.read().await.clone()
    }

    async fn issue_and_cache(&self) -> Result<Credential> {
        let credential = self.issuer.issue().await?;
        metric_inc("weixin.credential.issued");
        *self.cached.write().await = Some(credential.clone());
        Ok(credential)
    }

    /// Proactively refresh the credential every `period`.
    ///
    /// Best effort: failures are logged and the next tick tries again. The
    /// task holds a weak reference and ends once the manager is dropped, or
    /// when the returned handle is stopped or dropped.
    ///
    /// Fails with [`Error::Runtime`](crate::Error::Runtime) when called outside a tokio runtime.
    pub fn spawn_auto_refresh(self: &Arc<Self>, period: Duration) -> Result<AutoRefresh> {
        let runtime = Handle::try_current()?;
        let manager: Weak<Self> = Arc::downgrade(self);
        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else { break };
                match manager.force_refresh().await {
                    Ok(_) => tracing::debug!("background credential refresh succeeded"),
                    Err(err) => {
                        tracing::warn!(error = %err, "background credential refresh failed")
                    }
                }
            }
        });

        Ok(AutoRefresh {
            handle: Some(handle),
        })
    }
}

#[async_trait]
impl CredentialManager for MemoryCredentialManager {
    async fn acquire(&self) -> Result<Credential> {
        let cached = self.cached.read().await.clone();
        match cached {
            Some(credential) => Ok(credential),
            None => self.issue_and_cache().await,
        }
    }

    async fn force_refresh(&self) -> Result<Credential> {
        tracing::info!("forcing credential refresh");
        self.cached.write().await.take();
        self.issue_and_cache().await
    }
}

/// Handle to a background refresh task. Dropping it stops the task.
pub struct AutoRefresh {
    handle: Option<JoinHandle<()>>,
}

impl AutoRefresh {
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

