use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{
    AccessToken, AuthError, AuthResult, Credential, CredentialSource, ServiceAccountExchange,
    TokenExchange,
};
use crate::config::ServerConfig;

/// A cached token is refreshed once it is within this many seconds of expiry.
pub const REFRESH_MARGIN_SECS: u64 = 60;

/// Source of wall-clock time in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

enum Strategy {
    Static(Credential),
    Exchange(Arc<dyn TokenExchange>),
    Unconfigured,
}

/// Process-wide credential accessor shared by all relay sessions.
///
/// Static credentials are returned directly. Exchanged tokens are cached and
/// reused while `now < expires_at - 60s`. Concurrent callers that find the
/// cache stale wait on a single refresh instead of each hitting the token
/// endpoint. A failed exchange leaves the cache untouched.
pub struct CredentialProvider {
    strategy: Strategy,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<AccessToken>>,
    refresh_lock: Mutex<()>,
}

impl CredentialProvider {
    /// Build the provider from server configuration.
    pub fn from_config(config: &ServerConfig) -> AuthResult<Self> {
        let source = CredentialSource::from_config(config)?;
        let strategy = match source {
            CredentialSource::StaticToken(token) => Strategy::Static(Credential::Bearer(token)),
            CredentialSource::ApiKey(key) => Strategy::Static(Credential::ApiKey(key)),
            CredentialSource::ServiceAccount(key) => {
                info!(
                    client_email = %key.client_email,
                    "Using service account token exchange for upstream credentials"
                );
                let token_url = key.token_endpoint(config.token_url.as_deref());
                Strategy::Exchange(Arc::new(ServiceAccountExchange::new(
                    key,
                    config.oauth_scope.clone(),
                    token_url,
                )?))
            }
            CredentialSource::Unconfigured => Strategy::Unconfigured,
        };

        Ok(Self::with_strategy(strategy, Arc::new(SystemClock)))
    }

    /// Provider that always returns the given credential.
    pub fn fixed(credential: Credential) -> Self {
        Self::with_strategy(Strategy::Static(credential), Arc::new(SystemClock))
    }

    /// Provider backed by a custom token exchange and clock.
    pub fn with_exchange(exchange: Arc<dyn TokenExchange>, clock: Arc<dyn Clock>) -> Self {
        Self::with_strategy(Strategy::Exchange(exchange), clock)
    }

    /// Provider with no credentials; every call fails with `MissingCredentials`.
    pub fn unconfigured() -> Self {
        Self::with_strategy(Strategy::Unconfigured, Arc::new(SystemClock))
    }

    fn with_strategy(strategy: Strategy, clock: Arc<dyn Clock>) -> Self {
        Self {
            strategy,
            clock,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Whether any credential source is configured.
    pub fn is_configured(&self) -> bool {
        !matches!(self.strategy, Strategy::Unconfigured)
    }

    /// Resolve a credential for a new upstream connection.
    pub async fn get_credential(&self) -> AuthResult<Credential> {
        let exchange = match &self.strategy {
            Strategy::Static(credential) => return Ok(credential.clone()),
            Strategy::Unconfigured => return Err(AuthError::MissingCredentials),
            Strategy::Exchange(exchange) => exchange,
        };

        if let Some(token) = self.cached_token(self.clock.now()) {
            return Ok(Credential::Bearer(token));
        }

        let _refresh = self.refresh_lock.lock().await;

        // Another session may have refreshed while we waited.
        let now = self.clock.now();
        if let Some(token) = self.cached_token(now) {
            return Ok(Credential::Bearer(token));
        }

        debug!("Cached upstream token missing or near expiry, refreshing");
        let fresh = exchange.exchange(now).await?;
        let token = fresh.token.clone();
        debug!(expires_at = fresh.expires_at, "Upstream token refreshed");
        *self.cache.write() = Some(fresh);

        Ok(Credential::Bearer(token))
    }

    fn cached_token(&self, now: u64) -> Option<String> {
        self.cache
            .read()
            .as_ref()
            .filter(|cached| now + REFRESH_MARGIN_SECS < cached.expires_at)
            .map(|cached| cached.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    struct FakeClock(AtomicU64);

    impl FakeClock {
        fn at(now: u64) -> Arc<Self> {
            Arc::new(Self(AtomicU64::new(now)))
        }

        fn advance(&self, secs: u64) {
            self.0.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct CountingExchange {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TokenExchange for CountingExchange {
        async fn exchange(&self, now: u64) -> AuthResult<AccessToken> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::task::yield_now().await;
            if self.fail {
                return Err(AuthError::TokenExchange("endpoint unavailable".to_string()));
            }
            Ok(AccessToken {
                token: format!("token-{call}"),
                expires_at: now + 3600,
            })
        }
    }

    #[tokio::test]
    async fn test_static_credentials_bypass_cache() {
        let provider = CredentialProvider::fixed(Credential::ApiKey("key".to_string()));
        assert_eq!(
            provider.get_credential().await.unwrap(),
            Credential::ApiKey("key".to_string())
        );
    }

    #[tokio::test]
    async fn test_unconfigured_fails_with_missing_credentials() {
        let provider = CredentialProvider::unconfigured();
        assert!(!provider.is_configured());
        assert!(matches!(
            provider.get_credential().await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn test_token_reused_within_validity_window() {
        let clock = FakeClock::at(1_000);
        let exchange = Arc::new(CountingExchange::default());
        let provider = CredentialProvider::with_exchange(exchange.clone(), clock.clone());

        let first = provider.get_credential().await.unwrap();
        clock.advance(3000);
        let second = provider.get_credential().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_token_refreshed_inside_safety_margin() {
        let clock = FakeClock::at(1_000);
        let exchange = Arc::new(CountingExchange::default());
        let provider = CredentialProvider::with_exchange(exchange.clone(), clock.clone());

        provider.get_credential().await.unwrap();
        // 3541s later the token has 59s left, inside the 60s margin.
        clock.advance(3541);
        let refreshed = provider.get_credential().await.unwrap();

        assert_eq!(refreshed, Credential::Bearer("token-2".to_string()));
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let clock = FakeClock::at(1_000);
        let exchange = Arc::new(CountingExchange::default());
        let provider = Arc::new(CredentialProvider::with_exchange(
            exchange.clone(),
            clock.clone(),
        ));

        let (a, b) = tokio::join!(provider.get_credential(), provider.get_credential());

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_exchange_leaves_cache_untouched() {
        let clock = FakeClock::at(1_000);
        let exchange = Arc::new(CountingExchange {
            fail: true,
            ..Default::default()
        });
        let provider = CredentialProvider::with_exchange(exchange.clone(), clock);

        assert!(matches!(
            provider.get_credential().await,
            Err(AuthError::TokenExchange(_))
        ));
        assert!(provider.cache.read().is_none());

        // The next caller tries again rather than seeing a poisoned cache.
        assert!(provider.get_credential().await.is_err());
        assert_eq!(exchange.calls.load(Ordering::SeqCst), 2);
    }
}
