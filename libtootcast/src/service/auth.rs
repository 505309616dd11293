//! Authorization bootstrap run once at session start

use std::sync::Arc;

use tracing::{debug, warn};

use crate::remote::Authorizer;
use crate::store::{keys, KeyValueStore, KeyValueStoreExt};
use crate::types::AccountIdentity;

/// Makes sure a credential is in place and resolves the account identity
///
/// Failures never block composition: they are logged and the identity comes
/// back empty, which leaves the "Account" display blank.
pub struct AuthBootstrap {
    authorizer: Arc<dyn Authorizer>,
    store: Arc<dyn KeyValueStore>,
}

impl AuthBootstrap {
    pub fn new(authorizer: Arc<dyn Authorizer>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { authorizer, store }
    }

    pub async fn ensure_ready(&self) -> AccountIdentity {
        match self.authorizer.authorize().await {
            Ok(Some(identity)) => {
                debug!("Authorized as {}", identity.fqn());
                if let Err(e) = self.store.set_json(keys::ACCOUNT_FQN, &identity.fqn()) {
                    warn!("Failed to store account identity: {}", e);
                }
            }
            Ok(None) => debug!("Authorized, account identity not resolved"),
            Err(e) => warn!("Authorization failed, continuing without it: {}", e),
        }

        self.stored_identity()
    }

    /// Identity persisted by a previous authorization
    fn stored_identity(&self) -> AccountIdentity {
        match self.store.get_json::<String>(keys::ACCOUNT_FQN) {
            Ok(Some(fqn)) => AccountIdentity::parse_fqn(&fqn).unwrap_or_else(|| {
                warn!("Ignoring malformed stored account identity '{}'", fqn);
                AccountIdentity::default()
            }),
            Ok(None) => AccountIdentity::default(),
            Err(e) => {
                warn!("Failed to read stored account identity: {}", e);
                AccountIdentity::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockAuthorizer;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_resolved_identity_is_stored_and_returned() {
        let store = Arc::new(MemoryStore::new());
        let authorizer = MockAuthorizer::resolving("alice", "akkoma.example");
        let bootstrap = AuthBootstrap::new(Arc::new(authorizer.clone()), store.clone());

        let identity = bootstrap.ensure_ready().await;

        assert_eq!(identity.fqn(), "alice@akkoma.example");
        assert_eq!(authorizer.call_count(), 1);
        assert_eq!(
            store.get_json::<String>(keys::ACCOUNT_FQN).unwrap().as_deref(),
            Some("alice@akkoma.example")
        );
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_stored_identity() {
        let store = Arc::new(MemoryStore::new());
        store.set_json(keys::ACCOUNT_FQN, "bob@mastodon.example").unwrap();
        let bootstrap =
            AuthBootstrap::new(Arc::new(MockAuthorizer::failing("offline")), store);

        let identity = bootstrap.ensure_ready().await;
        assert_eq!(identity, AccountIdentity::new("bob", "mastodon.example"));
    }

    #[tokio::test]
    async fn test_no_identity_anywhere_is_empty_not_an_error() {
        let bootstrap = AuthBootstrap::new(
            Arc::new(MockAuthorizer::failing("offline")),
            Arc::new(MemoryStore::new()),
        );

        let identity = bootstrap.ensure_ready().await;
        assert!(identity.is_empty());
        assert_eq!(identity.fqn(), "");
    }

    #[tokio::test]
    async fn test_malformed_stored_identity_is_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set_json(keys::ACCOUNT_FQN, "no-at-sign").unwrap();
        let bootstrap = AuthBootstrap::new(Arc::new(MockAuthorizer::silent()), store);

        assert!(bootstrap.ensure_ready().await.is_empty());
    }
}
