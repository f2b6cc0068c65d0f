//! Common test utilities for pix-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_test::TestServer;
use chrono::Utc;

use pix_core::{Account, AccountKey, User, UserId};
use pix_queue::{MemoryQueue, SettlementQueue};
use pix_service::{create_router, AppState, ServiceConfig, SettlementConsumer};
use pix_store::{MemoryStore, Store};

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle to the store for seeding and assertions.
    pub store: Arc<MemoryStore>,
    /// Direct handle to the broker for settlement control.
    pub queue: Arc<MemoryQueue>,
}

impl TestHarness {
    /// Create a new harness over fresh in-memory collaborators.
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(MemoryQueue::new());
        Self::with_collaborators(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&queue) as Arc<dyn SettlementQueue>,
            store,
            queue,
        )
    }

    /// Create a harness whose service talks to the given collaborators while
    /// the test keeps direct handles to the in-memory ones.
    pub fn with_collaborators(
        service_store: Arc<dyn Store>,
        service_queue: Arc<dyn SettlementQueue>,
        store: Arc<MemoryStore>,
        queue: Arc<MemoryQueue>,
    ) -> Self {
        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            settlement_workers: 0,
            status_poll_interval_ms: 25,
        };

        let state = AppState::new(service_store, service_queue, config);
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            queue,
        }
    }

    /// Bearer header for a user id (identity verification is upstream).
    pub fn auth(user_id: UserId) -> String {
        format!("Bearer {user_id}")
    }

    /// Seed a user with the given bucket state.
    pub fn seed_user(&self, token_count: i64, consumed_hours_ago: i64) -> User {
        let mut user = User::new("Ana Souza".into(), "ana@example.com".into());
        user.bucket.token_count = token_count;
        user.bucket.last_consumed_at = Utc::now() - chrono::Duration::hours(consumed_hours_ago);
        self.store.put_user(&user).unwrap();
        user
    }

    /// Seed an account for a user.
    pub fn seed_account(&self, user_id: UserId, balance: i64) -> Account {
        let account = Account::new(user_id, balance);
        self.store.put_account(&account).unwrap();
        account
    }

    /// Seed a PIX key for an account.
    pub fn seed_key(&self, key: &str, account: &Account) -> AccountKey {
        let key = AccountKey::new(key.into(), account.id);
        self.store.put_account_key(&key).unwrap();
        key
    }

    /// Seed a user with a full bucket, an account, and a PIX key.
    pub fn seed_party(&self, key: &str, balance: i64) -> (User, Account) {
        let user = self.seed_user(10, 0);
        let account = self.seed_account(user.id, balance);
        self.seed_key(key, &account);
        (user, account)
    }

    /// A settlement consumer over the harness collaborators.
    pub fn consumer(&self) -> SettlementConsumer {
        SettlementConsumer::new(
            Arc::clone(&self.store) as Arc<dyn Store>,
            Arc::clone(&self.queue) as Arc<dyn SettlementQueue>,
        )
    }

    /// Drain and process one queued settlement job.
    pub async fn settle_next(&self) {
        let delivery = tokio::time::timeout(Duration::from_secs(1), self.queue.receive())
            .await
            .expect("timed out waiting for settlement job")
            .expect("queue receive failed")
            .expect("queue closed");
        self.consumer().handle(delivery);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
