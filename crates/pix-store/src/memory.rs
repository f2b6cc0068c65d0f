//! In-memory storage backend.
//!
//! A single `RwLock` over the whole dataset gives every write the atomicity
//! the [`Store`](crate::Store) contract demands: token consumption and
//! settlement each run inside one writer section, so concurrent settlements
//! draining the same sender serialize and the second one fails its balance
//! re-check instead of overdrawing.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use pix_core::{
    Account, AccountId, AccountKey, Transaction, TransactionId, TransactionStatus, User, UserId,
};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    accounts: HashMap<AccountId, Account>,
    keys: HashMap<String, AccountKey>,
    transactions: HashMap<TransactionId, Transaction>,
}

/// In-memory [`Store`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for MemoryStore {
    fn put_user(&self, user: &User) -> Result<()> {
        self.write()?.users.insert(user.id, user.clone());
        Ok(())
    }

    fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    fn consume_token(&self, id: &UserId, now: DateTime<Utc>) -> Result<User> {
        let mut inner = self.write()?;
        let user = inner.users.get_mut(id).ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: id.to_string(),
        })?;
        user.bucket = user.bucket.consume(now);
        Ok(user.clone())
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        self.write()?.accounts.insert(account.id, account.clone());
        Ok(())
    }

    fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        Ok(self.read()?.accounts.get(id).cloned())
    }

    fn get_account_by_user(&self, user_id: &UserId) -> Result<Option<Account>> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|a| a.user_id == *user_id && a.is_active())
            .cloned())
    }

    fn soft_delete_account(&self, id: &AccountId, now: DateTime<Utc>) -> Result<()> {
        let mut inner = self.write()?;
        let account = inner
            .accounts
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "account",
                id: id.to_string(),
            })?;
        account.deleted_at = Some(now);
        Ok(())
    }

    fn put_account_key(&self, key: &AccountKey) -> Result<()> {
        let mut inner = self.write()?;
        if inner.keys.get(&key.key).is_some_and(AccountKey::is_active) {
            return Err(StoreError::DuplicateKey {
                key: key.key.clone(),
            });
        }
        inner.keys.insert(key.key.clone(), key.clone());
        Ok(())
    }

    fn get_account_key(&self, key: &str) -> Result<Option<AccountKey>> {
        Ok(self
            .read()?
            .keys
            .get(key)
            .filter(|k| k.is_active())
            .cloned())
    }

    fn list_account_keys_by_user(&self, user_id: &UserId) -> Result<Vec<AccountKey>> {
        let inner = self.read()?;
        let account_ids: Vec<AccountId> = inner
            .accounts
            .values()
            .filter(|a| a.user_id == *user_id && a.is_active())
            .map(|a| a.id)
            .collect();
        let mut keys: Vec<AccountKey> = inner
            .keys
            .values()
            .filter(|k| k.is_active() && account_ids.contains(&k.account_id))
            .cloned()
            .collect();
        keys.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(keys)
    }

    fn put_transaction(&self, transaction: &Transaction) -> Result<()> {
        self.write()?
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>> {
        Ok(self.read()?.transactions.get(id).cloned())
    }

    fn list_transactions_by_account(
        &self,
        account_id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let inner = self.read()?;
        let mut txs: Vec<Transaction> = inner
            .transactions
            .values()
            .filter(|t| t.sender_account_id == *account_id || t.receiver_account_id == *account_id)
            .cloned()
            .collect();
        // ULIDs sort chronologically; newest first.
        txs.sort_by(|a, b| b.id.to_string().cmp(&a.id.to_string()));
        Ok(txs.into_iter().skip(offset).take(limit).collect())
    }

    fn commit_settlement(&self, transaction_id: &TransactionId) -> Result<Transaction> {
        let mut inner = self.write()?;

        let tx = inner
            .transactions
            .get(transaction_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "transaction",
                id: transaction_id.to_string(),
            })?
            .clone();

        if tx.status != TransactionStatus::Pending {
            return Err(StoreError::NotPending {
                id: transaction_id.to_string(),
            });
        }

        let sender = inner
            .accounts
            .get(&tx.sender_account_id)
            .filter(|a| a.is_active())
            .ok_or_else(|| StoreError::NotFound {
                entity: "account",
                id: tx.sender_account_id.to_string(),
            })?;

        if !sender.has_sufficient_balance(tx.amount) {
            return Err(StoreError::InsufficientFunds {
                balance: sender.balance,
                required: tx.amount,
            });
        }

        if !inner
            .accounts
            .get(&tx.receiver_account_id)
            .is_some_and(Account::is_active)
        {
            return Err(StoreError::NotFound {
                entity: "account",
                id: tx.receiver_account_id.to_string(),
            });
        }

        // All checks passed under the writer lock; apply the three mutations.
        if let Some(sender) = inner.accounts.get_mut(&tx.sender_account_id) {
            sender.balance -= tx.amount;
        }
        if let Some(receiver) = inner.accounts.get_mut(&tx.receiver_account_id) {
            receiver.balance += tx.amount;
        }
        let tx = inner
            .transactions
            .get_mut(transaction_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "transaction",
                id: transaction_id.to_string(),
            })?;
        tx.status = TransactionStatus::Approved;
        Ok(tx.clone())
    }

    fn reject_transaction(&self, id: &TransactionId) -> Result<Transaction> {
        let mut inner = self.write()?;
        let tx = inner
            .transactions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "transaction",
                id: id.to_string(),
            })?;
        if tx.status == TransactionStatus::Pending {
            tx.status = TransactionStatus::Rejected;
        } else {
            tracing::debug!(
                transaction_id = %id,
                status = ?tx.status,
                "reject skipped, transaction already terminal"
            );
        }
        Ok(tx.clone())
    }
}
