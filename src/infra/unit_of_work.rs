//! Unit of Work pattern implementation.
//!
//! Centralizes repository access and runs multi-row writes (user + instance
//! assignment) inside one database transaction.

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, IsolationLevel,
    TransactionTrait,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::repositories::entities::user;
use super::repositories::{
    instance_queries, user_queries, InstanceRepository, InstanceStore, UserRepository, UserStore,
};
use crate::domain::{GpuInstance, NewUserRecord, User, UserChanges};
use crate::errors::{AppError, AppResult};

/// Boxed future returned by transaction closures.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because of the generic transaction method; tests
/// run it against an in-memory SQLite database instead.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Get user repository
    fn users(&self) -> Arc<dyn UserRepository>;

    /// Get instance registry repository
    fn instances(&self) -> Arc<dyn InstanceRepository>;

    /// Execute a closure within a transaction.
    ///
    /// Committed on `Ok`, rolled back on `Err`.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;

    /// Like `transaction`, with serializable isolation for check-then-write paths.
    async fn transaction_serializable<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send;
}

/// Repository access scoped to one open transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub fn users(&self) -> TxUserRepository<'_> {
        TxUserRepository { txn: self.txn }
    }

    pub fn instances(&self) -> TxInstanceRepository<'_> {
        TxInstanceRepository { txn: self.txn }
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    user_repo: Arc<UserStore>,
    instance_repo: Arc<InstanceStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        let user_repo = Arc::new(UserStore::new(db.clone()));
        let instance_repo = Arc::new(InstanceStore::new(db.clone()));
        Self {
            db,
            user_repo,
            instance_repo,
        }
    }

    async fn execute_transaction<F, T>(&self, isolation: Option<IsolationLevel>, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        // SQLite rejects explicit levels; its transactions are already serializable
        let txn = match (self.db.get_database_backend(), isolation) {
            (DbBackend::Sqlite, _) | (_, None) => self.db.begin().await,
            (_, level) => {
                self.db
                    .begin_with_config(level, Some(AccessMode::ReadWrite))
                    .await
            }
        }
        .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn instances(&self) -> Arc<dyn InstanceRepository> {
        self.instance_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        self.execute_transaction(None, f).await
    }

    async fn transaction_serializable<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> TxFuture<'a, T> + Send,
        T: Send,
    {
        self.execute_transaction(Some(IsolationLevel::Serializable), f)
            .await
    }
}

/// Transaction-aware user repository.
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxUserRepository<'a> {
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<User>> {
        user_queries::find_by_id(self.txn, id).await
    }

    /// Another user holding `username`, ignoring `except_id`.
    pub async fn find_by_username(
        &self,
        username: &str,
        except_id: Option<i32>,
    ) -> AppResult<Option<User>> {
        user_queries::find_by(self.txn, user::Column::Username, username, except_id).await
    }

    pub async fn find_by_email(&self, email: &str, except_id: Option<i32>) -> AppResult<Option<User>> {
        user_queries::find_by(self.txn, user::Column::Email, email, except_id).await
    }

    pub async fn find_by_phone(&self, phone: &str, except_id: Option<i32>) -> AppResult<Option<User>> {
        user_queries::find_by(self.txn, user::Column::Phone, phone, except_id).await
    }

    pub async fn count_owned_by(&self, admin_id: i32) -> AppResult<u64> {
        user_queries::count_owned_by(self.txn, admin_id).await
    }

    pub async fn insert(&self, record: NewUserRecord) -> AppResult<User> {
        user_queries::insert(self.txn, record).await
    }

    pub async fn apply(&self, id: i32, changes: UserChanges) -> AppResult<User> {
        user_queries::apply(self.txn, id, changes).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        user_queries::delete(self.txn, id).await
    }
}

/// Transaction-aware instance registry repository.
pub struct TxInstanceRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxInstanceRepository<'a> {
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<GpuInstance>> {
        instance_queries::find_by_id(self.txn, id).await
    }

    /// Assign the instance to `user_id` if it is still free.
    pub async fn claim(&self, id: i32, user_id: i32) -> AppResult<bool> {
        instance_queries::claim(self.txn, id, user_id).await
    }

    /// Clear the assignment held by `user_id`.
    pub async fn release_for_user(&self, user_id: i32) -> AppResult<u64> {
        instance_queries::release_for_user(self.txn, user_id).await
    }
}

/// Run a block inside `$uow.transaction`.
#[macro_export]
macro_rules! with_transaction {
    (serializable $uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction_serializable(|$ctx| Box::pin(async move { $body })).await
    };
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
