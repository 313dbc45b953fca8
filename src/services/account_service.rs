use crate::error::{AppError, Result};
use crate::models::{Account, AccountKind, Currency};
use crate::repositories::AccountRepository;
use sqlx::PgPool;
use uuid::Uuid;

/// Thin account surface for the HTTP facade and seeding. Accounts are
/// created once and never mutated.
pub struct AccountService {
    account_repo: AccountRepository,
}

impl AccountService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            account_repo: AccountRepository::new(pool),
        }
    }

    pub async fn create_account(
        &self,
        account_kind: AccountKind,
        currency: Currency,
    ) -> Result<Account> {
        let account = Account::new(account_kind, currency);
        let created = self.account_repo.create(&account).await?;

        tracing::info!(
            account_id = %created.id,
            kind = ?created.account_kind,
            currency = %created.currency,
            "account created"
        );
        Ok(created)
    }

    pub async fn get_account(&self, id: Uuid) -> Result<Account> {
        self.account_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::AccountNotFound(id))
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        self.account_repo.exists(id).await
    }
}
