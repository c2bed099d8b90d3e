//! User repository.

use super::{store_error, with_retry};
use async_trait::async_trait;
use greek_study_core::{StoreError, UserId};
use greek_study_platform_access::{IdpProfile, User, UserStore};
use rootcause::prelude::Report;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: i64,
    idp_id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    nickname: Option<String>,
    name: Option<String>,
    picture: Option<String>,
    email: Option<String>,
    email_verified: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User::with_all_fields(
            UserId::new(row.id),
            row.idp_id,
            row.first_name,
            row.last_name,
            row.nickname,
            row.name,
            row.picture,
            row.email,
            row.email_verified,
        )
    }
}

/// Repository for user records.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Creates a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    /// A single `INSERT .. ON CONFLICT (idp_id) DO UPDATE` statement, so
    /// concurrent first logins for one subject end with one row and the
    /// same id.
    #[instrument(skip(self, profile), fields(subject = %profile.subject))]
    async fn upsert_from_profile(&self, profile: &IdpProfile) -> Result<UserId, Report<StoreError>> {
        let pool = &self.pool;
        let id: i64 = with_retry("upsert_user", move || {
            sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO users
                    (idp_id, first_name, last_name, nickname, name, picture, email, email_verified)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (idp_id) DO UPDATE SET
                    first_name = EXCLUDED.first_name,
                    last_name = EXCLUDED.last_name,
                    nickname = EXCLUDED.nickname,
                    name = EXCLUDED.name,
                    picture = EXCLUDED.picture,
                    email = EXCLUDED.email,
                    email_verified = EXCLUDED.email_verified,
                    updated_at = NOW()
                RETURNING id
                "#,
            )
            .bind(&profile.subject)
            .bind(&profile.given_name)
            .bind(&profile.family_name)
            .bind(&profile.nickname)
            .bind(&profile.name)
            .bind(&profile.picture)
            .bind(&profile.email)
            .bind(profile.email_verified)
            .fetch_one(pool)
        })
        .await
        .map_err(store_error)?;

        Ok(UserId::new(id))
    }

    #[instrument(skip(self))]
    async fn find_id_by_subject(&self, subject: &str) -> Result<Option<UserId>, Report<StoreError>> {
        let pool = &self.pool;
        let id: Option<i64> = with_retry("find_user_id", move || {
            sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE idp_id = $1")
                .bind(subject)
                .fetch_optional(pool)
        })
        .await
        .map_err(store_error)?;

        Ok(id.map(UserId::new))
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, Report<StoreError>> {
        let pool = &self.pool;
        let row: Option<UserRow> = with_retry("find_user", move || {
            sqlx::query_as::<_, UserRow>(
                r#"
                SELECT id, idp_id, first_name, last_name, nickname, name, picture,
                       email, email_verified
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id.get())
            .fetch_optional(pool)
        })
        .await
        .map_err(store_error)?;

        Ok(row.map(User::from))
    }
}
