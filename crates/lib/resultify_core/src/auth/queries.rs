//! Auth-related database queries.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use super::resolver::PrincipalStore;
use super::revocation::{RevocationInsert, RevocationStore};
use crate::models::auth::{Admin, NewAdmin, NewUser, RevokedTokenRecord, User, UserProfileUpdate};

const USER_COLUMNS: &str = "uid, email, password_hash, first_name, last_name, phone_number, \
     exam_centre_no, exam_id, role, is_verified, is_paid, created_at, updated_at";

const ADMIN_COLUMNS: &str = "uid, email, password_hash, first_name, last_name, phone_number, \
     role, is_verified, created_at, updated_at";

/// PostgreSQL-backed principal and revocation store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl PrincipalStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 LIMIT 1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, AuthError> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE email = $1");
        let admin = sqlx::query_as::<_, Admin>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(admin)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, AuthError> {
        let sql = format!(
            "INSERT INTO users (uid, email, password_hash, first_name, last_name, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.role)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, AuthError> {
        let sql = format!(
            "INSERT INTO admins (uid, email, password_hash, first_name, last_name, phone_number, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ADMIN_COLUMNS}"
        );
        sqlx::query_as::<_, Admin>(&sql)
            .bind(Uuid::new_v4())
            .bind(&admin.email)
            .bind(&admin.password_hash)
            .bind(&admin.first_name)
            .bind(&admin.last_name)
            .bind(&admin.phone_number)
            .bind(&admin.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AuthError::AdminAlreadyExists
                } else {
                    AuthError::Db(e)
                }
            })
    }

    async fn mark_user_verified(&self, uid: Uuid) -> Result<Option<User>, AuthError> {
        let sql = format!(
            "UPDATE users SET is_verified = TRUE, updated_at = now() \
             WHERE uid = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn mark_user_paid(&self, uid: Uuid) -> Result<Option<User>, AuthError> {
        let sql = format!(
            "UPDATE users SET is_paid = TRUE, updated_at = now() \
             WHERE uid = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user_profile(
        &self,
        uid: Uuid,
        update: &UserProfileUpdate,
    ) -> Result<Option<User>, AuthError> {
        // COALESCE keeps the stored value for fields the update leaves out.
        let sql = format!(
            "UPDATE users SET \
               first_name = COALESCE($2, first_name), \
               last_name = COALESCE($3, last_name), \
               phone_number = COALESCE($4, phone_number), \
               updated_at = now() \
             WHERE uid = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(uid)
            .bind(update.first_name.as_deref())
            .bind(update.last_name.as_deref())
            .bind(update.phone_number.as_deref())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn delete_user(&self, uid: Uuid) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM users WHERE uid = $1")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RevocationStore for PgStore {
    async fn find_revoked_by_jti(
        &self,
        jti: &str,
    ) -> Result<Option<RevokedTokenRecord>, AuthError> {
        let record = sqlx::query_as::<_, RevokedTokenRecord>(
            "SELECT record_id, jti FROM revoked_tokens WHERE jti = $1",
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn insert_revoked_token(&self, jti: &str) -> Result<RevocationInsert, AuthError> {
        let inserted = sqlx::query_as::<_, RevokedTokenRecord>(
            "INSERT INTO revoked_tokens (record_id, jti) VALUES ($1, $2) RETURNING record_id, jti",
        )
        .bind(Uuid::now_v7())
        .bind(jti)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(record) => Ok(RevocationInsert::Inserted(record)),
            Err(e) if is_unique_violation(&e) => Ok(RevocationInsert::AlreadyRevoked),
            Err(e) => Err(AuthError::Db(e)),
        }
    }
}
