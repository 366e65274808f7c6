//! In-memory principal and revocation stores.
//!
//! Used by tests and local runs without PostgreSQL. Mirrors the constraints
//! of the SQL schema: unique admin email, unique jti.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::AuthError;
use super::resolver::PrincipalStore;
use super::revocation::{RevocationInsert, RevocationStore};
use crate::models::auth::{Admin, NewAdmin, NewUser, RevokedTokenRecord, User, UserProfileUpdate};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    admins: DashMap<Uuid, Admin>,
    admin_emails: DashMap<String, Uuid>,
    revoked: DashMap<String, RevokedTokenRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }

    fn update_user<F>(&self, uid: Uuid, f: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        self.users.get_mut(&uid).map(|mut user| {
            f(&mut user);
            user.updated_at = Utc::now();
            user.clone()
        })
    }
}

#[async_trait]
impl PrincipalStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.value().clone()))
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, AuthError> {
        let Some(uid) = self.admin_emails.get(email).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.admins.get(&uid).map(|a| a.value().clone()))
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, AuthError> {
        let now = Utc::now();
        let user = User {
            uid: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            phone_number: None,
            exam_centre_no: None,
            exam_id: None,
            role: new.role,
            is_verified: false,
            is_paid: false,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.uid, user.clone());
        Ok(user)
    }

    async fn insert_admin(&self, new: NewAdmin) -> Result<Admin, AuthError> {
        // Claim the email first; the admin row is only written by the winner.
        let uid = Uuid::new_v4();
        match self.admin_emails.entry(new.email.clone()) {
            Entry::Occupied(_) => return Err(AuthError::AdminAlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(uid);
            }
        }
        let now = Utc::now();
        let admin = Admin {
            uid,
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            phone_number: new.phone_number,
            role: new.role,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        self.admins.insert(admin.uid, admin.clone());
        Ok(admin)
    }

    async fn mark_user_verified(&self, uid: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.update_user(uid, |u| u.is_verified = true))
    }

    async fn mark_user_paid(&self, uid: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.update_user(uid, |u| u.is_paid = true))
    }

    async fn update_user_profile(
        &self,
        uid: Uuid,
        update: &UserProfileUpdate,
    ) -> Result<Option<User>, AuthError> {
        Ok(self.update_user(uid, |u| update.apply_to(u)))
    }

    async fn delete_user(&self, uid: Uuid) -> Result<bool, AuthError> {
        Ok(self.users.remove(&uid).is_some())
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn find_revoked_by_jti(
        &self,
        jti: &str,
    ) -> Result<Option<RevokedTokenRecord>, AuthError> {
        Ok(self.revoked.get(jti).map(|r| r.value().clone()))
    }

    async fn insert_revoked_token(&self, jti: &str) -> Result<RevocationInsert, AuthError> {
        match self.revoked.entry(jti.to_string()) {
            Entry::Occupied(_) => Ok(RevocationInsert::AlreadyRevoked),
            Entry::Vacant(slot) => {
                let record = RevokedTokenRecord {
                    record_id: Uuid::now_v7(),
                    jti: jti.to_string(),
                };
                slot.insert(record.clone());
                Ok(RevocationInsert::Inserted(record))
            }
        }
    }
}
