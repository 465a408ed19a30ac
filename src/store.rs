//! Data provider behind every page: the embedded SQLite store or the hosted
//! backend, chosen by configuration.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use password_hash::SaltString;
use rand_core::OsRng;
use uuid::Uuid;

use crate::config::{AppConfig, BackendKind};
use crate::db::{self, DbPool};
use crate::error::AppError;
use crate::models::{
    AuthUser, Category, NewCategory, NewTransaction, Profile, Registration, Session, Transaction,
    TransactionEdit,
};
use crate::remote::{Filter, RemoteStore};

const MAX_SESSIONS: i64 = 5;
const MIN_PASSWORD_LEN: usize = 6;

pub enum Backend {
    Local(DbPool),
    Remote(RemoteStore),
}

impl Backend {
    pub fn connect(config: &AppConfig) -> Result<Self, AppError> {
        match config.backend {
            BackendKind::Local => {
                std::fs::create_dir_all(&config.data_dir)?;
                Ok(Backend::Local(db::init_db(&config.database_path())?))
            }
            BackendKind::Supabase => {
                let supabase = config
                    .supabase
                    .as_ref()
                    .ok_or_else(|| AppError::Config("missing [supabase] settings".into()))?;
                Ok(Backend::Remote(RemoteStore::new(supabase)?))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Local(_) => "local",
            Backend::Remote(_) => "supabase",
        }
    }

    // -----------------------------------------------------------------------
    // auth
    // -----------------------------------------------------------------------

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Registration, AppError> {
        let email = normalize_email(email)?;
        match self {
            Backend::Local(pool) => {
                if password.chars().count() < MIN_PASSWORD_LEN {
                    return Err(AppError::Auth(
                        "Password should be at least 6 characters".into(),
                    ));
                }
                let conn = pool.get()?;
                if db::email_taken(&conn, &email)? {
                    return Err(AppError::Auth("User already registered".into()));
                }
                let hash = hash_password(password)?;
                let id = db::insert_user(&conn, &email, &hash, &Utc::now().to_rfc3339())?;
                Ok(Registration {
                    user: AuthUser { id, email },
                    access_token: None,
                })
            }
            Backend::Remote(remote) => remote.sign_up(&email, password).await,
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = normalize_email(email)?;
        match self {
            Backend::Local(pool) => {
                let conn = pool.get()?;
                let Some((user, hash)) = db::user_credentials(&conn, &email)? else {
                    return Err(invalid_credentials());
                };
                if !verify_password(&hash, password) {
                    return Err(invalid_credentials());
                }
                let token = Uuid::new_v4().to_string();
                db::create_session(&conn, &user.id, &token, &Utc::now().to_rfc3339())?;
                db::prune_sessions(&conn, &user.id, MAX_SESSIONS)?;
                Ok(Session { token, user })
            }
            Backend::Remote(remote) => remote.sign_in(&email, password).await,
        }
    }

    pub async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        match self {
            Backend::Local(pool) => Ok(db::delete_session(&*pool.get()?, token)?),
            Backend::Remote(remote) => remote.sign_out(token).await,
        }
    }

    pub async fn current_user(&self, token: &str) -> Result<Option<AuthUser>, AppError> {
        match self {
            Backend::Local(pool) => Ok(db::user_by_session(&*pool.get()?, token)?),
            Backend::Remote(remote) => remote.current_user(token).await,
        }
    }

    // -----------------------------------------------------------------------
    // profiles
    // -----------------------------------------------------------------------

    /// `token` is absent right after a sign-up that still awaits email
    /// confirmation; the hosted insert then runs with the anon key.
    pub async fn insert_profile(&self, token: Option<&str>, profile: &Profile) -> Result<(), AppError> {
        match self {
            Backend::Local(pool) => Ok(db::insert_profile(&*pool.get()?, profile)?),
            Backend::Remote(remote) => {
                remote
                    .insert::<_, Profile>("profiles", token, profile)
                    .await?;
                Ok(())
            }
        }
    }

    pub async fn profile(&self, session: &Session) -> Result<Option<Profile>, AppError> {
        match self {
            Backend::Local(pool) => Ok(db::profile_by_id(&*pool.get()?, &session.user.id)?),
            Backend::Remote(remote) => {
                let rows: Vec<Profile> = remote
                    .select(
                        "profiles",
                        &session.token,
                        &[Filter::eq("id", session.user.id.as_str())],
                        None,
                    )
                    .await?;
                Ok(rows.into_iter().next())
            }
        }
    }

    // -----------------------------------------------------------------------
    // transactions
    // -----------------------------------------------------------------------

    pub async fn list_transactions(&self, session: &Session) -> Result<Vec<Transaction>, AppError> {
        match self {
            Backend::Local(pool) => Ok(db::list_transactions(&*pool.get()?, &session.user.id)?),
            Backend::Remote(remote) => {
                remote
                    .select(
                        "transactions",
                        &session.token,
                        &[owner(session)],
                        Some("date.desc"),
                    )
                    .await
            }
        }
    }

    pub async fn insert_transaction(
        &self,
        session: &Session,
        tx: &NewTransaction,
    ) -> Result<(), AppError> {
        match self {
            Backend::Local(pool) => {
                db::insert_transaction(&*pool.get()?, tx, &Utc::now().to_rfc3339())?;
                Ok(())
            }
            Backend::Remote(remote) => {
                remote
                    .insert::<_, Transaction>("transactions", Some(&session.token), tx)
                    .await?;
                Ok(())
            }
        }
    }

    pub async fn update_transaction(
        &self,
        session: &Session,
        id: &str,
        edit: &TransactionEdit,
    ) -> Result<(), AppError> {
        match self {
            Backend::Local(pool) => {
                db::update_transaction(&*pool.get()?, id, &session.user.id, edit)?;
                Ok(())
            }
            Backend::Remote(remote) => {
                remote
                    .update("transactions", &session.token, &by_id(session, id), edit)
                    .await
            }
        }
    }

    pub async fn delete_transaction(&self, session: &Session, id: &str) -> Result<(), AppError> {
        match self {
            Backend::Local(pool) => {
                db::delete_transaction(&*pool.get()?, id, &session.user.id)?;
                Ok(())
            }
            Backend::Remote(remote) => {
                remote
                    .delete("transactions", &session.token, &by_id(session, id))
                    .await
            }
        }
    }

    // -----------------------------------------------------------------------
    // categories
    // -----------------------------------------------------------------------

    pub async fn list_categories(&self, session: &Session) -> Result<Vec<Category>, AppError> {
        match self {
            Backend::Local(pool) => Ok(db::list_categories(&*pool.get()?, &session.user.id)?),
            Backend::Remote(remote) => {
                remote
                    .select("categories", &session.token, &[owner(session)], Some("name.asc"))
                    .await
            }
        }
    }

    pub async fn insert_category(&self, session: &Session, category: &NewCategory) -> Result<(), AppError> {
        match self {
            Backend::Local(pool) => {
                db::insert_category(&*pool.get()?, category)?;
                Ok(())
            }
            Backend::Remote(remote) => {
                remote
                    .insert::<_, Category>("categories", Some(&session.token), category)
                    .await?;
                Ok(())
            }
        }
    }

    pub async fn rename_category(&self, session: &Session, id: &str, name: &str) -> Result<(), AppError> {
        match self {
            Backend::Local(pool) => {
                db::rename_category(&*pool.get()?, id, &session.user.id, name)?;
                Ok(())
            }
            Backend::Remote(remote) => {
                remote
                    .update(
                        "categories",
                        &session.token,
                        &by_id(session, id),
                        &serde_json::json!({ "name": name }),
                    )
                    .await
            }
        }
    }

    pub async fn delete_category(&self, session: &Session, id: &str) -> Result<(), AppError> {
        match self {
            Backend::Local(pool) => {
                db::delete_category(&*pool.get()?, id, &session.user.id)?;
                Ok(())
            }
            Backend::Remote(remote) => {
                remote
                    .delete("categories", &session.token, &by_id(session, id))
                    .await
            }
        }
    }
}

fn owner(session: &Session) -> Filter {
    Filter::eq("user_id", session.user.id.as_str())
}

fn by_id(session: &Session, id: &str) -> [Filter; 2] {
    [Filter::eq("id", id), owner(session)]
}

fn invalid_credentials() -> AppError {
    AppError::Auth("Invalid login credentials".into())
}

pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let normalized = email.trim().to_lowercase();
    let mut parts = normalized.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => Ok(normalized),
        _ => Err(AppError::Auth("Email tidak valid".into())),
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AppError::PasswordHash)?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
