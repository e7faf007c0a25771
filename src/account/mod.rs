/// 사용자 계정
/// 1. 프로필 생성 (회원가입)
/// 2. 로그인
// region:    --- Imports
use crate::storage::{self, KeyValueStore, StorageError};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
// endregion: --- Imports

const USERNAMES_KEY: &str = "Usernames";

const PASSWORD_SPECIALS: &str = "@$!%*?&";

fn profile_key(username: &str) -> String {
    format!("user_{}", username)
}

fn password_key(username: &str) -> String {
    format!("password_{}", username)
}

// region:    --- Account Error
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("password and confirmation do not match")]
    PasswordMismatch,
    #[error("password must be at least 8 characters and include an uppercase letter, a lowercase letter, a number and one of @$!%*?&")]
    WeakPassword,
    #[error("username already taken: {0}")]
    UsernameTaken(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
// endregion: --- Account Error

// region:    --- Models
/// 회원가입 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub full_name: String,
    pub address: String,
    pub id_number: String,
    pub mobile_number: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub secondary_contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub full_name: String,
    pub address: String,
    pub id_number: String,
    pub mobile_number: String,
    pub email: Option<String>,
    pub secondary_contact: Option<String>,
}

/// 로그인 결과. 로그인 상태는 이 값으로만 전달된다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
}
// endregion: --- Models

/// 8자 이상, 영문 대/소문자, 숫자, 특수문자(@$!%*?&) 각 1개 이상, 그 외 문자 불가
pub fn is_strong_password(password: &str) -> bool {
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    allowed
        && password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

fn required(field: &'static str, value: &str) -> Result<String, AccountError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AccountError::MissingField(field));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn hash_password(password: String) -> Result<String, AccountError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AccountError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| AccountError::PasswordHash(e.to_string()))?
}

async fn verify_password(password: String, stored_hash: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || -> Result<bool, AccountError> {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| AccountError::PasswordHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AccountError::PasswordHash(e.to_string()))?
}

// region:    --- Account Registry
pub struct AccountRegistry {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    async fn usernames(&self) -> Result<Vec<String>, StorageError> {
        Ok(storage::get_json(self.store.as_ref(), USERNAMES_KEY)
            .await?
            .unwrap_or_default())
    }

    /// 1. 프로필 생성
    pub async fn register(&self, new_profile: NewProfile) -> Result<UserProfile, AccountError> {
        let profile = UserProfile {
            full_name: required("full_name", &new_profile.full_name)?,
            address: required("address", &new_profile.address)?,
            id_number: required("id_number", &new_profile.id_number)?,
            mobile_number: required("mobile_number", &new_profile.mobile_number)?,
            username: required("username", &new_profile.username)?,
            email: optional(new_profile.email),
            secondary_contact: optional(new_profile.secondary_contact),
        };
        if new_profile.password.is_empty() {
            return Err(AccountError::MissingField("password"));
        }
        if new_profile.password != new_profile.confirm_password {
            return Err(AccountError::PasswordMismatch);
        }
        if !is_strong_password(&new_profile.password) {
            return Err(AccountError::WeakPassword);
        }

        let _guard = self.write_lock.lock().await;
        let mut usernames = self.usernames().await?;
        if usernames.contains(&profile.username) {
            warn!("{:<12} --> 이미 존재하는 사용자: {}", "Account", profile.username);
            return Err(AccountError::UsernameTaken(profile.username));
        }

        let password_hash = hash_password(new_profile.password).await?;
        usernames.push(profile.username.clone());

        let profile_key = profile_key(&profile.username);
        self.store
            .set_many(&[
                (
                    profile_key.clone(),
                    storage::to_json(&profile_key, &profile)?,
                ),
                (password_key(&profile.username), password_hash),
                (
                    USERNAMES_KEY.to_string(),
                    storage::to_json(USERNAMES_KEY, &usernames)?,
                ),
            ])
            .await?;

        info!("{:<12} --> 계정 생성: {}", "Account", profile.username);
        Ok(profile)
    }

    /// 2. 로그인 (존재하지 않는 사용자와 잘못된 비밀번호는 같은 오류)
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AccountError> {
        let username = username.trim();
        let Some(stored_hash) = self.store.get(&password_key(username)).await? else {
            warn!("{:<12} --> 로그인 실패: {}", "Account", username);
            return Err(AccountError::InvalidCredentials);
        };

        if !verify_password(password.to_string(), stored_hash).await? {
            warn!("{:<12} --> 로그인 실패: {}", "Account", username);
            return Err(AccountError::InvalidCredentials);
        }

        info!("{:<12} --> 로그인 성공: {}", "Account", username);
        Ok(Session {
            username: username.to_string(),
        })
    }

    pub async fn profile(&self, username: &str) -> Result<Option<UserProfile>, AccountError> {
        Ok(storage::get_json(self.store.as_ref(), &profile_key(username)).await?)
    }

    /// 가입된 사용자인지 확인 (프로필 역직렬화 없이)
    pub async fn is_registered(&self, username: &str) -> Result<bool, StorageError> {
        Ok(self.store.get(&profile_key(username)).await?.is_some())
    }
}
// endregion: --- Account Registry

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn new_profile(username: &str, password: &str) -> NewProfile {
        NewProfile {
            username: username.to_string(),
            password: password.to_string(),
            confirm_password: password.to_string(),
            full_name: "Jane Smith".to_string(),
            address: "123 Main St, Cityville".to_string(),
            id_number: "ID-998".to_string(),
            mobile_number: "0771234567".to_string(),
            email: Some("  ".to_string()),
            secondary_contact: None,
        }
    }

    #[test]
    fn test_password_policy() {
        assert!(is_strong_password("Secret1!"));
        assert!(is_strong_password("aB3$aB3$aB3$"));
        assert!(!is_strong_password("Secr1!"));
        assert!(!is_strong_password("secret12!"));
        assert!(!is_strong_password("SECRET12!"));
        assert!(!is_strong_password("Secret!!"));
        assert!(!is_strong_password("Secret12"));
        assert!(!is_strong_password("Secret 1!"));
        assert!(!is_strong_password("Secret1#"));
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let registry = AccountRegistry::new(Arc::clone(&store));

        let profile = registry
            .register(new_profile("jane", "Secret1!"))
            .await
            .unwrap();
        assert_eq!(profile.email, None);
        assert_eq!(registry.profile("jane").await.unwrap(), Some(profile));
        assert!(registry.is_registered("jane").await.unwrap());
        assert!(!registry.is_registered("ghost").await.unwrap());

        let stored_hash = store.get("password_jane").await.unwrap().unwrap();
        assert_ne!(stored_hash, "Secret1!");

        let session = registry.login("jane", "Secret1!").await.unwrap();
        assert_eq!(session.username, "jane");

        assert!(matches!(
            registry.login("jane", "Wrong1!!").await,
            Err(AccountError::InvalidCredentials)
        ));
        assert!(matches!(
            registry.login("nobody", "Secret1!").await,
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let registry = AccountRegistry::new(Arc::new(MemoryStore::new()));
        registry
            .register(new_profile("jane", "Secret1!"))
            .await
            .unwrap();
        assert!(matches!(
            registry.register(new_profile("jane", "Other2@x")).await,
            Err(AccountError::UsernameTaken(name)) if name == "jane"
        ));
    }

    #[tokio::test]
    async fn test_invalid_forms_rejected() {
        let registry = AccountRegistry::new(Arc::new(MemoryStore::new()));

        let mut form = new_profile("jane", "Secret1!");
        form.address = " ".to_string();
        assert!(matches!(
            registry.register(form).await,
            Err(AccountError::MissingField("address"))
        ));

        let mut form = new_profile("jane", "Secret1!");
        form.confirm_password = "Secret2!".to_string();
        assert!(matches!(
            registry.register(form).await,
            Err(AccountError::PasswordMismatch)
        ));

        assert!(matches!(
            registry.register(new_profile("jane", "weakpass")).await,
            Err(AccountError::WeakPassword)
        ));
        assert_eq!(registry.profile("jane").await.unwrap(), None);
    }
}
// endregion: --- Tests
