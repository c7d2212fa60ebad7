//! Shared-secret check for administrative requests

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AdminConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct AdminService {
    password_hash: Option<String>,
    protect_status_toggle: bool,
}

impl AdminService {
    pub fn new(config: &AdminConfig) -> Self {
        if config.password_hash.as_deref().map_or(true, str::is_empty) {
            tracing::warn!("No admin password hash configured, capacity changes will be rejected");
        }
        Self {
            password_hash: config.password_hash.clone().filter(|h| !h.is_empty()),
            protect_status_toggle: config.protect_status_toggle,
        }
    }

    /// Verify the admin password against the configured Argon2 hash
    pub fn verify(&self, password: Option<&str>) -> AppResult<()> {
        let hash = self
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("Admin credential is not configured".to_string()))?;
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing admin password".to_string()))?;

        let parsed_hash = PasswordHash::new(hash)
            .map_err(|_| AppError::Internal("Invalid admin password hash".to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::Unauthorized("Invalid admin password".to_string()))
    }

    /// Open/close toggling only needs the credential when configured so
    pub fn verify_toggle(&self, password: Option<&str>) -> AppResult<()> {
        if self.protect_status_toggle {
            self.verify(password)
        } else {
            Ok(())
        }
    }
}

/// Hash a password using Argon2, producing a PHC string for `admin.password_hash`
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(password: Option<&str>, protect_status_toggle: bool) -> AdminService {
        AdminService::new(&AdminConfig {
            password_hash: password.map(|p| hash_password(p).unwrap()),
            protect_status_toggle,
        })
    }

    #[test]
    fn test_correct_password_accepted() {
        assert!(service(Some("s3cret"), false).verify(Some("s3cret")).is_ok());
    }

    #[test]
    fn test_wrong_or_missing_password_rejected() {
        let admin = service(Some("s3cret"), false);
        assert!(matches!(admin.verify(Some("guess")), Err(AppError::Unauthorized(_))));
        assert!(matches!(admin.verify(Some("")), Err(AppError::Unauthorized(_))));
        assert!(matches!(admin.verify(None), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_unconfigured_rejects_everything() {
        let admin = service(None, false);
        assert!(matches!(admin.verify(Some("anything")), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("same"));
    }

    #[test]
    fn test_toggle_protection_is_optional() {
        assert!(service(Some("s3cret"), false).verify_toggle(None).is_ok());
        let protected = service(Some("s3cret"), true);
        assert!(protected.verify_toggle(None).is_err());
        assert!(protected.verify_toggle(Some("s3cret")).is_ok());
    }
}
