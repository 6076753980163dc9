use anyhow::anyhow;
use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, AppResult};

const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";
const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash with bcrypt on the blocking pool; bcrypt is deliberately slow.
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash(password.as_bytes(), DEFAULT_COST))
        .await
        .map_err(|e| AppError::InternalServerError(anyhow!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::InternalServerError(anyhow!("Error hashing password: {}", e)))
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: String, password_hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify(password.as_bytes(), &password_hash).unwrap_or(false))
        .await
        .map_err(|e| {
            AppError::InternalServerError(anyhow!("Password verification task failed: {}", e))
        })
}

/// At least eight characters with an upper-case letter, a lower-case letter,
/// a digit and one of `!@#$%^&*()_+-=[]{}|;:,.<>?`.
pub fn check_password_strength(password: &str) -> AppResult<()> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push("at least 8 characters");
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        problems.push("an uppercase letter");
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        problems.push("a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("a digit");
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        problems.push("a special character");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(anyhow!(
            "password: must contain {}",
            problems.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_passes() {
        assert!(check_password_strength("Secur3P@ss").is_ok());
    }

    #[test]
    fn each_missing_class_is_reported() {
        let err = check_password_strength("short").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("at least 8 characters"));
        assert!(message.contains("an uppercase letter"));
        assert!(message.contains("a digit"));
        assert!(message.contains("a special character"));
        assert!(!message.contains("a lowercase letter"));

        assert!(check_password_strength("NoDigits!!").is_err());
        assert!(check_password_strength("nouppercase1!").is_err());
        assert!(check_password_strength("NoSpecial123").is_err());
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hashed = hash_password("Secur3P@ss".to_string()).await.unwrap();
        assert!(verify_password("Secur3P@ss".to_string(), hashed.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong".to_string(), hashed).await.unwrap());
    }

    #[tokio::test]
    async fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything".to_string(), "not-a-hash".to_string())
            .await
            .unwrap());
    }
}
