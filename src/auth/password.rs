use crate::errors::AppError;

/// Work factor for new hashes.
pub const BCRYPT_COST: u32 = 10;

/// Hashes on the blocking pool so request workers are not stalled.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| AppError::InternalError(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {}", e)))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::InternalError(format!("Password check task failed: {}", e)))?
        .map_err(|e| AppError::InternalError(format!("Failed to verify password: {}", e)))
}
