//! Password hashing
//!
//! bcrypt runs on the blocking pool so hashing never stalls the request
//! executor.

use kit::FrameworkError;

#[cfg(not(test))]
const COST: u32 = bcrypt::DEFAULT_COST;
// Minimum cost keeps the test suite fast.
#[cfg(test)]
const COST: u32 = 4;

pub async fn hash(plain: String) -> Result<String, FrameworkError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, COST))
        .await
        .map_err(|e| FrameworkError::internal(format!("hashing task failed: {}", e)))?
        .map_err(FrameworkError::from)
}

pub async fn verify(plain: String, hashed: String) -> Result<bool, FrameworkError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hashed))
        .await
        .map_err(|e| FrameworkError::internal(format!("hashing task failed: {}", e)))?
        .map_err(FrameworkError::from)
}
