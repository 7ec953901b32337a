//! Session store maintenance.
//!
//! Carts and thank-you first-access flags live in the session and expire
//! with it. Expired rows stay in the table until purged.
//!
//! ```bash
//! wagwell-cli sessions purge
//! ```

use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, storefront_pool};

/// Delete expired sessions.
pub async fn purge() -> Result<(), CommandError> {
    let pool = storefront_pool().await?;
    let store = PostgresStore::new(pool);

    tracing::info!("Deleting expired sessions...");
    store.delete_expired().await?;

    tracing::info!("Expired sessions deleted");
    Ok(())
}
