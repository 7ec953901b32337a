//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! wagwell-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Storefront migrations live in `crates/storefront/migrations/`. The
//! storefront keeps no tables of its own; the migrations create the
//! session store backing the cart.

use super::{CommandError, storefront_pool};

/// Run storefront database migrations.
pub async fn storefront() -> Result<(), CommandError> {
    let pool = storefront_pool().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
