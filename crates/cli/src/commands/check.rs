//! Backend connectivity check.

use tracing::{error, info};

use super::{CliError, Context};

/// Tables the site reads or writes.
const TABLES: &[&str] = &[
    "profiles",
    "user_roles",
    "products",
    "cart_items",
    "wishlist_items",
    "orders",
    "order_items",
    "internships",
    "internship_applications",
];

/// Count the rows of each table with the service role.
///
/// # Errors
///
/// Returns `CliError::CheckFailed` if any table could not be read.
pub async fn run(ctx: &Context) -> Result<(), CliError> {
    let mut failed = 0;
    for table in TABLES {
        match ctx.client.probe_table(Some(&ctx.service), table).await {
            Ok(rows) => info!("  {table}: ok ({rows} rows)"),
            Err(e) => {
                error!("  {table}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CliError::CheckFailed(failed));
    }
    info!("All {} tables reachable", TABLES.len());
    Ok(())
}
