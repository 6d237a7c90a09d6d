//! `rum clear-completed` – bulk-remove completed sessions.

use anyhow::Result;
use rum_core::session_db::SessionDb;

pub async fn run_clear_completed(db: &SessionDb) -> Result<()> {
    let cleared = db.clear_completed().await?;
    if cleared == 0 {
        println!("No completed sessions to clear.");
    } else {
        println!("Cleared {cleared} completed session(s)");
    }
    Ok(())
}
