//! `rum remove <id>` – drop a session record, leaving any remote data alone.

use anyhow::Result;
use rum_core::session_db::{SessionDb, SessionState};

pub async fn run_remove(db: &SessionDb, id: i64) -> Result<()> {
    let Some(record) = db.get_session(id).await? else {
        println!("No session {id}.");
        return Ok(());
    };
    if record.state == SessionState::Uploading {
        println!("Session {id} is transferring; `rum pause {id}` or `rum cancel {id}` first.");
        return Ok(());
    }
    db.remove_session(id).await?;
    println!("Removed session {id}");
    Ok(())
}
