//! `rum add <file> --collection <id> --sequence <n>` – queue a new upload.

use anyhow::{bail, Result};
use rum_core::chunker;
use rum_core::config::UploadConfig;
use rum_core::fingerprint;
use rum_core::media_type;
use rum_core::metadata::EpisodeMetadata;
use rum_core::session_db::{NewSession, SessionDb};
use std::path::Path;

pub struct AddArgs {
    pub file: String,
    pub collection: String,
    pub sequence: u32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub endpoint: Option<String>,
}

pub async fn run_add(db: &SessionDb, cfg: &UploadConfig, args: AddArgs) -> Result<()> {
    let path = Path::new(&args.file);
    let info = media_type::validate_source(path, cfg.max_file_bytes)?;

    let endpoint = match args.endpoint.or_else(|| cfg.endpoint.clone()) {
        Some(e) => e,
        None => bail!("no ingest endpoint: pass --endpoint or set `endpoint` in the config"),
    };

    let file_path = std::fs::canonicalize(path)?
        .to_string_lossy()
        .into_owned();
    let fp = fingerprint::fingerprint_path(path)?;

    let title = args.title.unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| info.file_name.clone())
    });
    let metadata = EpisodeMetadata {
        collection_id: args.collection,
        sequence: args.sequence,
        title,
        description: args.description,
    };

    let id = db
        .add_session(&NewSession {
            endpoint: &endpoint,
            file_path: &file_path,
            file_name: &info.file_name,
            file_size: info.file_size as i64,
            fingerprint: &fp,
            metadata: &metadata,
        })
        .await?;

    let chunks = chunker::chunk_count(info.file_size, cfg.chunk_size_bytes);
    println!(
        "Added session {id}: {} ({} bytes, {}, {} chunk(s))",
        info.file_name, info.file_size, info.media_type, chunks
    );
    Ok(())
}
