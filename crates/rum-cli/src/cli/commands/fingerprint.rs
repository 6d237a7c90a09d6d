//! `rum fingerprint <path>` – print a file's content fingerprint.

use anyhow::Result;
use rum_core::fingerprint;
use std::path::Path;

pub fn run_fingerprint(path: &str) -> Result<()> {
    let fp = fingerprint::fingerprint_path(Path::new(path))?;
    println!("{fp}  {path}");
    Ok(())
}
