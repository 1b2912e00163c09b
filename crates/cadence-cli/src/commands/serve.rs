//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use cadence_core::DetectionConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_encrypt: bool,
    detection: DetectionConfig,
    allowed_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting Cadence web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    if allowed_origins.is_empty() {
        println!("   CORS: same-origin only");
    } else {
        println!("   CORS origins: {}", allowed_origins.join(", "));
    }

    let db = open_db(db_path, no_encrypt)?;
    let config = cadence_server::ServerConfig { allowed_origins };

    cadence_server::serve(db, host, port, config, detection)
        .await
        .context("Server error")
}
