//! Server command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::ai::AIClient;
use tally_core::config::TallyConfig;

use super::open_db;

pub struct ServeOptions<'a> {
    pub host: Option<&'a str>,
    pub port: Option<u16>,
    pub no_auth: bool,
    pub static_dir: Option<&'a Path>,
}

pub async fn cmd_serve(
    db_path: &Path,
    no_encrypt: bool,
    config: &TallyConfig,
    opts: ServeOptions<'_>,
) -> Result<()> {
    let host = opts.host.unwrap_or(config.server.host.as_str());
    let port = opts.port.unwrap_or(config.server.port);
    let static_dir = opts
        .static_dir
        .map(Path::to_path_buf)
        .or_else(|| config.server.static_dir.as_ref().map(PathBuf::from));

    println!("🚀 Starting Tally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(ref dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    let mut server_config =
        tally_server::ServerConfig::from_settings(&config.server, &config.insights);
    if opts.no_auth {
        server_config.require_auth = false;
    }

    if !server_config.require_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if server_config.jwt_secret.is_some() {
        println!("   🔐 Authentication: bearer tokens (TALLY_JWT_SECRET)");
    } else {
        println!("   🔒 Authentication: bearer tokens (ephemeral secret)");
        println!("      Set TALLY_JWT_SECRET so sessions survive restarts");
    }
    if !server_config.allowed_origins.is_empty() {
        println!(
            "   🌐 CORS origins: {}",
            server_config.allowed_origins.join(", ")
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }

    let ai = AIClient::from_config(&config.ai);
    match ai {
        Some(ref client) => {
            let info = client.info();
            println!("   🤖 AI: {} ({} at {})", info.backend, info.model, info.host);
        }
        None => println!("   💡 Tip: Set OLLAMA_HOST to enable AI features"),
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let static_dir_str = static_dir
        .as_deref()
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;
    tally_server::serve(db, ai, host, port, static_dir_str, server_config).await?;

    Ok(())
}
