//! Database commands. The pool comes from the same layered config as every
//! other command, so `database.url_env` and `max_connections` apply here too.

use anyhow::Result;

use capsync_config::resolve_secrets;
use capsync_daemon::bootstrap;

use super::load_cli_settings;

pub async fn status(config_paths: &[String]) -> Result<()> {
    let settings = load_cli_settings(config_paths)?;
    let pool = bootstrap::connect_db(&settings, &resolve_secrets(&settings)).await?;

    let status = capsync_db::status(&pool).await;
    pool.close().await;

    let s = status?;
    println!("db_ok={} has_capacity_table={}", s.ok, s.has_capacity_table);
    Ok(())
}

pub async fn migrate(config_paths: &[String]) -> Result<()> {
    let settings = load_cli_settings(config_paths)?;
    let pool = bootstrap::connect_db(&settings, &resolve_secrets(&settings)).await?;

    let applied = capsync_db::migrate(&pool).await;
    pool.close().await;

    applied?;
    println!("migrations_applied=true");
    Ok(())
}
