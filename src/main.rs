use axum::{routing::get, Router};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use std::{env, net::SocketAddr};
use tracing_subscriber;
use anyhow::Result;

mod auth;
mod error;
mod models;
mod routes;
mod store;
mod streak;
#[cfg(test)]
mod test_utils;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:habitsync.db?mode=rwc".to_string());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app = Router::new()
        .merge(routes::auth::routes(pool.clone()))
        .merge(routes::habits::routes(pool.clone()))
        .route("/health", get(|| async { "✅ Backend up" }));

    let port: u16 = env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("🧠 Server running at {}", addr);

    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
