use actix_cors::Cors;
use actix_files::Files;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;

use todolist::auth::{PasswordHasher, TokenService};
use todolist::config::Config;
use todolist::files::LocalFileStorage;
use todolist::routes;
use todolist::state::AppState;
use todolist::store::PgStore;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("invalid configuration", e))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect_with(config.database.clone())
        .await
        .map_err(|e| startup_error("failed to connect to database", e))?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| startup_error("failed to run migrations", e))?;
    log::info!("database ready");

    let files = LocalFileStorage::new(&config.upload_dir);
    files
        .ensure_root()
        .await
        .map_err(|e| startup_error("failed to create upload directory", e))?;

    let hasher = PasswordHasher::new(config.bcrypt_cost)
        .map_err(|e| startup_error("invalid BCRYPT_COST", e))?;
    let tokens = TokenService::new(&config.jwt_secret, Duration::hours(config.token_ttl_hours))
        .map_err(|e| startup_error("invalid JWT_SECRET", e))?;

    let state = web::Data::new(AppState::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(files.clone()),
        hasher,
        tokens,
        config.max_upload_bytes,
    ));

    let upload_dir = files.root().to_path_buf();
    let cors_origin = config.cors_origin.clone();

    log::info!("Starting todo server at {}", config.server_url());
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::ORIGIN,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::AUTHORIZATION,
            ])
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .service(Files::new("/uploads", upload_dir.clone()))
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
