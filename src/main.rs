use actix_web::{App, HttpServer, middleware, web};

use ideaswipe::config::Config;
use ideaswipe::{db, handlers};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = Config::from_env();

    // Initialize the idea store (Postgres if configured, memory otherwise)
    let store = match db::init_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to initialise store: {e}");
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    let bind_addr = config.bind_addr.clone();
    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .configure(handlers::configure(store.clone(), config.clone()))
            // Default 404 handler (must be registered last)
            .default_service(web::to(|| async {
                actix_web::HttpResponse::NotFound().json(serde_json::json!({
                    "error": { "code": "NOT_FOUND", "message": "Route not found" }
                }))
            }))
    })
    .bind(bind_addr)?
    .run()
    .await
}
