use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::gateway::AuthGateway;
use crate::logger::RequestLogger;
use crate::routes::{health_check, login, logout, refresh, signup, verify};

pub fn run(listener: TcpListener, gateway: AuthGateway) -> Result<Server, std::io::Error> {
    let gateway = web::Data::new(gateway);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(RequestLogger)
            // Shared state
            .app_data(gateway.clone())
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(signup))
                    .route("/login", web::post().to(login))
                    .route("/verify", web::post().to(verify))
                    .route("/refresh", web::post().to(refresh))
                    .route("/logout", web::post().to(logout)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
