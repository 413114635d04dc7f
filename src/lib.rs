pub mod auth;
pub mod configuration;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod logger;
pub mod routes;
pub mod startup;
pub mod telemetry;
