pub mod accounts;
pub mod auth;
pub mod closing;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod ranking;
pub mod reminder;
pub mod routes;
pub mod scoring;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::mailer::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
}
