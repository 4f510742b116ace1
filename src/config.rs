//! Environment configuration.

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Absent means the in-memory store (development/testing only).
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let database_url = std::env::var("DATABASE_URL").ok();
        Self { port, database_url }
    }
}
