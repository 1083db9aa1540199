//! Cookie-based authentication service: registration, login, and a gate
//! that admits requests carrying a valid session token.

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

pub mod crypto {
    pub mod password;
    pub mod token;
}

pub mod models {
    pub mod user;
}

pub mod repositories {
    pub mod memory;
    pub mod user;
}

pub mod services {
    pub mod auth;
}

pub mod handlers {
    pub mod auth;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}

pub use config::Config;
pub use state::AppState;
