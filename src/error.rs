use derive_more::{Display, From};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, From)]
pub enum Error {
    #[from]
    Database(sqlx::Error),

    #[from]
    Upstream(reqwest::Error),

    #[display("Package not found: {name}")]
    PackageNotFound { name: String },

    #[display("Registry returned {status} for package: {name}")]
    RegistryStatus { name: String, status: u16 },

    #[display("Invalid package name: {name}")]
    InvalidPackageName { name: String },

    #[display("Configuration error: {msg}")]
    Config { msg: String },
}

impl std::error::Error for Error {}

// Implement axum IntoResponse for Error
impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Error::PackageNotFound { name } => {
                // Safe to expose - just the package name
                (
                    axum::http::StatusCode::NOT_FOUND,
                    format!("Package not found: {}", name),
                )
            }
            Error::InvalidPackageName { name } => {
                tracing::warn!("Invalid package name requested: {}", name);
                (
                    axum::http::StatusCode::BAD_REQUEST,
                    "Invalid package name".to_string(),
                )
            }
            Error::RegistryStatus { name, status } => {
                // Log upstream detail internally for debugging
                tracing::error!("Registry returned {} for package {}", status, name);
                (
                    axum::http::StatusCode::BAD_GATEWAY,
                    "Upstream registry error".to_string(),
                )
            }
            Error::Upstream(e) => {
                // Log full error internally - never expose upstream URLs
                tracing::error!("Registry request failed: {}", e);
                (
                    axum::http::StatusCode::BAD_GATEWAY,
                    "Upstream registry unavailable".to_string(),
                )
            }
            Error::Database(e) => {
                // Log full error internally for debugging
                tracing::error!("Database error: {}", e);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            Error::Config { msg } => {
                tracing::error!("Configuration error: {}", msg);
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                )
            }
        };

        let body = axum::Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
