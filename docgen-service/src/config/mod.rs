use axum::http::HeaderValue;
use serde::Deserialize;
use service_core::config::{self as core_config, get_env, is_production};
use service_core::error::AppError;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

#[derive(Debug, Clone, Deserialize)]
pub struct DocgenConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub google: GoogleConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub tenders_collection: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub api_key: String,
    /// Model used for template schema extraction (e.g., gemini-2.0-flash)
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma separated origins, or `*` for any origin.
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub local_path: String,
}

impl DocgenConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = is_production();

        let config = DocgenConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("tender_system"), is_prod)?,
                tenders_collection: get_env("TENDERS_COLLECTION", Some("tenders"), is_prod)?,
            },
            google: GoogleConfig {
                api_key: get_env("GOOGLE_API_KEY", None, is_prod)?,
                model: get_env("GEMINI_MODEL", Some("gemini-2.0-flash"), is_prod)?,
            },
            cors: CorsConfig {
                allowed_origins: get_env("CORS_ALLOWED_ORIGINS", Some("*"), is_prod)?,
            },
            storage: StorageConfig {
                local_path: get_env("STORAGE_LOCAL_PATH", Some("storage"), is_prod)?,
            },
        };

        validate_api_key(&config.google.api_key)?;
        // Fail at startup rather than on the first cross-origin request.
        config.cors_policy(is_prod)?;

        Ok(config)
    }

    pub fn cors_policy(&self, is_prod: bool) -> Result<CorsPolicy, AppError> {
        CorsPolicy::parse(&self.cors.allowed_origins, is_prod)
    }
}

pub fn validate_api_key(api_key: &str) -> Result<(), AppError> {
    if api_key.trim().is_empty() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "GOOGLE_API_KEY must not be empty"
        )));
    }
    Ok(())
}

/// Cross-origin policy applied to every route.
#[derive(Debug, Clone, PartialEq)]
pub enum CorsPolicy {
    /// Any origin, method and header. Development only.
    Permissive,
    /// Explicit origins, with credentials allowed.
    AllowList(Vec<HeaderValue>),
}

impl CorsPolicy {
    pub fn parse(raw: &str, is_prod: bool) -> Result<Self, AppError> {
        let origins: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() || origins.contains(&"*") {
            if is_prod {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "CORS_ALLOWED_ORIGINS must list explicit origins in production"
                )));
            }
            return Ok(CorsPolicy::Permissive);
        }

        let origins = origins
            .into_iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|e| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "invalid CORS origin {:?}: {}",
                        origin,
                        e
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CorsPolicy::AllowList(origins))
    }

    pub fn layer(&self) -> CorsLayer {
        match self {
            CorsPolicy::Permissive => CorsLayer::permissive(),
            CorsPolicy::AllowList(origins) => CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins.clone()))
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true),
        }
    }
}
