use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use procura_application::{CopilotRateLimits, CopilotSettings, EntitlementDefaults};
use procura_core::AppError;
use procura_infrastructure::CopilotServiceSettings;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub session_idle_minutes: i64,
    pub redis_url: Option<String>,
    pub copilot_service_base_url: Option<String>,
    pub copilot_service_secret: Option<String>,
    pub copilot_service_timeout: Duration,
    pub tool_timeout: Duration,
    pub decision_lease_seconds: u32,
    pub rate_limit_per_minute: i32,
    pub entitlement_defaults: EntitlementDefaults,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    /// Builds the configuration from a variable lookup. Blank values count as unset.
    pub fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let database_url = read("DATABASE_URL")
            .ok_or_else(|| AppError::Validation("DATABASE_URL is required".to_owned()))?;

        let decision_lease_seconds = parse_or(
            "COPILOT_DECISION_LEASE_SECONDS",
            read("COPILOT_DECISION_LEASE_SECONDS"),
            60_u32,
        )?;
        if decision_lease_seconds == 0 {
            return Err(AppError::Validation(
                "COPILOT_DECISION_LEASE_SECONDS must be greater than zero".to_owned(),
            ));
        }
        let rate_limit_per_minute = parse_or(
            "COPILOT_RATE_LIMIT_PER_MINUTE",
            read("COPILOT_RATE_LIMIT_PER_MINUTE"),
            30_i32,
        )?;
        if rate_limit_per_minute <= 0 {
            return Err(AppError::Validation(
                "COPILOT_RATE_LIMIT_PER_MINUTE must be greater than zero".to_owned(),
            ));
        }

        let session_idle_minutes =
            parse_or("SESSION_IDLE_MINUTES", read("SESSION_IDLE_MINUTES"), 30_i64)?;
        if session_idle_minutes <= 0 {
            return Err(AppError::Validation(
                "SESSION_IDLE_MINUTES must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url: read("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_owned()),
            api_host: read("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned()),
            api_port: parse_or("API_PORT", read("API_PORT"), 3001_u16)?,
            cookie_secure: parse_flag(
                "SESSION_COOKIE_SECURE",
                read("SESSION_COOKIE_SECURE"),
                false,
            )?,
            session_idle_minutes,
            redis_url: read("REDIS_URL"),
            copilot_service_base_url: read("COPILOT_SERVICE_BASE_URL")
                .map(|value| value.trim_end_matches('/').to_owned()),
            copilot_service_secret: read("COPILOT_SERVICE_SECRET"),
            copilot_service_timeout: parse_millis(
                "COPILOT_SERVICE_TIMEOUT_MS",
                read("COPILOT_SERVICE_TIMEOUT_MS"),
                20_000,
            )?,
            tool_timeout: parse_millis(
                "COPILOT_TOOL_TIMEOUT_MS",
                read("COPILOT_TOOL_TIMEOUT_MS"),
                5_000,
            )?,
            decision_lease_seconds,
            rate_limit_per_minute,
            entitlement_defaults: EntitlementDefaults {
                ai_actions_enabled: parse_flag(
                    "COPILOT_DEFAULT_AI_ACTIONS_ENABLED",
                    read("COPILOT_DEFAULT_AI_ACTIONS_ENABLED"),
                    false,
                )?,
                ai_workflows_enabled: parse_flag(
                    "COPILOT_DEFAULT_AI_WORKFLOWS_ENABLED",
                    read("COPILOT_DEFAULT_AI_WORKFLOWS_ENABLED"),
                    false,
                )?,
                ai_chat_enabled: parse_flag(
                    "COPILOT_DEFAULT_AI_CHAT_ENABLED",
                    read("COPILOT_DEFAULT_AI_CHAT_ENABLED"),
                    false,
                )?,
            },
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }

    pub fn copilot_service_settings(&self) -> CopilotServiceSettings {
        CopilotServiceSettings {
            base_url: self.copilot_service_base_url.clone(),
            secret: self.copilot_service_secret.clone(),
            timeout: self.copilot_service_timeout,
        }
    }

    pub fn copilot_settings(&self) -> CopilotSettings {
        CopilotSettings {
            entitlement_defaults: self.entitlement_defaults,
            rate_limits: CopilotRateLimits::per_minute(self.rate_limit_per_minute),
            lease_seconds: self.decision_lease_seconds,
            tool_timeout: self.tool_timeout,
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{raw}': {error}"))),
        None => Ok(default),
    }
}

fn parse_millis(name: &str, value: Option<String>, default: u64) -> Result<Duration, AppError> {
    let millis = parse_or(name, value, default)?;
    if millis == 0 {
        return Err(AppError::Validation(format!("{name} must be greater than zero")));
    }

    Ok(Duration::from_millis(millis))
}

fn parse_flag(name: &str, value: Option<String>, default: bool) -> Result<bool, AppError> {
    let Some(raw) = value else {
        return Ok(default);
    };

    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "{name} must be true or false, got '{raw}'"
        ))),
    }
}
