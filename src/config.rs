use std::env;

use crate::services::lifecycle::TransitionPolicy;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    /// Hourly labor rate used for invoices when a request does not supply one.
    pub labor_rate_cents: i64,
    /// Labor time, in hundredths of an hour, billed on the invoice listing.
    pub default_labor_hundredths: i64,
    pub strict_transitions: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "garage.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            labor_rate_cents: env::var("LABOR_RATE_CENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            default_labor_hundredths: env::var("DEFAULT_LABOR_HOURS")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|h| h.is_finite() && *h >= 0.0)
                .map(|h| (h * 100.0).round() as i64)
                .unwrap_or(100),
            strict_transitions: env::var("STRICT_TRANSITIONS")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        if self.strict_transitions {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Permissive
        }
    }
}
