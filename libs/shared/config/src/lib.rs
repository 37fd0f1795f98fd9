use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Supabase,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "in_memory" => Ok(StoreBackend::Memory),
            "supabase" | "postgrest" => Ok(StoreBackend::Supabase),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Tunables of the scheduling core.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Step between candidate start times, in minutes.
    pub slot_grid_minutes: i64,
    pub confirmation_token_length: usize,
    /// Maximum number of waitlist matches handed back after a cancellation.
    pub waitlist_match_limit: usize,
    /// Ranked candidates fetched before the time/employee/location filters run.
    pub waitlist_candidate_window: usize,
    pub reminder_lookahead_hours: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_grid_minutes: 30,
            confirmation_token_length: 32,
            waitlist_match_limit: 5,
            waitlist_candidate_window: 25,
            reminder_lookahead_hours: 24,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub store_backend: StoreBackend,
    pub server_port: u16,
    pub notification_webhook_url: Option<String>,
    pub scheduling: SchedulingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = SchedulingConfig::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            store_backend: parse_or("STORE_BACKEND", StoreBackend::Memory),
            server_port: parse_or("SERVER_PORT", 3000),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            scheduling: SchedulingConfig {
                slot_grid_minutes: parse_or("SLOT_GRID_MINUTES", defaults.slot_grid_minutes),
                confirmation_token_length: parse_or(
                    "CONFIRMATION_TOKEN_LENGTH",
                    defaults.confirmation_token_length,
                ),
                waitlist_match_limit: parse_or("WAITLIST_MATCH_LIMIT", defaults.waitlist_match_limit),
                waitlist_candidate_window: parse_or(
                    "WAITLIST_CANDIDATE_WINDOW",
                    defaults.waitlist_candidate_window,
                ),
                reminder_lookahead_hours: parse_or(
                    "REMINDER_LOOKAHEAD_HOURS",
                    defaults.reminder_lookahead_hours,
                ),
            },
        };

        if config.scheduling.slot_grid_minutes <= 0 {
            warn!("SLOT_GRID_MINUTES must be positive, using default");
        }

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config.normalized()
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_service_role_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Replaces nonsensical scheduling values with their defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = SchedulingConfig::default();
        let scheduling = &mut self.scheduling;

        if scheduling.slot_grid_minutes <= 0 {
            scheduling.slot_grid_minutes = defaults.slot_grid_minutes;
        }
        if scheduling.confirmation_token_length < 16 {
            scheduling.confirmation_token_length = defaults.confirmation_token_length;
        }
        if scheduling.waitlist_match_limit == 0 {
            scheduling.waitlist_match_limit = defaults.waitlist_match_limit;
        }
        if scheduling.waitlist_candidate_window < scheduling.waitlist_match_limit {
            scheduling.waitlist_candidate_window = scheduling.waitlist_match_limit;
        }
        if scheduling.reminder_lookahead_hours <= 0 {
            scheduling.reminder_lookahead_hours = defaults.reminder_lookahead_hours;
        }

        self
    }
}

fn parse_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
{
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}
