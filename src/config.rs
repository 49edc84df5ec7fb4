use std::env;

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub trial_days: i64,
    pub asaas: AsaasSettings,
}

pub struct AsaasSettings {
    pub api_url: String,
    pub api_key: String,
    /// Shared secret the gateway echoes in the `asaas-access-token` header.
    /// None disables webhook auth (local development only).
    pub webhook_token: Option<String>,
    pub timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        let trial_days = env::var("TRIAL_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(7);

        let asaas = AsaasSettings {
            api_url: env::var("ASAAS_API_URL")
                .unwrap_or_else(|_| "https://sandbox.asaas.com/api/v3".to_string()),
            api_key: env::var("ASAAS_API_KEY").expect("ASAAS_API_KEY must be set"),
            webhook_token: env::var("ASAAS_WEBHOOK_TOKEN").ok(),
            timeout_seconds: env::var("ASAAS_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10),
        };

        Config {
            database_url,
            frontend_origin,
            trial_days,
            asaas,
        }
    }
}
