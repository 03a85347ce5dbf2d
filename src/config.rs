use anyhow::Context;

#[derive(Debug, Clone, Default)]
pub struct AzureConfig {
    pub openai_endpoint: String,
    pub openai_api_key: String,
    pub openai_deployment: String,
    pub openai_api_version: String,
    pub content_safety_endpoint: String,
    pub content_safety_key: String,
    pub app_insights_connection_string: String,
    pub storage_connection_string: String,
    pub storage_container: String,
    pub service_bus_connection_string: String,
    pub service_bus_queue: String,
    pub power_automate_endpoint: String,
}

impl AzureConfig {
    pub fn openai_configured(&self) -> bool {
        !self.openai_endpoint.is_empty()
    }

    /// Content Safety needs both halves of the credential pair.
    pub fn content_safety_configured(&self) -> bool {
        !self.content_safety_endpoint.is_empty() && !self.content_safety_key.is_empty()
    }

    pub fn monitoring_configured(&self) -> bool {
        !self.app_insights_connection_string.is_empty()
    }

    pub fn storage_configured(&self) -> bool {
        !self.storage_connection_string.is_empty()
    }

    pub fn service_bus_configured(&self) -> bool {
        !self.service_bus_connection_string.is_empty()
    }

    pub fn power_automate_configured(&self) -> bool {
        !self.power_automate_endpoint.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub debug: bool,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub api_keys: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub azure: AzureConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let secret_key = lookup("SECRET_KEY")
            .filter(|s| !s.trim().is_empty())
            .context("SECRET_KEY must be set")?;

        Ok(Self {
            app_name: var_or("APP_NAME", "HealthyFoods"),
            debug: var_or("DEBUG", "false")
                .parse()
                .context("DEBUG must be true or false")?,
            database_url: var_or("DATABASE_URL", "sqlite://healthyfoods.db"),
            host: var_or("HOST", "0.0.0.0"),
            port: var_or("PORT", "8000")
                .parse()
                .context("PORT must be a valid number")?,
            secret_key,
            api_keys: split_list(lookup("API_KEYS").as_deref().unwrap_or("")),
            allowed_origins: split_list(&var_or(
                "ALLOWED_ORIGINS",
                "http://localhost:3000,http://localhost:8000",
            )),
            azure: AzureConfig {
                openai_endpoint: var_or("AZURE_OPENAI_ENDPOINT", ""),
                openai_api_key: var_or("AZURE_OPENAI_API_KEY", ""),
                openai_deployment: var_or("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt-4"),
                openai_api_version: var_or("AZURE_OPENAI_API_VERSION", "2024-02-15-preview"),
                content_safety_endpoint: var_or("AZURE_CONTENT_SAFETY_ENDPOINT", ""),
                content_safety_key: var_or("AZURE_CONTENT_SAFETY_KEY", ""),
                app_insights_connection_string: var_or("APPLICATIONINSIGHTS_CONNECTION_STRING", ""),
                storage_connection_string: var_or("AZURE_STORAGE_CONNECTION_STRING", ""),
                storage_container: var_or("AZURE_STORAGE_CONTAINER", "healthyfoods-data"),
                service_bus_connection_string: var_or("AZURE_SERVICE_BUS_CONNECTION_STRING", ""),
                service_bus_queue: var_or("AZURE_SERVICE_BUS_QUEUE_NAME", "orders-queue"),
                power_automate_endpoint: var_or("AZURE_POWER_AUTOMATE_ENDPOINT", ""),
            },
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
