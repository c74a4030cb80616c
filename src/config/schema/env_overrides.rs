use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("CHATKEEP_API_KEY").or_else(|_| std::env::var("API_KEY"))
            && !key.is_empty()
        {
            self.api_key = Some(key);
        }

        if let Ok(base_url) = std::env::var("CHATKEEP_BASE_URL")
            && !base_url.is_empty()
        {
            self.provider.base_url = base_url;
        }

        if let Ok(model) = std::env::var("CHATKEEP_MODEL")
            && !model.is_empty()
        {
            self.provider.model = model;
        }

        if let Ok(temp_str) = std::env::var("CHATKEEP_TEMPERATURE")
            && let Ok(temp) = temp_str.parse::<f64>()
            && temp > 0.0
            && temp < 1.0
        {
            self.provider.temperature = temp;
        }

        if let Ok(secs_str) = std::env::var("CHATKEEP_IDLE_EXPIRY_SECS")
            && let Ok(secs) = secs_str.parse::<u64>()
        {
            self.session.idle_expiry_secs = Some(secs);
        }
    }
}
