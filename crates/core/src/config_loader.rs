use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering defaults, TOML, environment variables, and JSON.
    ///
    /// Environment variables use the `ECO_` prefix with `__` separating nested
    /// keys, e.g. `ECO_CACHE__TTL_MS=60000`.
    ///
    /// # Errors
    ///
    /// Returns an error if a present configuration file cannot be parsed or a
    /// value has the wrong type.
    pub fn load() -> Result<AppConfig> {
        let config: AppConfig = Self::base()
            .merge(Env::prefixed("ECO_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        config.analysis.blend.validate()?;
        Ok(config)
    }

    /// Loads configuration with a profile overlay (`config/Config.{profile}.toml`).
    ///
    /// # Errors
    ///
    /// Returns an error if a present configuration file cannot be parsed or a
    /// value has the wrong type.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        let config: AppConfig = Self::base()
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .merge(Env::prefixed("ECO_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        config.analysis.blend.validate()?;
        Ok(config)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config/Config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_fall_back_to_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = ConfigLoader::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache.ttl_ms, 300_000);
            Ok(())
        });
    }

    #[test]
    fn toml_and_env_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Config.toml",
                r#"
                [cache]
                ttl_ms = 1000

                [analysis.blend]
                sentiment = 0.5
                "#,
            )?;
            jail.set_env("ECO_CACHE__MAX_SIZE", "42");

            let config = ConfigLoader::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache.ttl_ms, 1000);
            assert_eq!(config.cache.max_size, 42);
            assert!((config.analysis.blend.sentiment - 0.5).abs() < f64::EPSILON);
            assert!((config.analysis.blend.ecosystem_price - 0.6).abs() < f64::EPSILON);
            Ok(())
        });
    }

    #[test]
    fn profile_overlay_wins_over_base() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file("config/Config.toml", "[provider]\ntimeout_secs = 5\n")?;
            jail.create_file("config/Config.test.toml", "[provider]\ntimeout_secs = 30\n")?;

            let config = ConfigLoader::load_with_profile("test").map_err(|e| e.to_string())?;
            assert_eq!(config.provider.timeout_secs, 30);
            Ok(())
        });
    }

    #[test]
    fn invalid_blend_weight_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file("config/Config.toml", "[analysis.blend]\nasset_price = 2.0\n")?;

            let result = ConfigLoader::load();
            assert!(result.is_err());
            Ok(())
        });
    }
}
