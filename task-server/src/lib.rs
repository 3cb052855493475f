pub mod config {
    use serde::Deserialize;

    /// Deployment mode, controlling log verbosity and how much error detail
    /// reaches API clients.
    #[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[serde(rename_all = "lowercase")]
    pub enum AppEnv {
        #[default]
        Development,
        Test,
        Production,
    }

    impl AppEnv {
        pub fn is_production(self) -> bool {
            self == AppEnv::Production
        }

        /// Returns the most verbose level the subscriber should emit.
        pub fn log_level(self) -> tracing::Level {
            if self.is_production() {
                tracing::Level::INFO
            } else {
                tracing::Level::DEBUG
            }
        }
    }

    #[derive(Deserialize, Debug)]
    pub struct Config {
        pub db_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default)]
        pub environment: AppEnv,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    fn default_port() -> u16 {
        8080
    }

}

pub mod entities;
pub mod task;
pub mod web;
