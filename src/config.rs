use std::{net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

fn default_db() -> String {
    "sqlite://data/hermis.db".to_owned()
}

const fn default_live_cache_secs() -> u64 {
    30
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AppConfig {
    pub listen_address: Option<SocketAddr>,
    #[serde(default = "default_db")]
    pub db: String,
    /// JSON-RPC endpoint used for live contract reads. Without one, every live read falls back.
    pub rpc_url: Option<Url>,
    /// JSON-lines file of logged events to ingest at startup.
    pub events: Option<PathBuf>,
    /// How long a live read stays valid, in seconds.
    #[serde(default = "default_live_cache_secs")]
    pub live_cache_secs: u64,
    pub metrics: Option<MetricConfig>,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default = "default_tokens")]
    pub tokens: Vec<TokenConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PrometheusConfig {
    /// The URL of the Prometheus server's exporter endpoint.
    pub url: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum MetricConfig {
    PrometheusPush(PrometheusConfig),
}

/// Well-known deployment addresses.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ContractsConfig {
    pub simple_adoption_strategy: String,
    pub basic_reward_strategy: String,
    pub submission_guard: String,
    pub review_guard: String,
    pub global_guard: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            simple_adoption_strategy: "0xbbcb88b4d6ea2f860ab8ae8db035b11f3c052e01".to_owned(),
            basic_reward_strategy: "0x52c96cad4722ef8216a3699e3cb3bd6c06844b09".to_owned(),
            submission_guard: "0x65da79467f60cb4829183d50bb4fa9a836dfcb07".to_owned(),
            review_guard: "0x3a0508bbf4acd261fe3fecb1267be0fbccca6dba".to_owned(),
            global_guard: "0x0150192a139d592cc50179291a6a40fd228eb4a5".to_owned(),
        }
    }
}

impl ContractsConfig {
    /// Lower-case every address so they compare equal to indexed ids.
    pub fn normalized(mut self) -> Self {
        for address in [
            &mut self.simple_adoption_strategy,
            &mut self.basic_reward_strategy,
            &mut self.submission_guard,
            &mut self.review_guard,
            &mut self.global_guard,
        ] {
            *address = address.trim().to_ascii_lowercase();
        }
        self
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

pub(crate) fn default_tokens() -> Vec<TokenConfig> {
    vec![
        TokenConfig {
            address: "0x833589fcd6edb6e08f4c7c23142546c457aeeb86".to_owned(),
            symbol: "USDC".to_owned(),
            decimals: 6,
        },
        TokenConfig {
            address: "0x4200000000000000000000000000000000000006".to_owned(),
            symbol: "WETH".to_owned(),
            decimals: 18,
        },
    ]
}
