//! Assorted helpers for setting up resolutions.

use std::sync::Arc;

use algebra::module::FDModule;
use algebra::MilnorAlgebra;
use anyhow::{anyhow, Context};
use fp::prime::ValidPrime;
use serde::Deserialize;
use serde_json::Value;

use crate::resolution::Resolution;

/// The resolution built by [`construct`].
pub type FDResolution = Resolution<FDModule<MilnorAlgebra>>;

/// Everything needed to set up a resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The json description of the module, in the format of [`FDModule::to_json`].
    pub module: Value,
    /// Refuse to compute the algebra beyond this degree.
    #[serde(default)]
    pub algebra_max_degree: Option<i32>,
    /// Refuse to resolve beyond this internal degree.
    #[serde(default)]
    pub degree_budget: Option<i32>,
}

impl TryFrom<Value> for Config {
    type Error = anyhow::Error;

    /// A document with a `module` field is a full config. Anything else is taken to be the module
    /// itself.
    fn try_from(json: Value) -> anyhow::Result<Self> {
        if json.get("module").is_some() {
            serde_json::from_value(json).context("Failed to read config")
        } else {
            Ok(Self {
                module: json,
                algebra_max_degree: None,
                degree_budget: None,
            })
        }
    }
}

impl TryFrom<&str> for Config {
    type Error = anyhow::Error;

    /// Accepts either inline json or the path of a json file.
    fn try_from(spec: &str) -> anyhow::Result<Self> {
        let spec = spec.trim();
        let json: Value = if spec.starts_with('{') {
            serde_json::from_str(spec).context("Failed to parse inline config")?
        } else {
            let contents = std::fs::read_to_string(spec)
                .with_context(|| format!("Failed to read config file {spec}"))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {spec}"))?
        };
        Self::try_from(json)
    }
}

/// Construct the resolution of the module described by `config`. The prime is read from the `p`
/// field of the module, and defaults to 2.
///
/// The resolution is empty; call [`Resolution::resolve_through_degree`] to compute it.
pub fn construct<T>(config: T) -> anyhow::Result<Arc<FDResolution>>
where
    T: TryInto<Config, Error = anyhow::Error>,
{
    let Config {
        module: json,
        algebra_max_degree,
        degree_budget,
    } = config.try_into()?;

    let p = match json.get("p") {
        None => 2,
        Some(p) => p
            .as_u64()
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| anyhow!("p must be a positive integer, found {p}"))?,
    };
    let p = ValidPrime::try_new(p).ok_or(error::Error::InvalidPrime(p))?;

    let algebra = Arc::new(match algebra_max_degree {
        Some(max) => MilnorAlgebra::with_max_degree(p, max),
        None => MilnorAlgebra::new(p),
    });
    let module = FDModule::from_json(algebra, &json).context("Failed to load module")?;
    tracing::debug!(module = %module, %p, ?degree_budget, "constructed module");

    let mut resolution = Resolution::new(Arc::new(module));
    resolution.set_degree_budget(degree_budget);
    Ok(Arc::new(resolution))
}

/// Install a `fmt` subscriber filtered by `RUST_LOG`, or `info` if unset. Calling this more than
/// once is harmless.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// A single character depicting `n`, for use in charts.
pub fn unicode_num(n: usize) -> char {
    match n {
        0 => ' ',
        1 => '·',
        2 => ':',
        3 => '∴',
        4 => '⁘',
        5 => '⁙',
        6 => '⠿',
        7 => '⡿',
        8 => '⣿',
        9 => '9',
        _ => '*',
    }
}
