use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::deploy::{DeployConfig, Variant};
use crate::environment::Environment;

/// The remote environments, built once per host from the configuration.
pub struct Registry {
    settings: Arc<DeployConfig>,
    environments: BTreeMap<Variant, Environment>,
}

impl Registry {
    pub fn build(settings: Arc<DeployConfig>) -> Self {
        let environments = Variant::ALL
            .into_iter()
            .map(|variant| {
                let path = settings.project_base_path.join(variant.as_str());
                (variant, Environment::new(variant.as_str(), path, settings.clone()))
            })
            .collect();
        Self {
            settings,
            environments,
        }
    }

    pub fn settings(&self) -> &DeployConfig {
        &self.settings
    }

    pub fn get(&self, variant: Variant) -> Result<&Environment> {
        self.environments
            .get(&variant)
            .ok_or_else(|| anyhow!("environment '{}' is not configured", variant))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variant, &Environment)> {
        self.environments.iter()
    }
}
