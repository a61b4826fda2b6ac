//! Persona routing: destination address -> persona client.
//!
//! The table is built once from config and never changes. Lookup is an exact match on
//! the message's `to`; there is no default persona, so unknown destinations resolve to `None`.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::persona::PersonaClient;

/// Read-only map of destination address to persona client.
pub struct PersonaRouter {
    routes: HashMap<String, Arc<PersonaClient>>,
}

impl PersonaRouter {
    /// Build one client per configured persona, all sharing `client`.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Result<Self> {
        config.validate()?;
        let mut routes = HashMap::with_capacity(config.personas.len());
        for route in &config.personas {
            let persona = PersonaClient::new(&config.api.server_url, route, client.clone());
            log::debug!(
                "persona route: {} -> {} ({})",
                route.address,
                persona.name(),
                persona.chat_url()
            );
            routes.insert(route.address.clone(), Arc::new(persona));
        }
        Ok(Self { routes })
    }

    /// Persona owning `destination`, if any.
    pub fn resolve(&self, destination: &str) -> Option<Arc<PersonaClient>> {
        self.routes.get(destination).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// (address, persona) pairs sorted by address.
    pub fn entries(&self) -> Vec<(&str, &PersonaClient)> {
        let mut entries: Vec<_> = self
            .routes
            .iter()
            .map(|(address, persona)| (address.as_str(), persona.as_ref()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}
