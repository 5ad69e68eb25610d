//! API key rotation lists

use super::RawEnvironment;
use crate::providers;
use agentcfg_config::Provider;
use std::collections::BTreeMap;
use std::fmt;

/// Highest numbered suffix scanned (`OPENAI_API_KEY_2` .. `OPENAI_API_KEY_10`)
pub const MAX_KEY_SUFFIX: usize = 10;

/// Keys available per provider, in scan order
#[derive(Clone, Default, PartialEq)]
pub struct ApiKeyPool {
    keys: BTreeMap<Provider, Vec<String>>,
}

impl ApiKeyPool {
    /// Collect the base secret plus `_2`..`_10` for every provider
    pub fn scan(env: &RawEnvironment) -> Self {
        let mut keys = BTreeMap::new();
        for profile in providers::profiles() {
            let Some(base) = profile.primary_secret() else {
                continue;
            };
            let found: Vec<String> = std::iter::once(base.to_string())
                .chain((2..=MAX_KEY_SUFFIX).map(|n| format!("{}_{}", base, n)))
                .filter_map(|name| env.get(&name).map(str::to_string))
                .collect();
            if !found.is_empty() {
                keys.insert(profile.provider, found);
            }
        }
        Self { keys }
    }

    pub fn count(&self, provider: Provider) -> usize {
        self.keys.get(&provider).map_or(0, Vec::len)
    }

    /// Round-robin selection: `keys[index % len]`
    pub fn rotated(&self, provider: Provider, index: usize) -> Option<&str> {
        let list = self.keys.get(&provider)?;
        if list.is_empty() {
            return None;
        }
        Some(list[index % list.len()].as_str())
    }
}

impl fmt::Debug for ApiKeyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .keys
            .iter()
            .map(|(provider, keys)| (provider.as_str(), keys.len()))
            .collect();
        f.debug_struct("ApiKeyPool").field("keys", &counts).finish()
    }
}
