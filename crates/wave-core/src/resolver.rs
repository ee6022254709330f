//! Enable/Disable Resolver
//!
//! Computes the effective enabled state of a plugin by scanning scopes in
//! precedence order (`local > project > user`). The first scope with an
//! explicit override wins; with no override anywhere, an installed plugin
//! defaults to enabled.

use crate::error::Result;
use crate::ledger::Ledger;
use crate::scope::Scope;
use crate::settings::ScopeStore;
use crate::types::plugin_key;

/// Verdict for a plugin's enablement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveState {
    Enabled,
    Disabled,
    NotInstalled,
}

impl std::fmt::Display for EffectiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enabled => write!(f, "enabled"),
            Self::Disabled => write!(f, "disabled"),
            Self::NotInstalled => write!(f, "not-installed"),
        }
    }
}

pub struct Resolver<'a> {
    store: &'a ScopeStore,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a ScopeStore) -> Self {
        Self { store }
    }

    /// Effective state for an installed plugin; `NotInstalled` otherwise.
    pub fn effective_state(&self, name: &str, marketplace: &str) -> Result<EffectiveState> {
        if Ledger::new(self.store)
            .installed_scope(name, marketplace)?
            .is_none()
        {
            return Ok(EffectiveState::NotInstalled);
        }

        match self.explicit_override(name, marketplace)? {
            Some((_, false)) => Ok(EffectiveState::Disabled),
            // No override anywhere: installing implies enabling.
            Some((_, true)) | None => Ok(EffectiveState::Enabled),
        }
    }

    /// The winning explicit override and the scope that holds it, if any.
    pub fn explicit_override(
        &self,
        name: &str,
        marketplace: &str,
    ) -> Result<Option<(Scope, bool)>> {
        let key = plugin_key(name, marketplace);
        for scope in Scope::precedence() {
            let settings = self.store.load(scope)?;
            if let Some(value) = settings.enabled_plugins.get(&key) {
                return Ok(Some((scope, *value)));
            }
        }
        Ok(None)
    }

    /// Write an explicit override at one scope. Other scopes' entries are
    /// left in place as fallbacks.
    pub fn set_enabled(
        &self,
        name: &str,
        marketplace: &str,
        scope: Scope,
        value: bool,
    ) -> Result<()> {
        let key = plugin_key(name, marketplace);
        self.store.mutate(scope, |s| {
            s.enabled_plugins.insert(key, value);
        })
    }

    /// Drop the override entry at one scope, if present.
    pub fn clear_override(&self, name: &str, marketplace: &str, scope: Scope) -> Result<()> {
        let key = plugin_key(name, marketplace);
        self.store.mutate(scope, |s| {
            s.enabled_plugins.remove(&key);
        })
    }
}
