//! Installed-Plugin Ledger
//!
//! Derived view over the per-scope settings files: the union, across
//! scopes, of installed-plugin records. Never persisted on its own.
//!
//! Invariant: at most one scope holds an install record for a given
//! `(name, marketplace)` pair. The mutation helpers here remove any prior
//! record for the key before a new one is written.

use crate::error::Result;
use crate::scope::Scope;
use crate::settings::ScopeStore;
use crate::types::InstalledPluginRecord;

pub struct Ledger<'a> {
    store: &'a ScopeStore,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a ScopeStore) -> Self {
        Self { store }
    }

    /// Scope that owns the install for a plugin, if any.
    pub fn installed_scope(&self, name: &str, marketplace: &str) -> Result<Option<Scope>> {
        Ok(self.record(name, marketplace)?.map(|r| r.scope))
    }

    /// The install record for a plugin, if any.
    pub fn record(&self, name: &str, marketplace: &str) -> Result<Option<InstalledPluginRecord>> {
        for scope in Scope::precedence() {
            let settings = self.store.load(scope)?;
            if let Some(record) = settings
                .installed_plugins
                .iter()
                .find(|r| r.name == name && r.marketplace == marketplace)
            {
                return Ok(Some(record.clone()));
            }
        }
        Ok(None)
    }

    /// All install records across scopes, in precedence order.
    pub fn records(&self) -> Result<Vec<InstalledPluginRecord>> {
        let mut result = Vec::new();
        for scope in Scope::precedence() {
            let settings = self.store.load(scope)?;
            result.extend(settings.installed_plugins);
        }
        Ok(result)
    }

    /// Write an install record into its scope, dropping any prior record
    /// for the same key in any scope first.
    pub fn put(&self, record: InstalledPluginRecord) -> Result<()> {
        for scope in Scope::precedence() {
            if scope == record.scope {
                continue;
            }
            let settings = self.store.load(scope)?;
            if settings
                .installed_plugins
                .iter()
                .any(|r| r.name == record.name && r.marketplace == record.marketplace)
            {
                self.store.mutate(scope, |s| {
                    s.installed_plugins
                        .retain(|r| !(r.name == record.name && r.marketplace == record.marketplace));
                })?;
            }
        }

        self.store.mutate(record.scope, move |s| {
            s.installed_plugins
                .retain(|r| !(r.name == record.name && r.marketplace == record.marketplace));
            s.installed_plugins.push(record);
        })
    }

    /// Remove the install record for a plugin from its owning scope.
    /// Returns the removed record's scope, or None if not installed.
    pub fn remove(&self, name: &str, marketplace: &str) -> Result<Option<Scope>> {
        for scope in Scope::precedence() {
            let settings = self.store.load(scope)?;
            if settings
                .installed_plugins
                .iter()
                .any(|r| r.name == name && r.marketplace == marketplace)
            {
                self.store.mutate(scope, |s| {
                    s.installed_plugins
                        .retain(|r| !(r.name == name && r.marketplace == marketplace));
                })?;
                return Ok(Some(scope));
            }
        }
        Ok(None)
    }
}
