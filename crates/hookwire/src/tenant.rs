// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `hookwire tenant` command implementation.

use clap::Args;

use hookwire_config::HookwireConfig;
use hookwire_core::{
    HookwireError, NewTenant, PluginAdapter, Subscriptions, TenantRecord, TenantStore,
};
use hookwire_storage::SqliteTenantStore;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Display name of the tenant.
    #[arg(long)]
    pub name: String,

    /// API token the tenant authenticates with. Must be unique.
    #[arg(long)]
    pub token: String,

    /// Webhook URL that receives the tenant's events.
    #[arg(long)]
    pub webhook: Option<String>,

    /// Event types to deliver, comma separated. Defaults to all.
    #[arg(long, value_delimiter = ',')]
    pub events: Vec<String>,

    /// Proxy for the tenant's protocol and webhook traffic (http or socks5).
    #[arg(long)]
    pub proxy: Option<String>,
}

/// Runs `hookwire tenant add`.
pub async fn run_add(config: HookwireConfig, args: AddArgs) -> Result<(), HookwireError> {
    let record = add_tenant(&config, args).await?;
    println!("tenant {} ({}) created", record.id, record.name);
    Ok(())
}

async fn add_tenant(config: &HookwireConfig, args: AddArgs) -> Result<TenantRecord, HookwireError> {
    if let Some(proxy) = &args.proxy
        && !(proxy.starts_with("http://") || proxy.starts_with("socks5://"))
    {
        return Err(HookwireError::Validation(
            "proxy must use the http or socks5 scheme".into(),
        ));
    }

    let store = SqliteTenantStore::new(config.storage.clone());
    store.initialize().await?;

    let events = if args.events.is_empty() {
        String::new()
    } else {
        Subscriptions::parse(&args.events).to_stored()
    };
    let result = store
        .create_tenant(NewTenant {
            name: args.name,
            token: args.token,
            webhook: args.webhook.unwrap_or_default(),
            events,
            proxy_url: args.proxy,
        })
        .await;
    store.shutdown().await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &tempfile::TempDir) -> HookwireConfig {
        let mut config = HookwireConfig::default();
        config.storage.database_path = dir.path().join("hookwire.db").display().to_string();
        config
    }

    fn args(token: &str) -> AddArgs {
        AddArgs {
            name: "acme".into(),
            token: token.into(),
            webhook: Some("https://hooks.acme.test/in".into()),
            events: vec!["Message".into(), "Bogus".into()],
            proxy: None,
        }
    }

    #[tokio::test]
    async fn adds_tenant_with_normalized_events() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let record = add_tenant(&config, args("abc")).await.unwrap();
        assert_eq!(record.name, "acme");
        assert_eq!(record.events, "Message");
        assert!(!record.connected);

        let store = SqliteTenantStore::new(config.storage.clone());
        store.initialize().await.unwrap();
        let found = store.find_by_token("abc").await.unwrap().unwrap();
        assert_eq!(found.id, record.id);
        assert_eq!(found.webhook, "https://hooks.acme.test/in");
    }

    #[tokio::test]
    async fn duplicate_token_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        add_tenant(&config, args("abc")).await.unwrap();
        assert!(add_tenant(&config, args("abc")).await.is_err());
    }

    #[tokio::test]
    async fn unsupported_proxy_scheme_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);

        let mut add = args("abc");
        add.proxy = Some("ftp://proxy.test".into());
        let err = add_tenant(&config, add).await.unwrap_err();
        assert!(matches!(err, HookwireError::Validation(_)));
    }
}
