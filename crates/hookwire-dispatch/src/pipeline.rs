// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event dispatch pipeline.
//!
//! One [`SessionEventHandler`] is attached to each protocol client. The client
//! awaits every `handle` call, so events for one tenant are processed in order
//! (attachment download included) while tenants never wait on each other.
//! Webhook calls themselves are handed to the [`DeliveryQueue`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use hookwire_auth::AuthCache;
use hookwire_core::events::CRITICAL_APP_STATE;
use hookwire_core::{
    DeliveryMode, EventHandler, EventHandlerFactory, EventType, HookwireError, ProtocolEvent,
    SessionContext, TenantInfo, WebhookDelivery,
};

use crate::classify::{Disposition, classify, presence_state, receipt_state};
use crate::media;
use crate::payload::WebhookPayload;
use crate::queue::DeliveryQueue;

struct PipelineInner {
    auth: Arc<AuthCache>,
    queue: DeliveryQueue,
    files_root: PathBuf,
    public_base_url: String,
}

/// Turns protocol events into webhook deliveries. Cheap to clone.
#[derive(Clone)]
pub struct EventPipeline {
    inner: Arc<PipelineInner>,
}

impl EventPipeline {
    /// `public_base_url` is the externally reachable base under which
    /// `/files` is served; a trailing slash is ignored.
    pub fn new(
        auth: Arc<AuthCache>,
        queue: DeliveryQueue,
        files_root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            inner: Arc::new(PipelineInner {
                auth,
                queue,
                files_root: files_root.into(),
                public_base_url,
            }),
        }
    }

    pub fn files_root(&self) -> &Path {
        &self.inner.files_root
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.inner.queue
    }

    /// Sends an API-initiated event (`Disconnected`, `LoggedOut`) with an
    /// empty body, subject to the same subscription and webhook checks as
    /// protocol events. Returns whether a delivery was queued.
    pub fn notify(&self, info: &TenantInfo, event_type: EventType) -> bool {
        let payload = WebhookPayload::new(event_type, Value::Object(Default::default()));
        self.dispatch(info, &payload, None)
    }

    /// Public URL of a file inside a tenant's directory.
    pub fn file_url(&self, info: &TenantInfo, file_name: &str) -> String {
        format!(
            "{}/files/user_{}/{}",
            self.inner.public_base_url, info.id, file_name
        )
    }

    fn dispatch(
        &self,
        info: &TenantInfo,
        payload: &WebhookPayload,
        attachment: Option<PathBuf>,
    ) -> bool {
        let event_type = payload.event_type;
        if !info.subscriptions.contains(event_type) {
            debug!(tenant_id = %info.id, %event_type, "not subscribed, skipping webhook");
            return false;
        }
        if !info.has_webhook() {
            warn!(tenant_id = %info.id, %event_type, "no webhook set for tenant");
            return false;
        }

        let json_data = match payload.to_filtered_value() {
            Ok(value) => value.to_string(),
            Err(e) => {
                error!(tenant_id = %info.id, %event_type, error = %e, "failed to encode webhook payload");
                return false;
            }
        };

        let attachment = attachment.and_then(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            Some((path, name))
        });
        let mode = match attachment {
            Some((file_path, name)) => DeliveryMode::FileReference {
                file_url: self.file_url(info, &name),
                file_path,
            },
            None => DeliveryMode::Form,
        };

        info!(tenant_id = %info.id, %event_type, url = %info.webhook, "queueing webhook");
        self.inner.queue.enqueue(WebhookDelivery {
            tenant: info.id,
            url: info.webhook.clone(),
            token: info.token.clone(),
            event_type,
            json_data,
            mode,
            proxy_url: info.proxy_url.clone(),
        })
    }
}

impl EventHandlerFactory for EventPipeline {
    fn handler_for(&self, ctx: SessionContext) -> Arc<dyn EventHandler> {
        Arc::new(SessionEventHandler {
            ctx,
            pipeline: self.clone(),
        })
    }
}

/// Per-session event handler.
pub struct SessionEventHandler {
    ctx: SessionContext,
    pipeline: EventPipeline,
}

/// The `data` half of an adjacently tagged event, or `{}` for unit events.
fn event_body(event: &ProtocolEvent) -> Result<Value, HookwireError> {
    let mut value = serde_json::to_value(event)
        .map_err(|e| HookwireError::Internal(format!("failed to encode event: {e}")))?;
    Ok(value
        .get_mut("data")
        .map(Value::take)
        .unwrap_or_else(|| Value::Object(Default::default())))
}

impl SessionEventHandler {
    async fn apply_state(&self, event: &ProtocolEvent) {
        let tenant = self.ctx.tenant;
        let store = self.pipeline.inner.auth.store();
        match event {
            ProtocolEvent::Connected | ProtocolEvent::PushNameSetting => {
                self.mark_available().await;
                if let Err(e) = store.set_connected(tenant, true).await {
                    error!(tenant_id = %tenant, error = %e, "failed to persist connected flag");
                }
            }
            ProtocolEvent::AppStateSyncComplete { name } if name == CRITICAL_APP_STATE => {
                self.mark_available().await;
            }
            ProtocolEvent::AppStateSyncComplete { name } => {
                debug!(tenant_id = %tenant, name, "app state sync complete");
            }
            ProtocolEvent::PairSuccess {
                id,
                business_name,
                platform,
            } => {
                info!(tenant_id = %tenant, jid = %id, business_name, platform, "pair success");
                if let Err(e) = self
                    .pipeline
                    .inner
                    .auth
                    .set_identity(tenant, &self.ctx.token, Some(id))
                    .await
                {
                    error!(tenant_id = %tenant, error = %e, "failed to persist linked identity");
                }
            }
            ProtocolEvent::LoggedOut { reason, .. } => {
                info!(tenant_id = %tenant, reason = reason.as_deref().unwrap_or(""), "logged out remotely");
                if !self.ctx.control.kill() {
                    debug!(tenant_id = %tenant, "controller already gone");
                }
                if let Err(e) = store.set_connected(tenant, false).await {
                    error!(tenant_id = %tenant, error = %e, "failed to persist connected flag");
                }
                if let Err(e) = self
                    .pipeline
                    .inner
                    .auth
                    .set_identity(tenant, &self.ctx.token, None)
                    .await
                {
                    error!(tenant_id = %tenant, error = %e, "failed to clear linked identity");
                }
            }
            other => debug!(tenant_id = %tenant, event = other.name(), "no state effect"),
        }
    }

    /// Sends an available presence if the account has a push name.
    async fn mark_available(&self) {
        let Some(client) = self.ctx.client() else {
            return;
        };
        if !client.push_name().is_some_and(|name| !name.is_empty()) {
            return;
        }
        match client.send_presence_available().await {
            Ok(()) => info!(tenant_id = %self.ctx.tenant, "marked self as available"),
            Err(e) => warn!(tenant_id = %self.ctx.tenant, error = %e, "failed to send available presence"),
        }
    }

    /// Builds the payload for a deliverable event, persisting any files it carries.
    async fn build(
        &self,
        event_type: EventType,
        event: &ProtocolEvent,
    ) -> Result<(WebhookPayload, Option<PathBuf>), HookwireError> {
        let mut payload = WebhookPayload::new(event_type, event_body(event)?);
        let mut attachment = None;

        match event {
            ProtocolEvent::Message(message) => {
                info!(
                    tenant_id = %self.ctx.tenant,
                    id = %message.info.id,
                    chat = %message.info.chat,
                    sender = %message.info.sender,
                    "message received"
                );
                if let Some(media_ref) = &message.media {
                    let client = self.ctx.client().ok_or(HookwireError::NoSession)?;
                    let dir =
                        media::ensure_tenant_dir(self.pipeline.files_root(), self.ctx.tenant)
                            .await?;
                    let bytes = client.download(media_ref).await?;
                    let path =
                        media::save_attachment(&dir, &message.info.id, media_ref, &bytes).await?;
                    payload.base64 = Some(STANDARD.encode(&bytes));
                    payload.mime_type = Some(media_ref.mime_type.clone());
                    payload.file_name = path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .map(str::to_string);
                    attachment = Some(path);
                }
            }
            ProtocolEvent::Receipt(receipt) => {
                if let Some(state) = receipt_state(receipt) {
                    payload = payload.with_state(state);
                }
            }
            ProtocolEvent::Presence(presence) => {
                payload = payload.with_state(presence_state(presence));
            }
            ProtocolEvent::HistorySync { data } => {
                let dir =
                    media::ensure_tenant_dir(self.pipeline.files_root(), self.ctx.tenant).await?;
                let path = media::dump_history(&dir, data).await?;
                info!(tenant_id = %self.ctx.tenant, path = %path.display(), "wrote history sync");
            }
            _ => {}
        }

        Ok((payload, attachment))
    }
}

#[async_trait]
impl EventHandler for SessionEventHandler {
    async fn handle(&self, event: ProtocolEvent) {
        let tenant = self.ctx.tenant;
        match classify(&event) {
            Disposition::StateOnly => self.apply_state(&event).await,
            Disposition::LogOnly => info!(tenant_id = %tenant, event = event.name(), "event received"),
            Disposition::Unhandled => warn!(tenant_id = %tenant, event = event.name(), "unhandled event"),
            Disposition::Deliver(event_type) => {
                let (payload, attachment) = match self.build(event_type, &event).await {
                    Ok(built) => built,
                    Err(e) => {
                        error!(tenant_id = %tenant, %event_type, error = %e, "failed to process event");
                        return;
                    }
                };
                let info = match self.pipeline.inner.auth.resolve(&self.ctx.token).await {
                    Ok(info) => info,
                    Err(e) => {
                        warn!(tenant_id = %tenant, error = %e, "no tenant for session token, dropping webhook");
                        return;
                    }
                };
                self.pipeline.dispatch(&info, &payload, attachment);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookwire_config::model::DeliveryConfig;
    use hookwire_core::{ProtocolClient, SessionControl};
    use hookwire_test_utils::{InMemoryTenantStore, MockProtocolClient, RecordingSink};
    use tokio::sync::mpsc;

    #[test]
    fn event_body_unwraps_adjacent_data() {
        let body = event_body(&ProtocolEvent::AppStateSyncComplete {
            name: "regular".into(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"name": "regular"}));
        assert_eq!(
            event_body(&ProtocolEvent::Connected).unwrap(),
            serde_json::json!({})
        );
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn unhandled_events_are_logged_at_warn() {
        let store = Arc::new(InMemoryTenantStore::new());
        let tenant = store.insert("acme", "abc");
        let auth = Arc::new(AuthCache::new(store));
        let (queue, _handle) =
            DeliveryQueue::start(Arc::new(RecordingSink::new()), &DeliveryConfig::default());
        let pipeline = EventPipeline::new(auth, queue, "files", "http://localhost:8080");

        let client: Arc<dyn ProtocolClient> = Arc::new(MockProtocolClient::new(tenant.id, true));
        let (tx, _rx) = mpsc::channel(1);
        let handler = pipeline.handler_for(SessionContext {
            tenant: tenant.id,
            token: "abc".into(),
            client: Arc::downgrade(&client),
            control: SessionControl::new(tenant.id, tx),
        });

        handler
            .handle(ProtocolEvent::Unknown {
                name: "Blocklist".into(),
            })
            .await;
        assert!(logs_contain("unhandled event"));
        assert_eq!(pipeline.queue().pending(), 0);
    }

    #[tokio::test]
    async fn critical_app_state_sync_marks_available() {
        let store = Arc::new(InMemoryTenantStore::new());
        let tenant = store.insert("acme", "abc");
        let auth = Arc::new(AuthCache::new(store));
        let (queue, _handle) =
            DeliveryQueue::start(Arc::new(RecordingSink::new()), &DeliveryConfig::default());
        let pipeline = EventPipeline::new(auth, queue, "files", "http://localhost:8080");

        let mock = Arc::new(MockProtocolClient::new(tenant.id, true));
        mock.set_push_name(Some("Acme"));
        let client: Arc<dyn ProtocolClient> = mock.clone();
        let (tx, _rx) = mpsc::channel(1);
        let handler = pipeline.handler_for(SessionContext {
            tenant: tenant.id,
            token: "abc".into(),
            client: Arc::downgrade(&client),
            control: SessionControl::new(tenant.id, tx),
        });

        handler
            .handle(ProtocolEvent::AppStateSyncComplete {
                name: "regular_low".into(),
            })
            .await;
        assert_eq!(mock.call_count("send_presence_available"), 0);
        handler
            .handle(ProtocolEvent::AppStateSyncComplete {
                name: CRITICAL_APP_STATE.into(),
            })
            .await;
        assert_eq!(mock.call_count("send_presence_available"), 1);
    }
}
