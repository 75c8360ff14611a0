#![forbid(unsafe_code)]

use super::entity::{EntityHeader, PayloadRow, VersionedEntity};
use super::{CreateWebhookRequest, SqliteStore, StoreConfig, StoreError};
use gw_core::RequestContext;
use gw_core::model::{Pagination, Parent, Webhook, decode_triggers, encode_triggers};
use rusqlite::types::Value;

impl VersionedEntity for Webhook {
    const TABLE: &'static str = "webhooks";
    const PREFIX: &'static str = "webhook";
    const PAYLOAD_COLUMNS: &'static [&'static str] =
        &["url", "secret", "enabled", "insecure", "triggers"];

    fn header(&self) -> EntityHeader {
        EntityHeader {
            id: self.id,
            version: self.version,
            parent: self.parent,
            created_by: self.created_by,
            created: self.created,
            updated: self.updated,
        }
    }

    fn set_header(&mut self, header: EntityHeader) {
        self.id = header.id;
        self.version = header.version;
        self.parent = header.parent;
        self.created_by = header.created_by;
        self.created = header.created;
        self.updated = header.updated;
    }

    fn payload_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.url.clone()),
            Value::from(self.secret.clone()),
            Value::from(self.enabled),
            Value::from(self.insecure),
            Value::from(encode_triggers(&self.triggers)),
        ]
    }

    fn from_row(
        header: EntityHeader,
        payload: PayloadRow<'_, '_>,
        config: &StoreConfig,
    ) -> Result<Self, StoreError> {
        let raw_triggers: String = payload.get(4)?;
        let decoded = decode_triggers(&raw_triggers);
        if !decoded.unknown.is_empty() {
            if config.strict_triggers {
                return Err(StoreError::CorruptRow {
                    table: Self::TABLE,
                    id: header.id,
                    reason: format!("unknown triggers: {}", decoded.unknown.join(",")),
                });
            }
            tracing::warn!(
                webhook_id = header.id,
                unknown = ?decoded.unknown,
                "ignoring unknown webhook triggers"
            );
        }

        Ok(Webhook {
            id: header.id,
            version: header.version,
            parent: header.parent,
            created_by: header.created_by,
            created: header.created,
            updated: header.updated,
            url: payload.get(0)?,
            secret: payload.get(1)?,
            enabled: payload.get(2)?,
            insecure: payload.get(3)?,
            triggers: decoded.triggers,
        })
    }
}

impl SqliteStore {
    pub fn find_webhook(&self, ctx: &RequestContext, id: i64) -> Result<Webhook, StoreError> {
        self.find(ctx, id)
    }

    pub fn create_webhook(
        &self,
        ctx: &RequestContext,
        request: CreateWebhookRequest,
    ) -> Result<Webhook, StoreError> {
        let parent = Parent::from_columns(request.repo_id, request.space_id)?;
        let mut hook = Webhook {
            id: 0,
            version: 0,
            parent,
            created_by: request.created_by,
            created: 0,
            updated: 0,
            url: request.url,
            secret: request.secret,
            enabled: request.enabled,
            insecure: request.insecure,
            triggers: request.triggers,
        };
        self.create(ctx, &mut hook)?;
        Ok(hook)
    }

    pub fn update_webhook(&self, ctx: &RequestContext, hook: &mut Webhook) -> Result<(), StoreError> {
        self.update(ctx, hook)
    }

    pub fn delete_webhook(&self, ctx: &RequestContext, id: i64) -> Result<(), StoreError> {
        self.delete::<Webhook>(ctx, id)
    }

    pub fn list_webhooks(
        &self,
        ctx: &RequestContext,
        parent: Parent,
        pagination: Pagination,
    ) -> Result<Vec<Webhook>, StoreError> {
        self.list(ctx, parent, pagination)
    }

    pub fn count_webhooks(&self, ctx: &RequestContext, parent: Parent) -> Result<i64, StoreError> {
        self.count::<Webhook>(ctx, parent)
    }
}
