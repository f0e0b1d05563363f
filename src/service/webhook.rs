use super::{
    payment::{by_reference, find_gateway_row},
    Service,
};
use crate::{now, Error};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use entity::{payment, webhook_event};
use payment_gateway::{EventKind, Provider};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter, Set};
use tracing::{info, warn};

#[derive(thiserror::Error, Debug)]
pub enum WebhookError {
    #[error("No signature")]
    MissingSignature,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid JSON")]
    InvalidJson,
    #[error("{0}")]
    Processing(String),
    #[error("Internal error")]
    Internal(Error),
}

impl From<Error> for WebhookError {
    fn from(err: Error) -> Self {
        match err {
            Error::DbErr(_) | Error::Io(_) => WebhookError::Internal(err),
            _ => WebhookError::Processing(err.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for WebhookError {
    fn from(err: sea_orm::DbErr) -> Self {
        WebhookError::Internal(err.into())
    }
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain")
            .body(self.to_string())
    }
}

pub const WEBHOOK_OK: &str = "OK";
pub const WEBHOOK_DUPLICATE: &str = "Duplicate event ignored";

impl Service {
    /// Verify, record and apply one provider webhook delivery.
    /// Every event is applied at most once per gateway, reference and event type.
    pub async fn process_webhook(
        &self,
        provider: Provider,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<&'static str, WebhookError> {
        let signature = match signature {
            Some(s) if !s.trim().is_empty() => s,
            _ => {
                warn!(gateway = %provider, "webhook without signature");
                return Err(WebhookError::MissingSignature);
            }
        };
        let (_, gateway) = self
            .gateway(Some(provider))
            .map_err(|_| WebhookError::Processing("Gateway not configured".to_owned()))?;
        if !gateway.verify_webhook(body, signature) {
            warn!(gateway = %provider, "webhook signature mismatch");
            return Err(WebhookError::InvalidSignature);
        }
        let event = gateway.parse_webhook(body).map_err(|e| {
            warn!(gateway = %provider, error = %e, "webhook payload is not json");
            WebhookError::InvalidJson
        })?;
        let reference = event
            .reference
            .clone()
            .ok_or_else(|| WebhookError::Processing("Missing reference".to_owned()))?;

        let row = find_gateway_row(self.db(), provider)
            .await?
            .ok_or_else(|| WebhookError::Processing("Gateway not configured".to_owned()))?;

        let record = match webhook_event::Entity::find()
            .filter(webhook_event::Column::GatewayId.eq(row.id))
            .filter(webhook_event::Column::Reference.eq(reference.clone()))
            .filter(webhook_event::Column::EventType.eq(event.event.clone()))
            .one(self.db())
            .await?
        {
            Some(record) => record,
            None => {
                let inserted = webhook_event::ActiveModel {
                    id: NotSet,
                    gateway_id: Set(row.id),
                    event_type: Set(event.event.clone()),
                    reference: Set(reference.clone()),
                    payload: Set(event.raw.to_string()),
                    processed: Set(false),
                    processed_at: Set(None),
                    created_at: Set(now() as i64),
                }
                .insert(self.db())
                .await;
                match inserted {
                    Ok(record) => record,
                    // a concurrent delivery inserted it first
                    Err(_) => webhook_event::Entity::find()
                        .filter(webhook_event::Column::GatewayId.eq(row.id))
                        .filter(webhook_event::Column::Reference.eq(reference.clone()))
                        .filter(webhook_event::Column::EventType.eq(event.event.clone()))
                        .one(self.db())
                        .await?
                        .ok_or_else(|| {
                            WebhookError::Internal(Error::Str("webhook event vanished"))
                        })?,
                }
            }
        };
        if record.processed {
            info!(gateway = %provider, %reference, event = %event.event, "duplicate webhook");
            return Ok(WEBHOOK_DUPLICATE);
        }

        match event.kind {
            EventKind::ChargeSuccess => {
                let payment = by_reference(&reference, payment::Type::Funding)
                    .filter(payment::Column::GatewayId.eq(row.id))
                    .one(self.db())
                    .await?
                    .ok_or_else(|| {
                        WebhookError::Processing(format!("Payment {} not found", reference))
                    })?;
                let paid = event.amount.unwrap_or(payment.amount);
                if paid != payment.amount {
                    warn!(
                        %reference,
                        expected = payment.amount,
                        paid,
                        "funding amount mismatch, crediting paid amount"
                    );
                }
                self.complete_funding(&payment, paid, &event.raw).await?;
            }
            EventKind::TransferSuccess | EventKind::TransferFailed => {
                let payment = by_reference(&reference, payment::Type::Withdrawal)
                    .filter(payment::Column::GatewayId.eq(row.id))
                    .one(self.db())
                    .await?
                    .ok_or_else(|| {
                        WebhookError::Processing(format!("Withdrawal {} not found", reference))
                    })?;
                if event.kind == EventKind::TransferSuccess {
                    self.complete_withdrawal(&payment, &event.raw).await?;
                } else {
                    self.fail_withdrawal(&payment, &event.raw).await?;
                }
            }
            EventKind::Other => {
                info!(gateway = %provider, event = %event.event, "unhandled webhook event");
                return Ok(WEBHOOK_OK);
            }
        }

        webhook_event::Entity::update_many()
            .set(webhook_event::ActiveModel {
                processed: Set(true),
                processed_at: Set(Some(now() as i64)),
                ..Default::default()
            })
            .filter(webhook_event::Column::Id.eq(record.id))
            .filter(webhook_event::Column::Processed.eq(false))
            .exec(self.db())
            .await?;
        info!(gateway = %provider, %reference, event = %event.event, "webhook processed");
        Ok(WEBHOOK_OK)
    }
}
