//! Fixed field projection of a message, used for filtering and viewing.
//!
//! The projection is an explicitly-declared struct rather than dynamic field
//! access: filter expressions are compiled against this schema, so an
//! unknown field name is a setup-time error instead of a runtime surprise.

use crate::message::Delivery;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::SecondsFormat;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

#[cfg(test)]
#[path = "fields_tests.rs"]
mod tests;

/// Message body projected for human viewing: UTF-8 text when valid,
/// otherwise the raw bytes (rendered as base64 in JSON).
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Text(String),
    Binary(Vec<u8>),
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Body::Text(text) => serializer.serialize_str(text),
            Body::Binary(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        }
    }
}

/// The fixed projection of a [`Delivery`].
///
/// Serializes to one JSON object with camelCase keys; unset fields are
/// omitted entirely. `body` is viewable but deliberately not filterable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageFields {
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub headers: Map<String, Value>,
    #[serde(rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "contentEncoding", skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(rename = "deliveryMode", skip_serializing_if = "Option::is_none")]
    pub delivery_mode: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(rename = "correlationID", skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(rename = "replyTo", skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    #[serde(rename = "messageID", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// RFC 3339 timestamp with nanosecond precision, trailing zeros trimmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "appID", skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub redelivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(rename = "routingKey", skip_serializing_if = "Option::is_none")]
    pub routing_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
}

/// Names of the fields filter expressions may reference. `body` is excluded.
pub const FILTERABLE_FIELDS: &[&str] = &[
    "headers",
    "contentType",
    "contentEncoding",
    "deliveryMode",
    "priority",
    "correlationID",
    "replyTo",
    "expiration",
    "messageID",
    "timestamp",
    "type",
    "userID",
    "appID",
    "redelivered",
    "exchange",
    "routingKey",
];

impl MessageFields {
    pub fn from_delivery(delivery: &Delivery) -> Self {
        let props = &delivery.properties;

        let body = if delivery.body.is_empty() {
            None
        } else {
            Some(match std::str::from_utf8(&delivery.body) {
                Ok(text) => Body::Text(text.to_string()),
                Err(_) => Body::Binary(delivery.body.to_vec()),
            })
        };

        Self {
            headers: delivery.headers.clone(),
            content_type: non_empty(props.content_type.as_deref()),
            content_encoding: non_empty(props.content_encoding.as_deref()),
            delivery_mode: non_zero(props.delivery_mode),
            priority: non_zero(props.priority),
            correlation_id: non_empty(props.correlation_id.as_deref()),
            reply_to: non_empty(props.reply_to.as_deref()),
            expiration: non_empty(props.expiration.as_deref()),
            message_id: non_empty(props.message_id.as_deref()),
            timestamp: props
                .timestamp
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            kind: non_empty(props.kind.as_deref()),
            user_id: non_empty(props.user_id.as_deref()),
            app_id: non_empty(props.app_id.as_deref()),
            redelivered: delivery.redelivered,
            exchange: non_empty(Some(&delivery.exchange)),
            routing_key: non_empty(Some(&delivery.routing_key)),
            body,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn non_zero(value: u8) -> Option<u8> {
    (value != 0).then_some(value)
}
