#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::contact::Contact;
use crate::file::{ClientFileView, FileRecord};
use crate::workorder::WorkOrderId;
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const HUB_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

pub const HUB_MESSAGE_BODY_MAX_LEN: usize = 4000;

fn validate_id(field: &'static str, value: &str, max_len: usize) -> Result<(), ContractViolation> {
    if value.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if value.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    Ok(())
}

/// Tri-state Hub outcome. `NoClient` (no client to converse with) is a
/// distinct state from `Denied` and the two must never be conflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubAccess {
    NoClient,
    Denied,
    Granted,
}

impl HubAccess {
    pub fn as_str(self) -> &'static str {
        match self {
            HubAccess::NoClient => "no_client",
            HubAccess::Denied => "denied",
            HubAccess::Granted => "granted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct HubMessageId(String);

impl HubMessageId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        validate_id("hub_message_id", &v, 128)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HubMessageId {
    type Error = ContractViolation;

    fn try_from(v: String) -> Result<Self, ContractViolation> {
        HubMessageId::new(v)
    }
}

impl Validate for HubMessageId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("hub_message_id", &self.0, 128)
    }
}

/// A message in the work order's shared channel. `sender_company_name` is
/// present exactly when the sender is a client contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubMessage {
    pub schema_version: SchemaVersion,
    pub message_id: HubMessageId,
    pub work_order_id: WorkOrderId,
    pub sender_actor_id: ActorId,
    pub sender_display_name: String,
    pub sender_company_name: Option<String>,
    pub body: String,
    pub posted_at: MonotonicTimeNs,
}

impl HubMessage {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        message_id: HubMessageId,
        work_order_id: WorkOrderId,
        sender_actor_id: ActorId,
        sender_display_name: impl Into<String>,
        sender_company_name: Option<String>,
        body: impl Into<String>,
        posted_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let message = Self {
            schema_version: HUB_CONTRACT_VERSION,
            message_id,
            work_order_id,
            sender_actor_id,
            sender_display_name: sender_display_name.into(),
            sender_company_name,
            body: body.into(),
            posted_at,
        };
        message.validate()?;
        Ok(message)
    }
}

impl Validate for HubMessage {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != HUB_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "hub_message.schema_version",
                reason: "must match HUB_CONTRACT_VERSION",
            });
        }
        self.message_id.validate()?;
        self.work_order_id.validate()?;
        self.sender_actor_id.validate()?;
        validate_id("hub_message.sender_display_name", &self.sender_display_name, 120)?;
        if let Some(company) = &self.sender_company_name {
            validate_id("hub_message.sender_company_name", company, 120)?;
        }
        validate_id("hub_message.body", &self.body, HUB_MESSAGE_BODY_MAX_LEN)?;
        if self.posted_at.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "hub_message.posted_at",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Everything the Hub can surface for one work order, before per-item
/// visibility filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HubPayload {
    pub files: Vec<FileRecord>,
    pub contacts: Vec<Contact>,
    pub messages: Vec<HubMessage>,
}

/// The payload after client-side filtering: files projected, contacts
/// reduced to the exposed set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientHubPayload {
    pub files: Vec<ClientFileView>,
    pub contacts: Vec<Contact>,
    pub messages: Vec<HubMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_hub_01_message_body_must_be_non_empty() {
        let out = HubMessage::v1(
            HubMessageId::new("msg_1").unwrap(),
            WorkOrderId::new("wo_1").unwrap(),
            ActorId::new("actor_1").unwrap(),
            "Sam Okafor",
            None,
            "   ",
            MonotonicTimeNs(5),
        );
        assert!(out.is_err());
    }

    #[test]
    fn at_hub_02_access_tri_state_tokens_are_distinct() {
        assert_eq!(HubAccess::NoClient.as_str(), "no_client");
        assert_eq!(HubAccess::Denied.as_str(), "denied");
        assert_eq!(HubAccess::Granted.as_str(), "granted");
    }
}
