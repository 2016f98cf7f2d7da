#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::{ContractViolation, SchemaVersion, Validate};

pub const CONTACT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

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

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ContactId(String);

impl ContactId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        validate_id("contact_id", &v, 64)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContactId {
    type Error = ContractViolation;

    fn try_from(v: String) -> Result<Self, ContractViolation> {
        ContactId::new(v)
    }
}

impl Validate for ContactId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("contact_id", &self.0, 64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ClientId(String);

impl ClientId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        validate_id("client_id", &v, 64)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = ContractViolation;

    fn try_from(v: String) -> Result<Self, ContractViolation> {
        ClientId::new(v)
    }
}

impl Validate for ClientId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("client_id", &self.0, 64)
    }
}

/// A client-side person record. `portal_actor_id` is present only when the
/// contact has portal access; a portal-less contact has no login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub schema_version: SchemaVersion,
    pub contact_id: ContactId,
    pub client_id: ClientId,
    pub display_name: String,
    pub company_name: String,
    pub portal_actor_id: Option<ActorId>,
}

impl Contact {
    pub fn v1(
        contact_id: ContactId,
        client_id: ClientId,
        display_name: impl Into<String>,
        company_name: impl Into<String>,
        portal_actor_id: Option<ActorId>,
    ) -> Result<Self, ContractViolation> {
        let contact = Self {
            schema_version: CONTACT_CONTRACT_VERSION,
            contact_id,
            client_id,
            display_name: display_name.into(),
            company_name: company_name.into(),
            portal_actor_id,
        };
        contact.validate()?;
        Ok(contact)
    }
}

impl Validate for Contact {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != CONTACT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "contact.schema_version",
                reason: "must match CONTACT_CONTRACT_VERSION",
            });
        }
        self.contact_id.validate()?;
        self.client_id.validate()?;
        validate_id("contact.display_name", &self.display_name, 120)?;
        validate_id("contact.company_name", &self.company_name, 120)?;
        if let Some(actor_id) = &self.portal_actor_id {
            actor_id.validate()?;
        }
        Ok(())
    }
}
