#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::{ContractViolation, SchemaVersion, Validate};

pub const ACTOR_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

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
pub struct ActorId(String);

impl ActorId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        validate_id("actor_id", &v, 64)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ActorId {
    type Error = ContractViolation;

    fn try_from(v: String) -> Result<Self, ContractViolation> {
        ActorId::new(v)
    }
}

impl Validate for ActorId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("actor_id", &self.0, 64)
    }
}

/// Closed role set. Unrecognized stored role strings parse to `Unknown`,
/// which every permission query rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Role {
    Admin,
    OfficeStaff,
    Technician,
    ClientContact,
    Unknown,
}

impl From<String> for Role {
    fn from(v: String) -> Role {
        Role::parse(&v)
    }
}

impl Role {
    pub fn parse(v: &str) -> Role {
        match v {
            "admin" => Role::Admin,
            "office_staff" => Role::OfficeStaff,
            "technician" => Role::Technician,
            "client_contact" => Role::ClientContact,
            _ => Role::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::OfficeStaff => "office_staff",
            Role::Technician => "technician",
            Role::ClientContact => "client_contact",
            Role::Unknown => "unknown",
        }
    }

    pub fn is_internal_staff(self) -> bool {
        matches!(self, Role::Admin | Role::OfficeStaff | Role::Technician)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub schema_version: SchemaVersion,
    pub actor_id: ActorId,
    pub role: Role,
    pub is_active: bool,
    pub display_name: String,
}

impl Actor {
    pub fn v1(
        actor_id: ActorId,
        role: Role,
        is_active: bool,
        display_name: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let actor = Self {
            schema_version: ACTOR_CONTRACT_VERSION,
            actor_id,
            role,
            is_active,
            display_name: display_name.into(),
        };
        actor.validate()?;
        Ok(actor)
    }
}

impl Validate for Actor {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != ACTOR_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "actor.schema_version",
                reason: "must match ACTOR_CONTRACT_VERSION",
            });
        }
        self.actor_id.validate()?;
        validate_id("actor.display_name", &self.display_name, 120)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_actor_01_unrecognized_role_parses_to_unknown() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("office_staff"), Role::OfficeStaff);
        assert_eq!(Role::parse("superuser"), Role::Unknown);
        assert_eq!(Role::parse(""), Role::Unknown);
    }

    #[test]
    fn at_actor_02_empty_display_name_is_rejected() {
        let out = Actor::v1(
            ActorId::new("actor_1").unwrap(),
            Role::Technician,
            true,
            "  ",
        );
        assert!(out.is_err());
    }

    #[test]
    fn at_actor_03_stored_role_strings_deserialize_fail_closed() {
        let role: Role = serde_json::from_str("\"technician\"").unwrap();
        assert_eq!(role, Role::Technician);
        // A role value this build has never heard of lands on Unknown
        // instead of failing the whole record.
        let role: Role = serde_json::from_str("\"regional_manager\"").unwrap();
        assert_eq!(role, Role::Unknown);
    }

    #[test]
    fn at_actor_04_actor_id_length_is_bounded() {
        let out = ActorId::new("a".repeat(65));
        assert!(matches!(
            out,
            Err(ContractViolation::InvalidValue {
                field: "actor_id",
                reason: "exceeds max length",
            })
        ));
    }
}
