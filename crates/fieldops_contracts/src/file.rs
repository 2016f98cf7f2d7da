#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;
use crate::workorder::WorkOrderId;
use crate::{ContractViolation, SchemaVersion, Validate};

pub const FILE_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

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
pub struct FileId(String);

impl FileId {
    pub fn new(v: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = v.into();
        validate_id("file_id", &v, 128)?;
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FileId {
    type Error = ContractViolation;

    fn try_from(v: String) -> Result<Self, ContractViolation> {
        FileId::new(v)
    }
}

impl Validate for FileId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("file_id", &self.0, 128)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Photo,
    Document,
    Invoice,
    Report,
    Other,
}

impl FileCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FileCategory::Photo => "photo",
            FileCategory::Document => "document",
            FileCategory::Invoice => "invoice",
            FileCategory::Report => "report",
            FileCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub schema_version: SchemaVersion,
    pub file_id: FileId,
    pub work_order_id: WorkOrderId,
    pub visible_to_client: bool,
    pub category: FileCategory,
    pub uploaded_by: ActorId,
    pub display_name: String,
}

impl FileRecord {
    pub fn v1(
        file_id: FileId,
        work_order_id: WorkOrderId,
        visible_to_client: bool,
        category: FileCategory,
        uploaded_by: ActorId,
        display_name: impl Into<String>,
    ) -> Result<Self, ContractViolation> {
        let record = Self {
            schema_version: FILE_CONTRACT_VERSION,
            file_id,
            work_order_id,
            visible_to_client,
            category,
            uploaded_by,
            display_name: display_name.into(),
        };
        record.validate()?;
        Ok(record)
    }
}

impl Validate for FileRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != FILE_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "file_record.schema_version",
                reason: "must match FILE_CONTRACT_VERSION",
            });
        }
        self.file_id.validate()?;
        self.work_order_id.validate()?;
        self.uploaded_by.validate()?;
        validate_id("file_record.display_name", &self.display_name, 200)?;
        Ok(())
    }
}

/// The projection handed to client-facing callers. Uploader identity and the
/// visibility flag itself stay internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFileView {
    pub file_id: FileId,
    pub display_name: String,
    pub category: FileCategory,
}
