//! Request bodies and query parameters for the OS endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{EntityId, OsStatus};

/// Body of `POST /os`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewServiceOrder {
    #[serde(rename = "titulo", default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(rename = "descricao", default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "localizacao", default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(rename = "prioridade", default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(rename = "prefeitura_id", default, skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<EntityId>,
    #[serde(rename = "solicitante_id", default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Body of `PUT /os/{id}`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    #[serde(rename = "titulo", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "descricao", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "localizacao", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "prioridade", default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Body of `PATCH /os/{id}/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusChange {
    pub status: OsStatus,
    #[serde(rename = "motivo")]
    pub reason: String,
    #[serde(rename = "usuario_id")]
    pub user_id: EntityId,
}

/// Body of `PATCH /os/{id}/responsavel`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerAssignment {
    #[serde(rename = "responsavel_id")]
    pub owner_id: EntityId,
    #[serde(rename = "usuario_id")]
    pub user_id: EntityId,
}

/// Body of `POST /os/{id}/tags`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagRequest {
    pub tag: String,
}

/// Body of `POST /os/{id}/transferir`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRequest {
    #[serde(rename = "nova_prefeitura_id")]
    pub new_municipality_id: EntityId,
    #[serde(rename = "motivo")]
    pub reason: String,
    #[serde(rename = "usuario_id")]
    pub user_id: EntityId,
}

/// Output format of the exported report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Csv,
    Xlsx,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Csv => "csv",
            ReportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Body of `POST /os/relatorio/exportar`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub prefeitura_id: EntityId,
    #[serde(rename = "formato")]
    pub format: ReportFormat,
    #[serde(rename = "filtros")]
    pub filters: serde_json::Map<String, serde_json::Value>,
}

/// Extra query parameters of the list endpoint.
///
/// Pairs are appended after `prefeitura_id` in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pairs: Vec<(String, String)>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary query pair.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    /// Page size.
    pub fn limit(self, limit: u32) -> Self {
        self.with("limit", limit)
    }

    /// Page offset.
    pub fn offset(self, offset: u32) -> Self {
        self.with("offset", offset)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<(String, String)> for ListParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}
