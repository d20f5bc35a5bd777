//! Service order ("Ordem de Serviço") models as exchanged with the backend.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use super::EntityId;

/// Lifecycle status of a service order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OsStatus {
    #[default]
    Aberta,
    EmAndamento,
    Concluida,
    Transferida,
    Cancelada,
    EmAnalise,
}

impl OsStatus {
    pub const ALL: [OsStatus; 6] = [
        OsStatus::Aberta,
        OsStatus::EmAndamento,
        OsStatus::Concluida,
        OsStatus::Transferida,
        OsStatus::Cancelada,
        OsStatus::EmAnalise,
    ];

    /// Wire representation, also used as a path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            OsStatus::Aberta => "aberta",
            OsStatus::EmAndamento => "em_andamento",
            OsStatus::Concluida => "concluida",
            OsStatus::Transferida => "transferida",
            OsStatus::Cancelada => "cancelada",
            OsStatus::EmAnalise => "em_analise",
        }
    }

    /// Whether the order is in a terminal state.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            OsStatus::Concluida | OsStatus::Cancelada | OsStatus::Transferida
        )
    }
}

impl fmt::Display for OsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OsStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OsStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Service level agreement attached to an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sla {
    pub id: EntityId,
    #[serde(rename = "tempo_limite")]
    pub deadline: DateTime<Utc>,
    #[serde(rename = "tempo_alerta")]
    pub alert_at: DateTime<Utc>,
    #[serde(rename = "prioridade", default)]
    pub priority: i32,
    #[serde(rename = "descricao", default)]
    pub description: String,
}

/// An entry of an order's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsEvent {
    pub id: EntityId,
    #[serde(rename = "os_id", default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<EntityId>,
    #[serde(rename = "tipo", default)]
    pub kind: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "usuario_id", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    #[serde(rename = "data_criacao", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// A service order as cached on the client.
///
/// Only `id` is mandatory on the wire; the server is authoritative and the
/// client replaces its copy wholesale on every mutating response. List
/// endpoints send `null` for empty `tags` and `historico`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOrder {
    pub id: EntityId,
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(default)]
    pub status: OsStatus,
    /// 1-5, where 5 is the most urgent.
    #[serde(rename = "prioridade", default)]
    pub priority: i32,
    #[serde(rename = "localizacao", default)]
    pub location: String,
    #[serde(rename = "responsavel_id", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<EntityId>,
    #[serde(rename = "prefeitura_id", default, skip_serializing_if = "Option::is_none")]
    pub municipality_id: Option<EntityId>,
    #[serde(rename = "solicitante_id", default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<EntityId>,
    #[serde(rename = "data_criacao", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "data_atualizacao", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "data_conclusao", default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sla: Option<Sla>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(rename = "historico", default)]
    pub history: Vec<OsEvent>,
}

impl ServiceOrder {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Whether the SLA deadline has passed at `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_closed() && self.sla.as_ref().is_some_and(|sla| sla.deadline < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_minimal_payload_decodes() {
        let os: ServiceOrder =
            serde_json::from_value(serde_json::json!({"id": 42, "status": "aberta"})).unwrap();
        assert_eq!(os.id, EntityId::from(42u64));
        assert_eq!(os.status, OsStatus::Aberta);
        assert!(os.tags.is_empty());
        assert!(os.history.is_empty());
    }

    #[test]
    fn test_backend_field_names() {
        let os: ServiceOrder = serde_json::from_value(serde_json::json!({
            "id": "8d3b6f2e-0000-0000-0000-000000000001",
            "titulo": "Buraco na via",
            "descricao": "pothole",
            "status": "em_andamento",
            "prioridade": 4,
            "localizacao": "Rua A, 100",
            "responsavel_id": "u-1",
            "prefeitura_id": "p-1",
            "tags": ["via", "urgente"],
            "historico": [{"id": "e-1", "tipo": "status_alterado", "descricao": "x"}]
        }))
        .unwrap();

        assert_eq!(os.title, "Buraco na via");
        assert_eq!(os.priority, 4);
        assert_eq!(os.owner_id, Some(EntityId::from("u-1")));
        assert_eq!(os.history[0].kind, "status_alterado");
        assert!(os.has_tag("urgente"));
    }

    #[test]
    fn test_null_collections_decode_as_empty() {
        let orders: Vec<ServiceOrder> = serde_json::from_str(
            r#"[{"id":"a","tags":null,"historico":null},{"id":"b","tags":["x"]}]"#,
        )
        .unwrap();

        assert!(orders[0].tags.is_empty());
        assert!(orders[0].history.is_empty());
        assert!(orders[1].has_tag("x"));
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in OsStatus::ALL {
            assert_eq!(status.as_str().parse::<OsStatus>().unwrap(), status);
        }
        assert!("fechada".parse::<OsStatus>().is_err());
        assert_eq!(OsStatus::EmAnalise.to_string(), "em_analise");
    }

    #[test]
    fn test_overdue_only_for_open_orders() {
        let deadline = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut os: ServiceOrder =
            serde_json::from_value(serde_json::json!({"id": 1})).unwrap();
        os.sla = Some(Sla {
            id: EntityId::from("sla-1"),
            deadline,
            alert_at: deadline,
            priority: 3,
            description: String::new(),
        });

        let later = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert!(os.is_overdue(later));

        os.status = OsStatus::Concluida;
        assert!(!os.is_overdue(later));
    }
}
