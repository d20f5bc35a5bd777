//! One function per OS endpoint.
//!
//! Every call is a direct translation to an HTTP verb and path. Responses
//! are returned as received; decoding is left to the caller.

use std::sync::Arc;

use serde::Serialize;

use super::client::{ApiClient, ClientError};
use crate::domain::{
    EntityId, ExportRequest, ListParams, OsStatus, OwnerAssignment, ReportFormat, StatusChange,
    TagRequest, TransferRequest,
};
use crate::ports::HttpResponse;

const OS: &str = "os";

type ApiResult = Result<HttpResponse, ClientError>;

/// Stateless service-order endpoint set.
#[derive(Clone)]
pub struct OsService {
    client: Arc<ApiClient>,
}

impl OsService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// `GET /os?prefeitura_id=..&{params}`
    pub async fn list(&self, prefeitura_id: &EntityId, params: &ListParams) -> ApiResult {
        let mut query = vec![("prefeitura_id".to_string(), prefeitura_id.to_string())];
        query.extend(params.pairs().iter().cloned());
        self.client.get(&[OS], &query).await
    }

    /// `GET /os/{id}`
    pub async fn get_by_id(&self, id: &EntityId) -> ApiResult {
        self.client.get(&[OS, id.as_str()], &[]).await
    }

    /// `POST /os`
    pub async fn create<T: Serialize + ?Sized>(&self, data: &T) -> ApiResult {
        self.client.post(&[OS], data).await
    }

    /// `PUT /os/{id}`
    pub async fn update<T: Serialize + ?Sized>(&self, id: &EntityId, data: &T) -> ApiResult {
        self.client.put(&[OS, id.as_str()], data).await
    }

    /// `DELETE /os/{id}`
    pub async fn delete(&self, id: &EntityId) -> ApiResult {
        self.client.delete(&[OS, id.as_str()]).await
    }

    /// `PATCH /os/{id}/status`
    pub async fn change_status(
        &self,
        id: &EntityId,
        status: OsStatus,
        reason: &str,
        user_id: &EntityId,
    ) -> ApiResult {
        let body = StatusChange {
            status,
            reason: reason.to_string(),
            user_id: user_id.clone(),
        };
        self.client.patch(&[OS, id.as_str(), "status"], &body).await
    }

    /// `PATCH /os/{id}/responsavel`
    pub async fn assign_owner(
        &self,
        id: &EntityId,
        owner_id: &EntityId,
        user_id: &EntityId,
    ) -> ApiResult {
        let body = OwnerAssignment {
            owner_id: owner_id.clone(),
            user_id: user_id.clone(),
        };
        self.client
            .patch(&[OS, id.as_str(), "responsavel"], &body)
            .await
    }

    /// `GET /os/status/{status}?prefeitura_id=..`
    pub async fn list_by_status(&self, status: OsStatus, prefeitura_id: &EntityId) -> ApiResult {
        self.client
            .get(&[OS, "status", status.as_str()], &prefeitura_query(prefeitura_id))
            .await
    }

    /// `GET /os/responsavel/{id}`
    pub async fn list_by_owner(&self, owner_id: &EntityId) -> ApiResult {
        self.client
            .get(&[OS, "responsavel", owner_id.as_str()], &[])
            .await
    }

    /// `GET /os/{id}/historico`
    pub async fn history(&self, id: &EntityId) -> ApiResult {
        self.client.get(&[OS, id.as_str(), "historico"], &[]).await
    }

    /// `POST /os/{id}/tags`
    pub async fn add_tag(&self, id: &EntityId, tag: &str) -> ApiResult {
        let body = TagRequest {
            tag: tag.to_string(),
        };
        self.client.post(&[OS, id.as_str(), "tags"], &body).await
    }

    /// `DELETE /os/{id}/tags/{tag}`, tag percent-encoded.
    pub async fn remove_tag(&self, id: &EntityId, tag: &str) -> ApiResult {
        self.client.delete(&[OS, id.as_str(), "tags", tag]).await
    }

    /// `GET /os/prioridade/{level}?prefeitura_id=..`
    pub async fn list_by_priority(&self, level: i32, prefeitura_id: &EntityId) -> ApiResult {
        let level = level.to_string();
        self.client
            .get(&[OS, "prioridade", &level], &prefeitura_query(prefeitura_id))
            .await
    }

    /// `POST /os/{id}/transferir`
    pub async fn transfer(
        &self,
        id: &EntityId,
        new_municipality_id: &EntityId,
        reason: &str,
        user_id: &EntityId,
    ) -> ApiResult {
        let body = TransferRequest {
            new_municipality_id: new_municipality_id.clone(),
            reason: reason.to_string(),
            user_id: user_id.clone(),
        };
        self.client
            .post(&[OS, id.as_str(), "transferir"], &body)
            .await
    }

    /// `GET /os/estatisticas?prefeitura_id=..`
    pub async fn statistics(&self, prefeitura_id: &EntityId) -> ApiResult {
        self.client
            .get(&[OS, "estatisticas"], &prefeitura_query(prefeitura_id))
            .await
    }

    /// `POST /os/relatorio/exportar`. The response body is binary.
    pub async fn export_report(
        &self,
        prefeitura_id: &EntityId,
        format: ReportFormat,
        filters: serde_json::Map<String, serde_json::Value>,
    ) -> ApiResult {
        let body = ExportRequest {
            prefeitura_id: prefeitura_id.clone(),
            format,
            filters,
        };
        self.client
            .post(&[OS, "relatorio", "exportar"], &body)
            .await
    }
}

fn prefeitura_query(prefeitura_id: &EntityId) -> [(String, String); 1] {
    [("prefeitura_id".to_string(), prefeitura_id.to_string())]
}
