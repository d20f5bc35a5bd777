//! Client-side filter selection for the order list.

use serde::{Deserialize, Serialize};

use super::{EntityId, ListParams, OsStatus};

/// Currently selected list filters. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFilters {
    pub status: Option<OsStatus>,
    #[serde(rename = "prioridade")]
    pub priority: Option<i32>,
    #[serde(rename = "responsavel")]
    pub owner: Option<EntityId>,
    #[serde(rename = "prefeitura")]
    pub municipality: Option<EntityId>,
}

impl OrderFilters {
    /// Overwrite every field that is set in `patch`; leave the rest.
    pub fn merge(&mut self, patch: OrderFilters) {
        if patch.status.is_some() {
            self.status = patch.status;
        }
        if patch.priority.is_some() {
            self.priority = patch.priority;
        }
        if patch.owner.is_some() {
            self.owner = patch.owner;
        }
        if patch.municipality.is_some() {
            self.municipality = patch.municipality;
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Query parameters for the list endpoint.
    ///
    /// The municipality travels as the mandatory `prefeitura_id` argument
    /// of the list call, so it is not repeated here.
    pub fn to_list_params(&self) -> ListParams {
        let mut params = ListParams::new();
        if let Some(status) = self.status {
            params = params.with("status", status);
        }
        if let Some(priority) = self.priority {
            params = params.with("prioridade", priority);
        }
        if let Some(owner) = &self.owner {
            params = params.with("responsavel_id", owner);
        }
        params
    }
}
