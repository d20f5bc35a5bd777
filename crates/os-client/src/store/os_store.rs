//! Client-side cache of service orders.
//!
//! The store mirrors server resources: it never owns authoritative state,
//! it only replaces its copies with whatever the server returns. Every
//! action follows the same shape: set `loading`, clear the error, call the
//! service, reconcile on success, record a message on failure. `loading`
//! is reset by a drop guard, so it is cleared on every exit path including
//! a cancelled future.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::events::StoreEvent;
use crate::api::{ClientError, OsService};
use crate::domain::{
    EntityId, ListParams, NewServiceOrder, OrderFilters, OrderUpdate, OsEvent, OsStatus,
    ReportFormat, ServiceOrder,
};
use crate::ports::HttpResponse;

/// Capacity of the change-notification channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Observable state of the store.
#[derive(Debug, Default, Clone)]
struct StoreState {
    orders: Vec<ServiceOrder>,
    loading: bool,
    error: Option<String>,
    current: Option<ServiceOrder>,
    filters: OrderFilters,
}

impl StoreState {
    /// Replace the cached copy of `order` and the current order if they
    /// share its id. Returns whether the collection held it.
    fn replace(&mut self, order: &ServiceOrder, events: &broadcast::Sender<StoreEvent>) -> bool {
        let found = match self.orders.iter_mut().find(|o| o.id == order.id) {
            Some(slot) => {
                *slot = order.clone();
                true
            }
            None => {
                debug!(id = %order.id, "updated order not in local collection, list left unchanged");
                false
            }
        };

        if self.current.as_ref().is_some_and(|c| c.id == order.id) {
            self.current = Some(order.clone());
            emit(events, StoreEvent::CurrentChanged(Some(order.id.clone())));
        }
        if found {
            emit(events, StoreEvent::OrderUpdated(order.id.clone()));
        }
        found
    }

    fn remove(&mut self, id: &EntityId, events: &broadcast::Sender<StoreEvent>) {
        let before = self.orders.len();
        self.orders.retain(|o| &o.id != id);
        if self.orders.len() != before {
            emit(events, StoreEvent::OrderRemoved(id.clone()));
        }

        if self.current.as_ref().is_some_and(|c| &c.id == id) {
            self.current = None;
            emit(events, StoreEvent::CurrentChanged(None));
        }
    }
}

fn emit(events: &broadcast::Sender<StoreEvent>, event: StoreEvent) {
    // No subscribers is fine.
    let _ = events.send(event);
}

/// Guard around one store action.
struct Action<'a> {
    state: &'a mut StoreState,
    events: &'a broadcast::Sender<StoreEvent>,
}

impl<'a> Action<'a> {
    fn begin(state: &'a mut StoreState, events: &'a broadcast::Sender<StoreEvent>) -> Self {
        state.loading = true;
        emit(events, StoreEvent::Loading(true));
        if state.error.take().is_some() {
            emit(events, StoreEvent::ErrorChanged(None));
        }
        Self { state, events }
    }

    /// Record `err` as the user-facing message and log the original.
    fn fail(&mut self, what: &str, fallback: &str, err: &ClientError) {
        error!(error = %err, "{}", what);
        let message = err.to_string();
        let message = if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        };
        self.state.error = Some(message.clone());
        emit(self.events, StoreEvent::ErrorChanged(Some(message)));
    }
}

impl Drop for Action<'_> {
    fn drop(&mut self) {
        self.state.loading = false;
        emit(self.events, StoreEvent::Loading(false));
    }
}

fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ClientError> {
    response.json().map_err(ClientError::Decode)
}

/// Decode a collection body. The backend sends `null` for an empty one.
fn decode_list<T: DeserializeOwned>(response: HttpResponse) -> Result<Vec<T>, ClientError> {
    decode::<Option<Vec<T>>>(response).map(Option::unwrap_or_default)
}

/// Reactive service-order store.
pub struct OsStore {
    service: OsService,
    state: StoreState,
    events: broadcast::Sender<StoreEvent>,
}

impl OsStore {
    pub fn new(service: OsService) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            service,
            state: StoreState::default(),
            events,
        }
    }

    /// Receive every change made from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn service(&self) -> &OsService {
        &self.service
    }

    // === State ===

    pub fn orders(&self) -> &[ServiceOrder] {
        &self.state.orders
    }

    pub fn loading(&self) -> bool {
        self.state.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn current(&self) -> Option<&ServiceOrder> {
        self.state.current.as_ref()
    }

    pub fn filters(&self) -> &OrderFilters {
        &self.state.filters
    }

    // === Derived views ===

    pub fn orders_with_status(&self, status: OsStatus) -> Vec<&ServiceOrder> {
        self.state
            .orders
            .iter()
            .filter(|o| o.status == status)
            .collect()
    }

    pub fn open_orders(&self) -> Vec<&ServiceOrder> {
        self.orders_with_status(OsStatus::Aberta)
    }

    pub fn in_progress_orders(&self) -> Vec<&ServiceOrder> {
        self.orders_with_status(OsStatus::EmAndamento)
    }

    pub fn completed_orders(&self) -> Vec<&ServiceOrder> {
        self.orders_with_status(OsStatus::Concluida)
    }

    /// All orders, most urgent first. Ties keep collection order; the
    /// collection itself is not reordered.
    pub fn orders_by_priority(&self) -> Vec<&ServiceOrder> {
        let mut sorted: Vec<&ServiceOrder> = self.state.orders.iter().collect();
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
        sorted
    }

    // === Filters ===

    /// Merge the set fields of `patch` into the current filters.
    pub fn set_filters(&mut self, patch: OrderFilters) {
        self.state.filters.merge(patch);
        emit(&self.events, StoreEvent::FiltersChanged);
    }

    pub fn clear_filters(&mut self) {
        self.state.filters = OrderFilters::default();
        emit(&self.events, StoreEvent::FiltersChanged);
    }

    pub fn clear_error(&mut self) {
        if self.state.error.take().is_some() {
            emit(&self.events, StoreEvent::ErrorChanged(None));
        }
    }

    pub fn clear_current(&mut self) {
        if self.state.current.take().is_some() {
            emit(&self.events, StoreEvent::CurrentChanged(None));
        }
    }

    // === Actions ===

    /// Replace the collection with the municipality's orders.
    ///
    /// Failures are recorded in [`error`](Self::error) and not returned.
    pub async fn fetch_orders(&mut self, prefeitura_id: &EntityId, params: &ListParams) {
        let mut action = Action::begin(&mut self.state, &self.events);
        let result = match self.service.list(prefeitura_id, params).await {
            Ok(response) => decode_list::<ServiceOrder>(response),
            Err(e) => Err(e),
        };

        match result {
            Ok(orders) => {
                let count = orders.len();
                action.state.orders = orders;
                emit(action.events, StoreEvent::OrdersReplaced { count });
            }
            Err(e) => {
                action.fail("failed to fetch orders", "failed to load service orders", &e);
                warn!(prefeitura_id = %prefeitura_id, "order list left as it was");
            }
        }
    }

    /// [`fetch_orders`](Self::fetch_orders) using the current filters.
    ///
    /// The selected municipality wins over `default_prefeitura`.
    pub async fn fetch_filtered(&mut self, default_prefeitura: &EntityId) {
        let prefeitura = self
            .state
            .filters
            .municipality
            .clone()
            .unwrap_or_else(|| default_prefeitura.clone());
        let params = self.state.filters.to_list_params();
        self.fetch_orders(&prefeitura, &params).await;
    }

    /// Load one order and make it current.
    pub async fn fetch_by_id(&mut self, id: &EntityId) -> Result<ServiceOrder, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        let result = match self.service.get_by_id(id).await {
            Ok(response) => decode::<ServiceOrder>(response),
            Err(e) => Err(e),
        };

        match result {
            Ok(order) => {
                action.state.current = Some(order.clone());
                emit(action.events, StoreEvent::CurrentChanged(Some(order.id.clone())));
                Ok(order)
            }
            Err(e) => {
                action.fail("failed to fetch order", "failed to load service order", &e);
                Err(e)
            }
        }
    }

    /// Create an order and prepend the server's copy.
    pub async fn create(&mut self, data: &NewServiceOrder) -> Result<ServiceOrder, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        let result = match self.service.create(data).await {
            Ok(response) => decode::<ServiceOrder>(response),
            Err(e) => Err(e),
        };

        match result {
            Ok(order) => {
                action.state.orders.insert(0, order.clone());
                emit(action.events, StoreEvent::OrderAdded(order.id.clone()));
                Ok(order)
            }
            Err(e) => {
                action.fail("failed to create order", "failed to create service order", &e);
                Err(e)
            }
        }
    }

    pub async fn update(
        &mut self,
        id: &EntityId,
        data: &OrderUpdate,
    ) -> Result<ServiceOrder, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        let result = match self.service.update(id, data).await {
            Ok(response) => decode::<ServiceOrder>(response),
            Err(e) => Err(e),
        };

        match result {
            Ok(order) => {
                action.state.replace(&order, action.events);
                Ok(order)
            }
            Err(e) => {
                action.fail("failed to update order", "failed to update service order", &e);
                Err(e)
            }
        }
    }

    pub async fn change_status(
        &mut self,
        id: &EntityId,
        status: OsStatus,
        reason: &str,
        user_id: &EntityId,
    ) -> Result<ServiceOrder, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        let result = match self.service.change_status(id, status, reason, user_id).await {
            Ok(response) => decode::<ServiceOrder>(response),
            Err(e) => Err(e),
        };

        match result {
            Ok(order) => {
                action.state.replace(&order, action.events);
                Ok(order)
            }
            Err(e) => {
                action.fail("failed to change status", "failed to change status", &e);
                Err(e)
            }
        }
    }

    /// Delete an order. The request is sent even if the id is not cached.
    pub async fn delete(&mut self, id: &EntityId) -> Result<(), ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        match self.service.delete(id).await {
            Ok(_) => {
                action.state.remove(id, action.events);
                Ok(())
            }
            Err(e) => {
                action.fail("failed to delete order", "failed to delete service order", &e);
                Err(e)
            }
        }
    }

    pub async fn assign_owner(
        &mut self,
        id: &EntityId,
        owner_id: &EntityId,
        user_id: &EntityId,
    ) -> Result<Option<ServiceOrder>, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        match self.service.assign_owner(id, owner_id, user_id).await {
            Ok(response) => Ok(reconcile_returned(&mut action, response)),
            Err(e) => {
                action.fail("failed to assign owner", "failed to assign owner", &e);
                Err(e)
            }
        }
    }

    pub async fn add_tag(
        &mut self,
        id: &EntityId,
        tag: &str,
    ) -> Result<Option<ServiceOrder>, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        match self.service.add_tag(id, tag).await {
            Ok(response) => Ok(reconcile_returned(&mut action, response)),
            Err(e) => {
                action.fail("failed to add tag", "failed to add tag", &e);
                Err(e)
            }
        }
    }

    pub async fn remove_tag(
        &mut self,
        id: &EntityId,
        tag: &str,
    ) -> Result<Option<ServiceOrder>, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        match self.service.remove_tag(id, tag).await {
            Ok(response) => Ok(reconcile_returned(&mut action, response)),
            Err(e) => {
                action.fail("failed to remove tag", "failed to remove tag", &e);
                Err(e)
            }
        }
    }

    pub async fn transfer(
        &mut self,
        id: &EntityId,
        new_municipality_id: &EntityId,
        reason: &str,
        user_id: &EntityId,
    ) -> Result<Option<ServiceOrder>, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        match self
            .service
            .transfer(id, new_municipality_id, reason, user_id)
            .await
        {
            Ok(response) => Ok(reconcile_returned(&mut action, response)),
            Err(e) => {
                action.fail("failed to transfer order", "failed to transfer service order", &e);
                Err(e)
            }
        }
    }

    /// Load an order's history; also refreshes the current order's copy.
    pub async fn fetch_history(&mut self, id: &EntityId) -> Result<Vec<OsEvent>, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        let result = match self.service.history(id).await {
            Ok(response) => decode_list::<OsEvent>(response),
            Err(e) => Err(e),
        };

        match result {
            Ok(history) => {
                if let Some(current) = action.state.current.as_mut().filter(|c| &c.id == id) {
                    current.history = history.clone();
                    emit(action.events, StoreEvent::CurrentChanged(Some(id.clone())));
                }
                Ok(history)
            }
            Err(e) => {
                action.fail("failed to fetch history", "failed to load history", &e);
                Err(e)
            }
        }
    }

    pub async fn fetch_by_status(
        &mut self,
        status: OsStatus,
        prefeitura_id: &EntityId,
    ) -> Result<usize, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        let result = self.service.list_by_status(status, prefeitura_id).await;
        replace_all(&mut action, result, "failed to fetch orders by status")
    }

    pub async fn fetch_by_owner(&mut self, owner_id: &EntityId) -> Result<usize, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        let result = self.service.list_by_owner(owner_id).await;
        replace_all(&mut action, result, "failed to fetch orders by owner")
    }

    pub async fn fetch_by_priority(
        &mut self,
        level: i32,
        prefeitura_id: &EntityId,
    ) -> Result<usize, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        let result = self.service.list_by_priority(level, prefeitura_id).await;
        replace_all(&mut action, result, "failed to fetch orders by priority")
    }

    /// Aggregate counters for a municipality, as returned by the server.
    pub async fn fetch_statistics(
        &mut self,
        prefeitura_id: &EntityId,
    ) -> Result<serde_json::Value, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        let result = match self.service.statistics(prefeitura_id).await {
            Ok(response) => decode::<serde_json::Value>(response),
            Err(e) => Err(e),
        };

        result.inspect_err(|e| {
            action.fail("failed to fetch statistics", "failed to load statistics", e)
        })
    }

    /// Export a report; returns the binary document.
    pub async fn export_report(
        &mut self,
        prefeitura_id: &EntityId,
        format: ReportFormat,
        filters: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Bytes, ClientError> {
        let mut action = Action::begin(&mut self.state, &self.events);
        match self
            .service
            .export_report(prefeitura_id, format, filters)
            .await
        {
            Ok(response) => Ok(response.body),
            Err(e) => {
                action.fail("failed to export report", "failed to export report", &e);
                Err(e)
            }
        }
    }
}

/// Reconcile a mutation whose response may or may not carry the order.
fn reconcile_returned(action: &mut Action<'_>, response: HttpResponse) -> Option<ServiceOrder> {
    match response.json::<ServiceOrder>() {
        Ok(order) => {
            action.state.replace(&order, action.events);
            Some(order)
        }
        Err(_) => {
            debug!("mutation response carried no order, cache left unchanged");
            None
        }
    }
}

fn replace_all(
    action: &mut Action<'_>,
    result: Result<HttpResponse, ClientError>,
    what: &str,
) -> Result<usize, ClientError> {
    match result.and_then(decode_list::<ServiceOrder>) {
        Ok(orders) => {
            let count = orders.len();
            action.state.orders = orders;
            emit(action.events, StoreEvent::OrdersReplaced { count });
            Ok(count)
        }
        Err(e) => {
            action.fail(what, "failed to load service orders", &e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryTokenStorage, MockTransport, RecordingNavigator};
    use crate::api::ApiClient;
    use crate::config::AppConfig;
    use crate::ports::TransportError;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn store() -> (OsStore, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let client = ApiClient::new(
            &AppConfig::default(),
            transport.clone(),
            Arc::new(MemoryTokenStorage::new()),
            Arc::new(RecordingNavigator::new()),
        )
        .unwrap();
        (OsStore::new(OsService::new(Arc::new(client))), transport)
    }

    async fn seeded(orders: serde_json::Value) -> (OsStore, Arc<MockTransport>) {
        let (mut store, transport) = store();
        transport.push_json(200, orders);
        store.fetch_orders(&EntityId::from("p-1"), &ListParams::new()).await;
        assert!(store.error().is_none());
        (store, transport)
    }

    fn ids(orders: &[&ServiceOrder]) -> Vec<String> {
        orders.iter().map(|o| o.id.to_string()).collect()
    }

    #[tokio::test]
    async fn test_fetch_orders_replaces_collection() {
        let (store, _) = seeded(json!([
            {"id": 1, "status": "aberta"},
            {"id": 2, "status": "concluida"}
        ]))
        .await;

        assert_eq!(store.orders().len(), 2);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn test_fetch_orders_swallows_errors() {
        let (mut store, transport) = seeded(json!([{"id": 1}])).await;
        transport.push_json(500, json!({"error": "db down"}));

        store.fetch_orders(&EntityId::from("p-1"), &ListParams::new()).await;

        assert!(!store.loading());
        assert!(store.error().unwrap().contains("db down"));
        assert_eq!(store.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_null_bodies_and_null_collections_are_empty() {
        let (mut store, transport) = seeded(json!([
            {"id": 1, "status": "aberta", "historico": null, "tags": null},
            {"id": 2, "historico": null, "tags": ["via"]}
        ]))
        .await;
        assert_eq!(store.orders().len(), 2);
        assert!(store.orders()[0].history.is_empty());
        assert!(store.orders()[1].has_tag("via"));

        transport.push_json(200, json!({"id": 1, "historico": null, "tags": null}));
        store.fetch_by_id(&EntityId::from(1u64)).await.unwrap();
        transport.push_json(200, json!(null));
        let history = store.fetch_history(&EntityId::from(1u64)).await.unwrap();
        assert!(history.is_empty());
        assert!(store.error().is_none());

        transport.push_json(200, json!(null));
        store.fetch_orders(&EntityId::from("p-1"), &ListParams::new()).await;
        assert!(store.error().is_none());
        assert!(store.orders().is_empty());

        transport.push_json(200, json!(null));
        assert_eq!(
            store
                .fetch_by_status(OsStatus::Aberta, &EntityId::from("p-1"))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_create_prepends() {
        let (mut store, transport) = seeded(json!([{"id": 1}])).await;
        transport.push_json(201, json!({"id": 42, "status": "aberta", "descricao": "pothole"}));

        let created = store
            .create(&NewServiceOrder {
                description: "pothole".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.id, EntityId::from(42u64));
        assert_eq!(store.orders()[0].id, EntityId::from(42u64));
        assert_eq!(store.orders().len(), 2);
    }

    #[tokio::test]
    async fn test_update_replaces_in_place_and_current() {
        let (mut store, transport) = seeded(json!([{"id": 1}, {"id": 2}, {"id": 3}])).await;
        transport.push_json(200, json!({"id": 2, "titulo": "old"}));
        store.fetch_by_id(&EntityId::from(2u64)).await.unwrap();

        let payload = json!({"id": 2, "titulo": "new", "prioridade": 5});
        transport.push_json(200, payload.clone());
        let update = OrderUpdate {
            title: Some("new".into()),
            ..Default::default()
        };
        store.update(&EntityId::from(2u64), &update).await.unwrap();

        let expected: ServiceOrder = serde_json::from_value(payload).unwrap();
        assert_eq!(store.orders()[1], expected);
        assert_eq!(store.current(), Some(&expected));
        assert_eq!(store.orders().len(), 3);
    }

    #[tokio::test]
    async fn test_update_of_unknown_id_leaves_collection() {
        let (mut store, transport) = seeded(json!([{"id": 1}])).await;
        transport.push_json(200, json!({"id": 99, "titulo": "elsewhere"}));

        store
            .update(&EntityId::from(99u64), &OrderUpdate::default())
            .await
            .unwrap();

        assert_eq!(store.orders().len(), 1);
        assert_eq!(store.orders()[0].id, EntityId::from(1u64));
    }

    #[tokio::test]
    async fn test_change_status_reconciles() {
        let (mut store, transport) = seeded(json!([{"id": 1, "status": "aberta"}])).await;
        transport.push_json(200, json!({"id": 1, "status": "em_andamento"}));

        store
            .change_status(&EntityId::from(1u64), OsStatus::EmAndamento, "iniciado", &EntityId::from("u"))
            .await
            .unwrap();

        assert!(store.open_orders().is_empty());
        assert_eq!(store.in_progress_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_and_clears_current() {
        let (mut store, transport) = seeded(json!([{"id": 1}, {"id": 2}])).await;
        transport.push_json(200, json!({"id": 1}));
        store.fetch_by_id(&EntityId::from(1u64)).await.unwrap();

        transport.push_json(204, json!(null));
        store.delete(&EntityId::from(1u64)).await.unwrap();

        assert_eq!(store.orders().len(), 1);
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn test_delete_absent_id_still_calls_transport() {
        let (mut store, transport) = seeded(json!([{"id": 1}])).await;
        let before = transport.requests().len();
        transport.push_json(204, json!(null));

        store.delete(&EntityId::from(77u64)).await.unwrap();

        assert_eq!(transport.requests().len(), before + 1);
        assert_eq!(transport.last_request().unwrap().url.path(), "/api/v1/os/77");
        assert_eq!(store.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_resets_loading_and_sets_error() {
        let (mut store, transport) = seeded(json!([{"id": 1}])).await;
        transport.push_error(TransportError::Timeout(Duration::from_secs(10)));
        transport.push_json(404, json!({"error": "not found"}));
        transport.push_json(422, json!({"message": "invalid"}));

        assert!(store.create(&NewServiceOrder::default()).await.is_err());
        assert!(!store.loading());
        assert!(store.error().is_some());

        assert!(store.delete(&EntityId::from(1u64)).await.is_err());
        assert!(!store.loading());
        assert_eq!(store.error(), Some("request failed with status code 404: not found"));
        assert_eq!(store.orders().len(), 1);

        assert!(store
            .change_status(&EntityId::from(1u64), OsStatus::Concluida, "", &EntityId::from("u"))
            .await
            .is_err());
        assert!(!store.loading());
        assert!(store.error().unwrap().contains("invalid"));
    }

    #[tokio::test]
    async fn test_next_action_clears_previous_error() {
        let (mut store, transport) = seeded(json!([])).await;
        transport.push_json(500, json!({}));
        let _ = store.fetch_by_id(&EntityId::from(1u64)).await;
        assert!(store.error().is_some());

        transport.push_json(200, json!({"id": 1}));
        store.fetch_by_id(&EntityId::from(1u64)).await.unwrap();
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_decode_failure_is_recorded() {
        let (mut store, transport) = store();
        transport.push_json(200, json!({"no_id": true}));

        let err = store.fetch_by_id(&EntityId::from(1u64)).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(store.error().unwrap().starts_with("failed to parse response"));
    }

    #[tokio::test]
    async fn test_derived_views() {
        let (store, _) = seeded(json!([
            {"id": 1, "status": "aberta", "prioridade": 2},
            {"id": 2, "status": "em_andamento", "prioridade": 5},
            {"id": 3, "status": "concluida", "prioridade": 1},
            {"id": 4, "status": "aberta", "prioridade": 5}
        ]))
        .await;

        assert_eq!(ids(&store.open_orders()), ["1", "4"]);
        assert_eq!(ids(&store.in_progress_orders()), ["2"]);
        assert_eq!(ids(&store.completed_orders()), ["3"]);
        assert_eq!(ids(&store.orders_by_priority()), ["2", "4", "1", "3"]);
        // Sorting is a view: the collection keeps server order.
        assert_eq!(store.orders()[0].id, EntityId::from(1u64));
    }

    #[tokio::test]
    async fn test_filters_merge_and_clear() {
        let (mut store, _) = store();
        store.set_filters(OrderFilters {
            status: Some(OsStatus::Aberta),
            ..Default::default()
        });
        store.set_filters(OrderFilters {
            priority: Some(4),
            municipality: Some(EntityId::from("p-2")),
            ..Default::default()
        });
        assert_eq!(store.filters().status, Some(OsStatus::Aberta));
        assert_eq!(store.filters().priority, Some(4));

        store.clear_filters();
        assert_eq!(store.filters(), &OrderFilters::default());
        store.clear_filters();
        assert!(store.filters().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_filtered_uses_selected_municipality() {
        let (mut store, transport) = store();
        store.set_filters(OrderFilters {
            status: Some(OsStatus::Concluida),
            municipality: Some(EntityId::from("p-2")),
            ..Default::default()
        });
        transport.push_json(200, json!([]));

        store.fetch_filtered(&EntityId::from("p-1")).await;

        assert_eq!(
            transport.last_request().unwrap().url.query(),
            Some("prefeitura_id=p-2&status=concluida")
        );
    }

    #[tokio::test]
    async fn test_tag_mutations_reconcile_when_order_returned() {
        let (mut store, transport) = seeded(json!([{"id": 7, "tags": []}])).await;
        transport.push_json(200, json!({"id": 7, "tags": ["urgent#1"]}));
        transport.push_json(204, json!(null));

        let returned = store.add_tag(&EntityId::from(7u64), "urgent#1").await.unwrap();
        assert!(returned.is_some());
        assert!(store.orders()[0].has_tag("urgent#1"));

        let returned = store.remove_tag(&EntityId::from(7u64), "urgent#1").await.unwrap();
        assert!(returned.is_none());
        assert!(transport
            .last_request()
            .unwrap()
            .url
            .path()
            .ends_with("/tags/urgent%231"));
    }

    #[tokio::test]
    async fn test_history_refreshes_current() {
        let (mut store, transport) = store();
        transport.push_json(200, json!({"id": 3}));
        store.fetch_by_id(&EntityId::from(3u64)).await.unwrap();

        transport.push_json(200, json!([{"id": "e1", "tipo": "status_alterado", "descricao": "x"}]));
        let history = store.fetch_history(&EntityId::from(3u64)).await.unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(store.current().unwrap().history.len(), 1);
    }

    #[tokio::test]
    async fn test_list_variants_rethrow() {
        let (mut store, transport) = store();
        transport.push_json(200, json!([{"id": 1}, {"id": 2}]));
        assert_eq!(store.fetch_by_owner(&EntityId::from("u-1")).await.unwrap(), 2);

        transport.push_json(503, json!({}));
        assert!(store
            .fetch_by_priority(5, &EntityId::from("p-1"))
            .await
            .is_err());
        assert_eq!(store.orders().len(), 2);
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn test_events_are_published() {
        let (mut store, transport) = store();
        let mut rx = store.subscribe();
        transport.push_json(201, json!({"id": 42}));

        store.create(&NewServiceOrder::default()).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                StoreEvent::Loading(true),
                StoreEvent::OrderAdded(EntityId::from(42u64)),
                StoreEvent::Loading(false),
            ]
        );
    }

    struct HangingTransport;

    #[async_trait::async_trait]
    impl crate::ports::HttpTransport for HangingTransport {
        async fn send(
            &self,
            _request: crate::ports::HttpRequest,
        ) -> Result<HttpResponse, TransportError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_action_clears_loading() {
        let client = ApiClient::new(
            &AppConfig::default(),
            Arc::new(HangingTransport),
            Arc::new(MemoryTokenStorage::new()),
            Arc::new(RecordingNavigator::new()),
        )
        .unwrap();
        let mut store = OsStore::new(OsService::new(Arc::new(client)));
        let prefeitura = EntityId::from("p-1");
        let params = ListParams::new();

        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            store.fetch_orders(&prefeitura, &params),
        )
        .await;

        assert!(outcome.is_err());
        assert!(!store.loading());
    }
}
