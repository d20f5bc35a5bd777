//! Domain models for the service-order client.

mod filters;
mod ids;
mod order;
mod requests;

pub use filters::OrderFilters;
pub use ids::EntityId;
pub use order::{OsEvent, OsStatus, ServiceOrder, Sla, UnknownStatus};
pub use requests::{
    ExportRequest, ListParams, NewServiceOrder, OrderUpdate, OwnerAssignment, ReportFormat,
    StatusChange, TagRequest, TransferRequest,
};
