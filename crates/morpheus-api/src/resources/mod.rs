//! Concrete resource interfaces.
//!
//! Plain CRUD resources are just a [`ResourceKind`]; resources with extra
//! endpoints get a small wrapper type.

pub mod account;
pub mod archives;
pub mod auth;
pub mod instances;

use crate::dispatcher::Dispatcher;
use crate::resource::{ResourceInterface, ResourceKind};

pub use account::AccountInterface;
pub use archives::ArchivesInterface;
pub use auth::{AuthInterface, TokenGrant};
pub use instances::InstancesInterface;

/// Groups.
pub const GROUPS: ResourceKind = ResourceKind {
    path: "/api/groups",
    singular: "group",
    plural: "groups",
};

/// Clouds. The API still calls them zones.
pub const CLOUDS: ResourceKind = ResourceKind {
    path: "/api/zones",
    singular: "zone",
    plural: "zones",
};

/// Instances.
pub const INSTANCES: ResourceKind = ResourceKind {
    path: "/api/instances",
    singular: "instance",
    plural: "instances",
};

/// Group interface on `dispatcher`.
#[must_use]
pub fn groups(dispatcher: &Dispatcher) -> ResourceInterface<'_> {
    ResourceInterface::new(dispatcher, GROUPS)
}

/// Cloud interface on `dispatcher`.
#[must_use]
pub fn clouds(dispatcher: &Dispatcher) -> ResourceInterface<'_> {
    ResourceInterface::new(dispatcher, CLOUDS)
}
