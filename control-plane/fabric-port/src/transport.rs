use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumString};

macro_rules! fabric_impl_string_id {
    ($Name:ident, $Doc:literal) => {
        #[doc = $Doc]
        #[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Hash)]
        pub struct $Name(String);

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl $Name {
            /// Get the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
            /// Build Self from anything string-like.
            pub fn from<T: Into<String>>(id: T) -> Self {
                $Name(id.into())
            }
            /// Generate a new random identifier.
            pub fn new() -> Self {
                $Name(uuid::Uuid::new_v4().to_string())
            }
        }

        impl Default for $Name {
            /// Generates a blank identifier.
            fn default() -> Self {
                $Name(uuid::Uuid::default().to_string())
            }
        }

        impl From<&str> for $Name {
            fn from(id: &str) -> Self {
                $Name::from(id)
            }
        }
        impl From<String> for $Name {
            fn from(id: String) -> Self {
                $Name::from(id.as_str())
            }
        }
        impl From<&$Name> for $Name {
            fn from(id: &$Name) -> $Name {
                id.clone()
            }
        }
        impl From<$Name> for String {
            fn from(id: $Name) -> String {
                id.to_string()
            }
        }
        impl From<&$Name> for String {
            fn from(id: &$Name) -> String {
                id.to_string()
            }
        }
    };
}

fabric_impl_string_id!(NodeId, "ID of a fabric node, the node's hostname");
fabric_impl_string_id!(VmId, "ID of a virtual machine");
fabric_impl_string_id!(HostId, "Opaque ID of the host a vm is placed on");

/// Scheduling status of a compute service as reported by the fabric.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// The fabric's placement logic may assign new vms to the node.
    Enabled,
    /// The node is out of the scheduler's eligibility set.
    Disabled,
}

impl Default for ServiceStatus {
    fn default() -> Self {
        Self::Disabled
    }
}

impl From<&str> for ServiceStatus {
    fn from(status: &str) -> Self {
        // Anything the fabric reports other than "enabled" counts as
        // disabled.
        ServiceStatus::from_str(status).unwrap_or(Self::Disabled)
    }
}

/// A fabric-reported compute service record.
///
/// Read-only snapshot, used only to locate the entry matching a node's
/// hostname and binary name and extract its status.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteService {
    /// Raw scheduling status string, see [`ServiceStatus`].
    pub status: String,
    /// Binary name of the service.
    pub binary: String,
    /// Hostname of the node the service runs on.
    pub host: String,
    /// Availability zone the node belongs to.
    pub zone: String,
    /// Liveness state of the service.
    pub state: String,
    /// Fabric-assigned id of the record.
    pub id: String,
}

impl RemoteService {
    /// Translate the raw status into a [`ServiceStatus`].
    pub fn service_status(&self) -> ServiceStatus {
        ServiceStatus::from(self.status.as_str())
    }
}

/// A virtual machine snapshot as reported by the fabric.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vm {
    /// Vm identification.
    pub id: VmId,
    /// ID of the host the vm is currently placed on.
    pub host_id: HostId,
    /// When the vm was created.
    pub created: Option<DateTime<Utc>>,
    /// When the vm state last changed.
    pub updated: Option<DateTime<Utc>>,
}

impl Vm {
    /// Get a new `Self` with the given placement.
    pub fn new(id: impl Into<VmId>, host_id: impl Into<HostId>) -> Self {
        Self {
            id: id.into(),
            host_id: host_id.into(),
            created: None,
            updated: None,
        }
    }
}
