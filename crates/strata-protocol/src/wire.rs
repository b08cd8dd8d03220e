// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Protobuf message definitions for the control and guest APIs.
//!
//! Two namespaces ride the same frame codec:
//!
//! - [`control`] — the operator-facing API served by the control plane
//!   (create/get/list/grow/shrink/health).
//! - [`guest`] — the version-controlled role-configuration API served by
//!   database node agents. Every request carries `api_version`; agents
//!   reject versions they do not support instead of guessing.

/// Current guest API version. Bump when a guest message changes shape.
pub const GUEST_API_VERSION: u32 = 1;

/// Operator-facing control API messages.
pub mod control {
    /// Top-level request envelope. Exactly one variant is set.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RpcRequest {
        #[prost(oneof = "rpc_request::Request", tags = "1, 2, 3, 4, 5, 6")]
        pub request: ::core::option::Option<rpc_request::Request>,
    }

    /// Nested message and enum types in `RpcRequest`.
    pub mod rpc_request {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Request {
            #[prost(message, tag = "1")]
            CreateCluster(super::CreateClusterRequest),
            #[prost(message, tag = "2")]
            GetCluster(super::GetClusterRequest),
            #[prost(message, tag = "3")]
            ListClusters(super::ListClustersRequest),
            #[prost(message, tag = "4")]
            GrowCluster(super::GrowClusterRequest),
            #[prost(message, tag = "5")]
            ShrinkCluster(super::ShrinkClusterRequest),
            #[prost(message, tag = "6")]
            HealthCheck(super::HealthCheckRequest),
        }
    }

    /// Top-level response envelope. Exactly one variant is set.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RpcResponse {
        #[prost(oneof = "rpc_response::Response", tags = "1, 2, 3, 4, 5")]
        pub response: ::core::option::Option<rpc_response::Response>,
    }

    /// Nested message and enum types in `RpcResponse`.
    pub mod rpc_response {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Response {
            #[prost(message, tag = "1")]
            Cluster(super::ClusterResponse),
            #[prost(message, tag = "2")]
            ClusterList(super::ClusterListResponse),
            #[prost(message, tag = "3")]
            Ack(super::AckResponse),
            #[prost(message, tag = "4")]
            Health(super::HealthCheckResponse),
            #[prost(message, tag = "5")]
            Error(super::RpcError),
        }
    }

    /// Request to form a new cluster.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CreateClusterRequest {
        /// Cluster name, used as the prefix for node names.
        #[prost(string, tag = "1")]
        pub name: ::prost::alloc::string::String,
        /// Owning tenant.
        #[prost(string, tag = "2")]
        pub tenant_id: ::prost::alloc::string::String,
        /// Datastore version identifier.
        #[prost(string, tag = "3")]
        pub datastore_version: ::prost::alloc::string::String,
        /// Requested storage instances. Count must equal the replica factor.
        #[prost(message, repeated, tag = "4")]
        pub instances: ::prost::alloc::vec::Vec<InstanceSpec>,
        /// Coordinator count override (0 = datastore default).
        #[prost(uint32, tag = "5")]
        pub num_coordinators: u32,
        /// Router count override (0 = datastore default).
        #[prost(uint32, tag = "6")]
        pub num_routers: u32,
        /// Optional locality hint, passed through to the provisioner.
        #[prost(string, optional, tag = "7")]
        pub locality: ::core::option::Option<::prost::alloc::string::String>,
        /// True when the request attaches a configuration object. The
        /// planner rejects such requests; the flag exists so the wire
        /// surface can express them.
        #[prost(bool, tag = "8")]
        pub has_configuration: bool,
    }

    /// One requested storage instance.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct InstanceSpec {
        #[prost(string, tag = "1")]
        pub flavor_id: ::prost::alloc::string::String,
        #[prost(uint64, tag = "2")]
        pub volume_size_gb: u64,
        #[prost(string, optional, tag = "3")]
        pub volume_type: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "4")]
        pub availability_zone: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "5")]
        pub nic: ::core::option::Option<::prost::alloc::string::String>,
        /// Module ids to apply on the node, passed through untouched.
        #[prost(string, repeated, tag = "6")]
        pub modules: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "7")]
        pub region: ::core::option::Option<::prost::alloc::string::String>,
    }

    /// Fetch one cluster with its instances.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GetClusterRequest {
        #[prost(string, tag = "1")]
        pub cluster_id: ::prost::alloc::string::String,
    }

    /// List clusters for a tenant (all tenants when empty).
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ListClustersRequest {
        #[prost(string, optional, tag = "1")]
        pub tenant_id: ::core::option::Option<::prost::alloc::string::String>,
    }

    /// Grow request. Currently always rejected.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GrowClusterRequest {
        #[prost(string, tag = "1")]
        pub cluster_id: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "2")]
        pub instances: ::prost::alloc::vec::Vec<InstanceSpec>,
    }

    /// Shrink request. Currently always rejected.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ShrinkClusterRequest {
        #[prost(string, tag = "1")]
        pub cluster_id: ::prost::alloc::string::String,
        #[prost(string, repeated, tag = "2")]
        pub instance_ids: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    }

    /// Liveness probe.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HealthCheckRequest {}

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HealthCheckResponse {
        #[prost(bool, tag = "1")]
        pub healthy: bool,
        #[prost(string, tag = "2")]
        pub version: ::prost::alloc::string::String,
    }

    /// A cluster and its member nodes.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ClusterResponse {
        #[prost(string, tag = "1")]
        pub cluster_id: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub name: ::prost::alloc::string::String,
        #[prost(string, tag = "3")]
        pub tenant_id: ::prost::alloc::string::String,
        #[prost(string, tag = "4")]
        pub datastore_version: ::prost::alloc::string::String,
        /// Cluster task status: "building", "active", "failed", ...
        #[prost(string, tag = "5")]
        pub task_status: ::prost::alloc::string::String,
        #[prost(message, repeated, tag = "6")]
        pub instances: ::prost::alloc::vec::Vec<InstanceStatus>,
        /// RFC 3339 creation timestamp.
        #[prost(string, tag = "7")]
        pub created_at: ::prost::alloc::string::String,
    }

    /// One node within a cluster response.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct InstanceStatus {
        #[prost(string, tag = "1")]
        pub instance_id: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub name: ::prost::alloc::string::String,
        /// Node role: "coordinator", "router" or "storage".
        #[prost(string, tag = "3")]
        pub role: ::prost::alloc::string::String,
        /// Replication group, set for storage nodes only.
        #[prost(string, optional, tag = "4")]
        pub replication_group: ::core::option::Option<::prost::alloc::string::String>,
        /// Service status: "building", "ready" or "failed".
        #[prost(string, tag = "5")]
        pub service_status: ::prost::alloc::string::String,
        #[prost(string, tag = "6")]
        pub flavor_id: ::prost::alloc::string::String,
        #[prost(string, optional, tag = "7")]
        pub availability_zone: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "8")]
        pub region: ::core::option::Option<::prost::alloc::string::String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ClusterListResponse {
        #[prost(message, repeated, tag = "1")]
        pub clusters: ::prost::alloc::vec::Vec<ClusterResponse>,
    }

    /// Generic acknowledgement.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct AckResponse {
        #[prost(string, tag = "1")]
        pub message: ::prost::alloc::string::String,
    }

    /// Error response carried inside the response oneof.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct RpcError {
        /// Stable machine-readable code, e.g. "INVALID_INSTANCE_COUNT".
        #[prost(string, tag = "1")]
        pub code: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub message: ::prost::alloc::string::String,
    }
}

/// Version-controlled guest (node agent) API messages.
pub mod guest {
    /// Envelope for role-configuration calls. Agents must check
    /// `api_version` before interpreting the payload.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GuestRequest {
        /// Sender's API version; see [`super::GUEST_API_VERSION`].
        #[prost(uint32, tag = "1")]
        pub api_version: u32,
        #[prost(oneof = "guest_request::Request", tags = "2, 3, 4")]
        pub request: ::core::option::Option<guest_request::Request>,
    }

    /// Nested message and enum types in `GuestRequest`.
    pub mod guest_request {
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Request {
            #[prost(message, tag = "2")]
            ConfigureCoordinator(super::ConfigureCoordinator),
            #[prost(message, tag = "3")]
            ConfigureRouter(super::ConfigureRouter),
            #[prost(message, tag = "4")]
            ConfigureStorage(super::ConfigureStorage),
        }
    }

    /// Bind the node as a metadata coordinator.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ConfigureCoordinator {
        /// Peer endpoints of all coordinators, `host:port`.
        #[prost(string, repeated, tag = "1")]
        pub peer_endpoints: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    }

    /// Bind the node as a SQL router. Routers hold no storage state, so
    /// the message carries no storage directives.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ConfigureRouter {
        /// Coordinator endpoints the router connects to, `host:port`.
        #[prost(string, repeated, tag = "1")]
        pub coordinator_endpoints: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    }

    /// Join the node to a storage replication group. Idempotent for the
    /// same group name; rejected for a different one.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ConfigureStorage {
        #[prost(string, tag = "1")]
        pub replica_set_name: ::prost::alloc::string::String,
        /// Coordinator endpoints the storage node registers with.
        #[prost(string, repeated, tag = "2")]
        pub coordinator_endpoints: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    }

    /// Guest reply.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct GuestResponse {
        #[prost(enumeration = "GuestStatus", tag = "1")]
        pub status: i32,
        /// Human-readable detail for non-OK statuses.
        #[prost(string, tag = "2")]
        pub message: ::prost::alloc::string::String,
    }

    /// Outcome of a guest call.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum GuestStatus {
        /// The call was applied (or was an idempotent repeat).
        Ok = 0,
        /// The guest does not speak the requested API version.
        UnsupportedApiVersion = 1,
        /// The guest refused the configuration (e.g. conflicting
        /// replication group).
        Rejected = 2,
    }

    impl GuestStatus {
        /// String value of the enum field name.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Self::Ok => "OK",
                Self::UnsupportedApiVersion => "UNSUPPORTED_API_VERSION",
                Self::Rejected => "REJECTED",
            }
        }
    }
}
