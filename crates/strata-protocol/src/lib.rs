// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Strata Protocol - QUIC + Protobuf communication layer
//!
//! This crate provides the wire protocol for communication between:
//! - Operators and the control plane (control protocol)
//! - The control plane and database node agents (guest protocol)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    strata-protocol                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RPC Layer: Request/Response over bidirectional streams     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Serialization: Protobuf (prost)                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Transport: QUIC (quinn)                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocols
//!
//! ## Control Protocol (`wire::control`)
//!
//! Used by operators to manage the control plane:
//! - Create clusters and watch formation progress
//! - Query cluster and instance status
//! - List clusters, health checks
//!
//! ## Guest Protocol (`wire::guest`)
//!
//! Used by the control plane to configure database node agents. The API
//! is version-controlled: every request carries an `api_version` and
//! agents reject versions they do not support.
//!
//! # Usage
//!
//! ```ignore
//! use strata_protocol::{StrataClient, wire};
//!
//! let client = StrataClient::localhost()?;
//! client.connect().await?;
//!
//! let request = wire::control::RpcRequest {
//!     request: Some(wire::control::rpc_request::Request::HealthCheck(
//!         wire::control::HealthCheckRequest {},
//!     )),
//! };
//!
//! let response: wire::control::RpcResponse = client.request(&request).await?;
//! ```

pub mod client;
pub mod frame;
pub mod server;
pub mod wire;

// Re-export main types
pub use client::{ClientError, StrataClient, StrataClientConfig};
pub use frame::{Frame, FrameError, FramedStream, MessageType};
pub use server::{
    ConnectionHandler, ServerError, StrataServer, StrataServerConfig, StreamHandler,
};
pub use wire::GUEST_API_VERSION;
