// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Role configuration of guest agents.
//!
//! After every node reports ready, the orchestrator issues exactly one
//! role-configuration call per node through the [`RoleConfigurator`]
//! trait. [`QuicRoleConfigurator`] speaks the versioned guest protocol
//! over QUIC; [`MockConfigurator`] records calls for tests.

pub mod mock;
pub mod quic;
pub mod traits;

pub use mock::MockConfigurator;
pub use quic::QuicRoleConfigurator;
pub use traits::{GuestError, RoleConfigurator};
