// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Node provisioning backends.
//!
//! The orchestrator requests one node per role assignment through the
//! [`NodeProvisioner`] trait. Production deployments plug in an
//! infrastructure-specific implementation; tests use [`MockProvisioner`].

pub mod mock;
pub mod traits;

pub use mock::MockProvisioner;
pub use traits::{NodeProvisioner, NodeRequest, ProvisionError, ProvisionedNode};
