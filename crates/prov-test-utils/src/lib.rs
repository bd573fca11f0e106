//! Shared test utilities for the provisioning-manager workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`inventory`]: a populated [`Inventory`](prov_core::Inventory) with
//!   the standard customer → project → membership tree
//! - [`project`]: [`TestProject`] builder for `.provisioning/` directories

pub mod inventory;
pub mod project;

pub use inventory::{StandardTree, standard_inventory};
pub use project::TestProject;
