//! Core types for Feastly.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod menu;
pub mod price;
pub mod status;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use menu::{ExtraOption, MenuCategory, MenuItem, SizeOption, group_by_category};
pub use price::Price;
pub use status::*;
pub use user::{Role, UserRecord};
