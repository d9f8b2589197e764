// SPDX-License-Identifier: MIT

//! Multi-step form wizard engine
//!
//! - [wizard] - step engine, cumulative schemas and caller-owned state
//! - [verify] - collaborators that send and confirm verification codes
//! - [forms] - built-in authentication and scheduling wizards
//! - [phone] - phone number formatting helpers

pub mod error;
pub mod forms;
pub mod phone;
pub mod verify;
pub mod wizard;
