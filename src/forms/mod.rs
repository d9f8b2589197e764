// SPDX-License-Identifier: MIT

//! Built-in wizards
//!
//! - [auth] - phone login with a one-time code
//! - [scheduling] - salon appointment booking with phone verification

pub mod auth;
pub mod scheduling;

use crate::wizard::WizardDefinition;

/// Names accepted by [`builtin`]
pub const NAMES: &[&str] = &[auth::NAME, scheduling::NAME];

/// Look up a built-in wizard definition by name
pub fn builtin(name: &str) -> Option<WizardDefinition> {
    match name {
        auth::NAME => Some(auth::definition()),
        scheduling::NAME => Some(scheduling::definition()),
        _ => None,
    }
}
