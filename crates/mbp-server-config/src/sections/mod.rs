// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod access_control;
mod logging;

pub use access_control::{AccessControlConfig, AccessControlConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
