// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 crun contributors

//! Utility modules
//!
//! Terminal helpers shared by the CLI.

pub mod colors;

pub use colors::*;
