// Copyright 2026 Skimmer Contributors
// SPDX-License-Identifier: Apache-2.0

//! Skimmer — adaptive web content extraction engine.
//!
//! Fetches a public URL with a cheap static GET, classifies whether the
//! result carries real content, and escalates to a headless browser with a
//! scripted interaction sequence (overlay dismissal, tab clicks, scrolling,
//! pagination) when it does not. Output is a stable JSON envelope of page
//! metadata, labeled sections, the interaction trace, and any non-fatal
//! errors collected along the way.

pub mod config;
pub mod engine;
pub mod extract;
pub mod fetch;
pub mod interact;
pub mod model;
pub mod renderer;
pub mod rest;
