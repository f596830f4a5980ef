//! Page acquisition: fetching article HTML and pulling fields out of it.
//!
//! # Submodules
//!
//! | Module | Role |
//! |--------|------|
//! | [`fetcher`] | HTTP GET with browser-like headers and a fixed timeout |
//! | [`extractor`] | Title, date and body cascades plus body cleaning |
//! | [`strategy`] | The [`strategy::Strategy`] trait and selector/heuristic strategies |
//! | [`dates`] | Publish-date text and ISO timestamp parsing |
//!
//! Extraction never fails on a missing title or date; those fall back to a
//! placeholder and today's date. A missing body is the only fatal outcome.

pub mod dates;
pub mod extractor;
pub mod fetcher;
pub mod strategy;
