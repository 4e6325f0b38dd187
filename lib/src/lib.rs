#![doc = svgbobdoc::transform!(
//! A staged rendering pipeline for markdown article pages.
//!
//! # Overview
//!
//! Lectern turns one raw markdown document into a populated content fragment
//! plus a synthesized table of contents, the way a documentation or tutorial
//! site renders an article on page load. It is a single-pass, best-effort
//! enhancement pipeline: every optional stage degrades gracefully when its
//! backing capability is absent, and a broken stage never takes the rest of
//! the page down with it.
//!
//! ```svgbob
//!  +---------+   +----------+   +----------------------------------+
//!  | Fetcher +-->| Markup   +-->| Stage set, in declared order:    |
//!  +---------+   | Renderer |   |                                  |
//!                +----------+   |  diagrams -> highlight -> tables |
//!                               +----------------+-----------------+
//!                                                |
//!                          +---------------------+
//!                          v
//!  +----------------------------------+   +------------------------+
//!  | heading ids -> toc synthesis     +-->| async enhancements:    |
//!  +----------------------------------+   | diagrams, typesetting  |
//!                                         +------------------------+
//! ```
//!
//! The fetch is the only suspension point; everything after it is synchronous
//! with respect to the fragment, except diagram rendering and math
//! typesetting, which run as independent tasks with per-task completion
//! signals.
//!
//! The host page owns the [`Target`]s; lectern mutates them for one render
//! pass and nothing more. See [`page::PageRenderer`] for the full control
//! flow and [`pipeline::STAGE_ORDER`] for the ordering contract.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod fetch;
pub mod target;
pub mod capability;
pub mod enhance;
pub mod pipeline;
pub mod page;

pub use capability::Capabilities;
pub use fetch::{DocumentRef, Fetcher};
pub use page::{HostPage, Outcome, PageRenderer, Report};
pub use target::Target;

pub use rayon;
