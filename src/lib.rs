// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::new_without_default)]

//! # PDF Registry
//!
//! Process-wide resource registry for PDF rendering.
//!
//! A renderer needs three kinds of external resources that documents refer
//! to by name but rarely carry themselves:
//!
//! - **Encoding resources**: CID-to-Unicode tables, Unicode-to-Unicode
//!   remappings, output-encoding Unicode maps and CMaps. These are located
//!   through configuration tables and kept in small bounded caches
//!   ([`cache`]) shared by every rendering thread.
//! - **System fonts**: non-embedded fonts are resolved against the fonts
//!   installed on the machine, with a deterministic substitution family when
//!   the requested font is missing ([`fonts`]).
//! - **Settings**: scalar rendering and output options ([`settings`]).
//!
//! Fonts the platform only exposes as in-memory tables or collection
//! members are rebuilt into standalone TrueType files in a scoped temporary
//! area, deleted when the registry is dropped.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_registry::fonts::FontDescriptor;
//! use pdf_registry::{RawResourceLoader, RegistryConfig, ResourceRegistry};
//!
//! # fn main() -> pdf_registry::Result<()> {
//! let registry = ResourceRegistry::new(RawResourceLoader, RegistryConfig::default());
//! registry.scan_data_dir("/usr/share/pdf-data".as_ref())?;
//!
//! if let Some(map) = registry.get_cid_to_unicode("Adobe-GB1") {
//!     println!("{} bytes from {:?}", map.data.len(), map.origin);
//! }
//!
//! let font = registry.find_system_font(&FontDescriptor::named("Helvetica-Bold"))?;
//! if let Some(font) = font {
//!     println!("{}", font.path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;
/// Quiet-suppressible error reporting
pub mod diagnostics;

// Encoding resources
pub mod cache;
pub mod resources;

// System fonts
pub mod fonts;

// Configuration
pub mod registry;
pub mod settings;

// Re-exports
pub use cache::{ResourceCache, DEFAULT_CACHE_CAPACITY};
pub use error::{Error, ResourceKind, Result};
pub use fonts::{ContainerType, FontDescriptor, SysFontInfo};
pub use registry::{RegistryConfig, ResourceRegistry};
pub use resources::{RawResource, RawResourceLoader, ResourceLoader, ResourceSource};
pub use settings::Settings;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
