//! cloud-init-fixture library
//!
//! Loads and structurally validates cloud-init `user_data` fixtures used to
//! bootstrap hypervisor test guests.
//!
//! # Design Principles
//!
//! - **Read-only**: loading never writes files, runs embedded scripts, or
//!   touches the network
//! - **Order preserving**: `write_files` entries and their content come back
//!   exactly as written
//! - **Typed errors**: every validation failure is a distinct [`LoadError`]
//!
//! ```
//! let doc = cloud_init_fixture::fixtures::ubuntu().unwrap();
//! assert_eq!(doc.users()[0].name, "cloud");
//! ```

pub mod config;
pub mod fixtures;
pub mod seed;
pub mod userdata;

mod error;

pub use config::{
    ConfigDocument, ConfigFixtureLoader, FileSpec, Package, Permissions, RunCmd, Section, UserSpec, load,
};
pub use error::{FixtureError, LoadError, Location};
pub use seed::Seed;
pub use userdata::{ContentType, load_userdata};
