//! relaycast configuration
//!
//! A validated, reloadable configuration model: five catalogs of named
//! entities (servers, streams, intakes, decoders, encoders), global metadata
//! settings, and per-process program settings.
//!
//! # Example
//!
//! ```rust
//! use relaycast_config::{Config, XmlStr};
//!
//! let doc = r#"
//! <relaycast>
//!   <servers><server>
//!     <hostname>127.0.0.1</hostname>
//!     <password>hackme</password>
//!   </server></servers>
//!   <streams><stream><format>ogg</format></stream></streams>
//!   <intakes><intake><filename>playlist.m3u</filename></intake></intakes>
//! </relaycast>"#;
//!
//! let mut config = Config::default();
//! config.load(&XmlStr::new("example.xml", doc)).unwrap();
//! assert_eq!(config.servers().find("default").unwrap().port(), 8000);
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod intake;
pub mod legacy;
pub mod root;
pub mod server;
pub mod settings;
pub mod stream;
pub mod validate;
pub mod xml;

mod table;

pub use catalog::{Catalog, Entity, DEFAULT_NAME};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{ConfigError, Result, ValidationError};
pub use intake::{Intake, IntakeType};
pub use legacy::LegacyFile;
pub use root::{Config, ConfigSet, ConfigSource};
pub use server::{Protocol, Server, TlsMode};
pub use settings::{MetadataSettings, ProgramSettings};
pub use stream::{Stream, StreamFormat};
pub use xml::{XmlFile, XmlStr};
