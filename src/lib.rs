//! Stored-procedure signatures → protobuf service schema.
//!
//! Harvested function descriptions ([`model`]) are flattened into message
//! definitions by the [`emitter`], wrapped into a service by [`service`], and
//! written (plus compiled) by the [`pipeline`].
pub mod cli;
pub mod emitter;
pub mod error;
pub mod input;
pub mod model;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod service;
pub mod type_map;

pub use error::{CompilerError, EmitError, InputError};
pub use model::{Argument, Direction, Flavor, Function};
pub use registry::DedupRegistry;
pub use service::{write_schema, SchemaOptions, SchemaReport};
