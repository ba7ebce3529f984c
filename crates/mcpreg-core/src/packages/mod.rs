//! Canonical package model
//!
//! Provider-independent records every registry adapter normalises into.
//! Values are built once by a provider and never mutated afterwards.

pub mod arguments;
pub mod installation;
pub mod server;
pub mod tool;

pub use arguments::{ArgumentMetadata, ArgumentPredicate, Arguments, VariableType};
pub use installation::{Installation, Installations, Repository, Transport, Transports};
pub use server::{Publisher, Server};
pub use tool::{JsonSchema, Tool, ToolAnnotations, Tools};
