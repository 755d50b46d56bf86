//! Layered configuration files for mapping clients.
//!
//! A configuration is a small Lua-style program that returns a table:
//!
//! ```text
//! include "trajectory_builder.lua"
//!
//! options = {
//!   trajectory_builder = TRAJECTORY_BUILDER,
//!   use_odometry = true,
//!   num_point_clouds = 0,
//! }
//!
//! TRAJECTORY_BUILDER.trajectory_builder_2d.use_imu_data = false
//!
//! return options
//! ```
//!
//! Files are looked up through a [`FileResolver`]. The usual one,
//! [`SearchPathResolver`], walks an ordered list of directories, so a user
//! directory placed first overrides files from the installation directory
//! placed after it. Includes go through the same resolver.

mod ast;
mod dictionary;
mod error;
mod eval;
mod lexer;
mod parser;
mod resolver;

pub use dictionary::{Key, ParameterDictionary, Value};
pub use error::{ConfigError, Result};
pub use eval::{load_dictionary, load_source};
pub use resolver::{FileResolver, ResolvedFile, SearchPathResolver};
