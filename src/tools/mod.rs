//! Type-safe argument structs for every external tool the installer runs.
//!
//! Each submodule maps one tool family. Parsers for the tools' text output
//! live beside the argument structs so the flag spelling and the format
//! assumptions stay together.

pub mod fs;
pub mod geom;
pub mod gpart;
pub mod system;
pub mod zfs;
