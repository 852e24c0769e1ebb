//! Unit test harness for bed-leveling.
//!
//! This module organizes unit tests for each component of the library.

mod config_parsing;
mod config_validation;
mod mesh_properties;
