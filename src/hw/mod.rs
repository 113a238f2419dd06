//! Portable hardware abstraction
//!
//! Each hardware module exposes a set of traits and a type alias selecting the implementation
//! used in this build.

pub mod counter;
