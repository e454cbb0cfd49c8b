//! Epi CLI - manage environments and run component commands in containers.

pub mod commands;
pub mod output;
