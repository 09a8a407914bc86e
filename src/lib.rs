#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod blinds;
pub mod config;
pub mod hardware;
