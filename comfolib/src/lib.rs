#![cfg_attr(not(feature = "std"), no_std)]

mod monitor;
pub use monitor::*;

pub mod protocol;
