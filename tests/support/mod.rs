#![allow(dead_code)]

pub mod config_env;
pub mod models;
pub mod wav;
