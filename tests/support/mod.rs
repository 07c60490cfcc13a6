#![allow(dead_code)]

pub mod classifier_env;
pub mod fixtures;
