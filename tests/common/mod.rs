#![allow(dead_code)]

pub mod stub_models;
pub mod synthetic;
