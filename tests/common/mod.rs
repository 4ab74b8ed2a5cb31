#![allow(dead_code)]
pub mod mysql;
pub mod postgres;
pub mod testable_database;
