pub mod bugs;
pub mod db;
pub mod settings;
pub mod store;
pub mod webhook;
