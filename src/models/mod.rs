pub mod bug;
pub mod webhook;
