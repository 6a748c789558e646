pub mod naming;
pub mod serde;
pub mod time;
