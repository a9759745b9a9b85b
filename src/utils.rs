pub mod common;
pub mod extract;
pub mod os_version;
