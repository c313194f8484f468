pub mod capture_device;
pub mod permissions;
pub mod session_delegate;
