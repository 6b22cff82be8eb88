pub mod attendance;
pub mod clock_event;
pub mod officer;
pub mod role;
