pub mod attendance;
pub mod balance;
pub mod department;
pub mod holiday;
pub mod leave_request;
pub mod leave_type;
pub mod notification;
pub mod permission;
pub mod team;
pub mod users;
