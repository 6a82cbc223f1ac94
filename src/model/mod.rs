pub mod attendance;
pub mod department;
pub mod holiday;
pub mod leave_balance;
pub mod leave_request;
pub mod leave_type;
pub mod notification;
pub mod permission;
pub mod role;
pub mod user;
