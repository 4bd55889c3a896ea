pub mod add_on;
pub mod entity;
pub mod notification;
pub mod status;
