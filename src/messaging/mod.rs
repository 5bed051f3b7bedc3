// Messaging module - Lock-free queues between the control and render threads

pub mod channels;
pub mod command;
pub mod notification;

pub use command::Command;
pub use notification::{Notification, NotificationSink};
