mod message;
mod message_body;
mod resign_action;
mod response;

pub use message::RtiMessage;
pub use message_body::{MessageBody, MessageType};
pub use resign_action::ResignAction;
pub use response::{Response, ResponseBody};
