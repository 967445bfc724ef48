pub mod admin;
pub mod notification;
pub mod payment;
pub mod squad;

pub use admin::*;
pub use notification::*;
pub use payment::*;
pub use squad::*;
