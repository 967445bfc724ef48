pub mod codes;
pub mod mailer;
pub mod notifications;
pub mod uploads;
