pub mod controller;

pub use controller::Mailer;
