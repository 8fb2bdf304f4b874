pub mod buttons;
pub mod webhook;
