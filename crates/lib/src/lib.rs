//! Botchat core library: bot gateway, sessions, conversation state and the inactivity
//! watchdog behind an embeddable chat widget, plus the driver that runs them together.

pub mod audio;
pub mod bots;
pub mod config;
pub mod conversation;
pub mod gateway;
pub mod init;
pub mod message;
pub mod session;
pub mod watchdog;
pub mod widget;
