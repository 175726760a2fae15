pub mod client;
pub mod responder;
pub mod timeline;

pub use client::{ChatSession, SessionHandle, SessionOptions};
pub use responder::{Responder, SIMULATED_SENDER};
pub use timeline::Timeline;
