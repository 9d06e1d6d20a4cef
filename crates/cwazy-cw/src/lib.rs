pub mod controller;
pub mod encode;
pub mod error;
pub mod graph;
pub mod params;
pub mod schedule;
pub mod timing;

pub use controller::Controller;
pub use encode::{encode, tokenize, EncodeError, Symbol};
pub use error::{AudioError, ConfigError, Error};
pub use graph::{AudioContext, AudioHost, NodeId, NodeKind};
pub use params::CwParams;
pub use schedule::{schedule_token, schedule_tokens, EnvelopeEvent, ScheduleCursor};
pub use timing::{Element, Timing};
