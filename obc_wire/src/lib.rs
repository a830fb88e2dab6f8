//! Wire-format definitions shared by the OBC firmware core and ground-station
//! tooling: telecommand frame grammar, argument parsing, downlink packet
//! layouts, and KISS framing. No I/O lives here.

pub mod args;
pub mod frame;
pub mod kiss;
pub mod packet;

pub use frame::{parse_frame, Channel, FrameErrorCode, ParsedFrame, TelecommandLookup};
