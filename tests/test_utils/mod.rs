//! Local backends for exercising the network transports.

#![allow(dead_code)]

pub mod mock_server;

pub use mock_server::{CapturedRequest, spawn_mock_server, tcp_listener};
