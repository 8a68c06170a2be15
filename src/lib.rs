//! # someip-uprotocol-bridge
//!
//! A bidirectional protocol bridge between SOME/IP and uProtocol: a
//! priority-queued, single-consumer dispatch engine that translates
//! inbound SOME/IP traffic into uMessages for a local uProtocol router,
//! and outbound uMessages into SOME/IP requests, responses and
//! notifications, acting as either a service `Client` or a service
//! `Server`.

pub mod availability;
pub mod config;
pub mod correlation;
pub mod error;
pub mod handler;
pub mod ids;
pub mod interfaces;
pub mod item;
pub mod queue;
pub mod scheduler;
pub mod someip;
pub mod uprotocol;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use self::{
	config::BridgeConfig,
	error::{BridgeError, DispatchError, TranslationError},
	handler::SomeipHandler,
	ids::Role,
	item::QItem,
};

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Result<T> = std::result::Result<T, Error>;
