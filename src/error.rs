//! Error taxonomy. `BridgeError` surfaces from fallible setup (building a
//! handler, parsing configuration); `DispatchError` stays internal to the
//! worker loop, where every variant is caught, logged and dropped rather
//! than propagated, since there is no producer left to hand a `Result` to
//! by the time a queued item reaches dispatch.

use crate::ids::UResourceId;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("failed to read configuration from {path}: {source}")]
	ConfigIo {
		path: String,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse configuration: {0}")]
	ConfigParse(#[from] toml::de::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
	#[error("unknown SOME/IP message type")]
	UnknownMessageType,

	#[error("no correlation entry for request id {0}")]
	UnknownCorrelation(u32),

	#[error("no pending inbound request for reqid {0}")]
	UnknownReqId(String),

	#[error("resource {0} is not offered or subscribed by this handler")]
	UnsupportedResource(UResourceId),

	#[error("timed out waiting for service availability")]
	AvailabilityTimeout,

	#[error("failed to translate message: {0}")]
	Translation(#[from] TranslationError),
}

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
	#[error("missing sink on outbound message")]
	MissingSink,

	#[error("missing reqid on response message")]
	MissingReqId,
}
