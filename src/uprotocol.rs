//! Minimal uProtocol data model: just enough of `UUri`, `UMessage` and
//! friends for the bridge to address, tag and route messages. A real
//! deployment would pull these from the `up-rust` crate; they're
//! reproduced here so the bridge has no compile-time dependency on a
//! particular uProtocol SDK version.

use std::fmt;

use bytes::Bytes;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UAuthority {
	pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UEntity {
	pub id: u32,
	pub version: u32,
}

/// A method, event or eventgroup exposed by an entity. `instance` is the
/// optional resource instance name uProtocol allows for parameterised
/// resources; the bridge never uses it, but carries it through.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UResource {
	pub id: u16,
	pub name: String,
	pub instance: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UMessageType {
	Publish,
	Request,
	Response,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UUri {
	pub authority: UAuthority,
	pub entity: UEntity,
	pub resource: UResource,
}

impl fmt::Display for UUri {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"//{}/{:X}/{}/{}",
			self.authority.name, self.entity.id, self.entity.version, self.resource.name
		)
	}
}

/// Envelope attributes carried alongside every `UMessage`. `id` is the
/// message's own UUID (as its canonical string form); `reqid` is the UUID
/// of the request a response answers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UAttributes {
	pub id: String,
	pub message_type: UMessageType,
	pub source: UUri,
	pub sink: Option<UUri>,
	pub reqid: Option<String>,
	pub ttl_ms: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UMessage {
	pub attributes: UAttributes,
	pub payload: Bytes,
}

impl UMessage {
	pub fn uuid(&self) -> &str {
		&self.attributes.id
	}

	pub fn message_type(&self) -> UMessageType {
		self.attributes.message_type
	}
}
