//! SOME/IP addressing primitives and the handful of constants the bridge
//! needs from the uProtocol SOME/IP profile.

use serde::Deserialize;

pub type ServiceId = u16;
pub type InstanceId = u16;
pub type MethodId = u16;
pub type EventId = u16;
pub type EventGroupId = u16;
pub type ClientId = u16;
pub type RequestId = u32;

/// A resource id is either a method id or an eventgroup id; SOME/IP uses
/// the same numeric space for both, and the bridge only cares which table
/// it belongs in, not which kind it is.
pub type UResourceId = u16;

/// Fixed instance id mandated by the uProtocol SOME/IP profile. Assigned
/// to every handler after construction, regardless of what a caller asks
/// for.
pub const INSTANCE_ID_PER_SPEC: InstanceId = 0x0001;

pub const ANY_INSTANCE: InstanceId = 0xFFFF;
pub const ANY_METHOD: MethodId = 0xFFFF;

/// Reserved uP entity id carried in the sink of an outbound `REQUEST`
/// message to mean "this is a subscribe, not a normal method call."
pub const UT_SUBSCRIPTION_REQUEST_SINK_URI_UEID: u32 = 0xFFFF_FFFF;

pub const MIN_SUBSCRIBER_COUNT: u16 = 1;

/// Whether a handler instance consumes a remote service (`Client`) or
/// offers one (`Server`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Client,
	Server,
}
