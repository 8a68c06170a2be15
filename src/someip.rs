//! SOME/IP message and subscription-status abstraction. The bridge
//! doesn't speak the wire format itself; it works with messages already
//! decoded by the stack it's embedded in, addressed by the same
//! service/instance/method/client/request id tuple vsomeip uses.

use bytes::Bytes;

use crate::ids::{ClientId, EventGroupId, EventId, InstanceId, MethodId, RequestId, ServiceId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SomeIpMessageType {
	Request,
	Response,
	Notification,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SomeIpMessage {
	pub message_type: SomeIpMessageType,
	pub service_id: ServiceId,
	pub instance_id: InstanceId,
	/// Method id for requests/responses, event id for notifications.
	pub method_id: MethodId,
	pub client_id: ClientId,
	pub request_id: RequestId,
	pub payload: Bytes,
}

impl SomeIpMessage {
	pub fn get_method(&self) -> MethodId {
		self.method_id
	}

	pub fn get_request(&self) -> RequestId {
		self.request_id
	}

	pub fn get_message_type(&self) -> SomeIpMessageType {
		self.message_type
	}

	/// Builds the response counterpart to an inbound request, carrying
	/// over everything that identifies it on the wire.
	pub fn response_for(request: &SomeIpMessage, payload: Bytes) -> Self {
		Self {
			message_type: SomeIpMessageType::Response,
			service_id: request.service_id,
			instance_id: request.instance_id,
			method_id: request.method_id,
			client_id: request.client_id,
			request_id: request.request_id,
			payload,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionStatus {
	pub service_id: ServiceId,
	pub instance_id: InstanceId,
	pub eventgroup_id: EventGroupId,
	pub event_id: EventId,
	pub client_id: ClientId,
	pub is_subscribed: bool,
}
