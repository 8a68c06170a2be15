//! The correlation state owned exclusively by the dispatch loop: which
//! resources this handler offers or has subscribed to, and the two
//! lookup tables that let a response find its way back to the request
//! that caused it.

use std::collections::HashMap;

use crate::ids::{EventGroupId, UResourceId};
use crate::someip::SomeIpMessage;
use crate::uprotocol::{UResource, UUri};

/// A resource (method or eventgroup) this handler is responsible for,
/// plus how many subscribers currently care about it. Entries persist for
/// the handler's lifetime once created, on both the offered-resource and
/// remote-subscription tables; nothing currently erases a
/// `subscriptions_for_remote_services` entry when its count returns to
/// zero.
#[derive(Clone, Debug)]
pub struct ResourceInformation {
	pub resource: UResource,
	subscriber_count: u16,
}

impl ResourceInformation {
	pub fn new(resource: UResource) -> Self {
		Self {
			resource,
			subscriber_count: 0,
		}
	}

	pub fn add_subscriber(&mut self) {
		self.subscriber_count += 1;
	}

	/// Returns the count after decrementing; saturates at zero so a
	/// duplicate unsubscribe can't underflow it.
	pub fn remove_subscriber(&mut self) -> u16 {
		self.subscriber_count = self.subscriber_count.saturating_sub(1);
		self.subscriber_count
	}

	pub fn subscriber_count(&self) -> u16 {
		self.subscriber_count
	}

	pub fn does_subscription_exist(&self) -> bool {
		self.subscriber_count >= crate::ids::MIN_SUBSCRIBER_COUNT
	}
}

/// A SOME/IP request this handler sent on behalf of a local uProtocol
/// caller, kept around until the matching response arrives (or the
/// availability/timeout machinery gives up on it).
#[derive(Clone, Debug)]
pub struct PendingOutboundRequest {
	pub someip_request: SomeIpMessage,
	/// Where the eventual response uMessage must be sent.
	pub respond_to: UUri,
}

/// Everything the dispatch loop needs to remember between one queued
/// item and the next. Never touched outside the worker thread.
#[derive(Default)]
pub struct CorrelationTables {
	/// Resources this handler (as a server) offers over SOME/IP.
	/// Entries persist for the handler's lifetime once added.
	pub offered_resources: HashMap<UResourceId, ResourceInformation>,
	/// Remote-service eventgroups this handler (as a client) has
	/// subscribed to on behalf of local uProtocol subscribers.
	pub subscriptions_for_remote_services: HashMap<EventGroupId, ResourceInformation>,
	/// uP request UUID -> the SOME/IP request sent for it plus where to
	/// deliver the response, so an inbound SOME/IP response can be
	/// rebuilt into a uMessage addressed back to the original caller.
	pub pending_outbound_requests: HashMap<String, PendingOutboundRequest>,
	/// Generated uP UUID -> the original inbound SOME/IP request it
	/// stands in for, so an outbound response uMessage (addressed by
	/// that UUID) can be turned back into a correctly addressed SOME/IP
	/// response.
	pub pending_inbound_requests: HashMap<String, SomeIpMessage>,
}

impl CorrelationTables {
	pub fn new() -> Self {
		Self::default()
	}

	/// Finds and removes the pending outbound request whose SOME/IP
	/// request id matches `request_id`, returning its uuid alongside it.
	/// Requests are keyed by uuid, not request id, so this is a scan; the
	/// table only ever holds as many entries as there are requests
	/// in flight.
	pub fn take_pending_outbound_request_by_someip_id(
		&mut self,
		request_id: crate::ids::RequestId,
	) -> Option<(String, PendingOutboundRequest)> {
		let uuid = self
			.pending_outbound_requests
			.iter()
			.find(|(_, pending)| pending.someip_request.request_id == request_id)
			.map(|(uuid, _)| uuid.clone())?;
		self.pending_outbound_requests
			.remove(&uuid)
			.map(|pending| (uuid, pending))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::uprotocol::UResource;

	fn resource() -> UResource {
		UResource {
			id: 0x1001,
			name: "Example".into(),
			instance: None,
		}
	}

	#[test]
	fn subscriber_monotonicity_for_offered_resources() {
		let mut info = ResourceInformation::new(resource());
		assert!(!info.does_subscription_exist());
		info.add_subscriber();
		assert!(info.does_subscription_exist());
		info.add_subscriber();
		assert_eq!(info.subscriber_count(), 2);
		info.remove_subscriber();
		assert!(info.does_subscription_exist());
	}

	#[test]
	fn remove_subscriber_saturates_at_zero() {
		let mut info = ResourceInformation::new(resource());
		assert_eq!(info.remove_subscriber(), 0);
		assert!(!info.does_subscription_exist());
	}

	fn someip_request(request_id: u32) -> SomeIpMessage {
		SomeIpMessage {
			message_type: crate::someip::SomeIpMessageType::Request,
			service_id: 0x1234,
			instance_id: crate::ids::INSTANCE_ID_PER_SPEC,
			method_id: 0x0421,
			client_id: 1,
			request_id,
			payload: bytes::Bytes::new(),
		}
	}

	fn uuri() -> UUri {
		UUri {
			authority: crate::uprotocol::UAuthority { name: "vehicle1".into() },
			entity: crate::uprotocol::UEntity { id: 1, version: 1 },
			resource: resource(),
		}
	}

	#[test]
	fn pending_outbound_request_is_found_and_removed_by_someip_request_id() {
		let mut tables = CorrelationTables::new();
		tables.pending_outbound_requests.insert(
			"uuid-a".into(),
			PendingOutboundRequest {
				someip_request: someip_request(42),
				respond_to: uuri(),
			},
		);

		let (uuid, pending) = tables
			.take_pending_outbound_request_by_someip_id(42)
			.expect("entry should be found");
		assert_eq!(uuid, "uuid-a");
		assert_eq!(pending.someip_request.request_id, 42);
		assert!(tables.pending_outbound_requests.is_empty());
		assert!(tables.take_pending_outbound_request_by_someip_id(42).is_none());
	}
}
