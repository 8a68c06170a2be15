//! Test doubles for the two collaborator traits, plus a passthrough
//! translator. Kept behind the `test-utils` feature (rather than bare
//! `cfg(test)`) so the `uuid` dependency it needs is only pulled in when
//! that feature is enabled, and so the standalone binary can depend on
//! these fakes too without linking a second copy of this crate's tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::TranslationError;
use crate::ids::{ClientId, EventGroupId, EventId, InstanceId, MethodId, ServiceId};
use crate::interfaces::{
	AvailabilityHandler, MessageHandler, MessageTranslator, Router, SomeIpInterface,
	SubscriptionHandler, SubscriptionStatusHandler,
};
use crate::someip::SomeIpMessage;
use crate::uprotocol::{UAttributes, UAuthority, UEntity, UMessage, UMessageType, UResource, UUri};

/// Every call a test made against the fake, in order, for assertions
/// that care about call shape rather than just final state.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedCall {
	OfferService(ServiceId, InstanceId),
	RequestService(ServiceId, InstanceId),
	OfferEvent(ServiceId, InstanceId, EventId, Vec<EventGroupId>),
	RequestEvent(ServiceId, InstanceId, EventId, Vec<EventGroupId>),
	Subscribe(ServiceId, InstanceId, EventGroupId),
	Unsubscribe(ServiceId, InstanceId, EventGroupId),
	Notify(ServiceId, InstanceId, EventId, Bytes),
	SendRequest(SomeIpMessage),
	SendResponse(SomeIpMessage),
}

#[derive(Default)]
pub struct FakeSomeIpInterface {
	calls: Mutex<Vec<RecordedCall>>,
	message_handler: Mutex<Option<MessageHandler>>,
	availability_handler: Mutex<Option<AvailabilityHandler>>,
	subscription_handlers: Mutex<Vec<(EventGroupId, SubscriptionHandler)>>,
	subscription_status_handlers: Mutex<Vec<(EventGroupId, SubscriptionStatusHandler)>>,
	/// Resource ids a test has marked as methods. Everything else is
	/// treated as an event, which is the more common case in the test
	/// scenarios this fake backs.
	methods: Mutex<HashSet<crate::ids::UResourceId>>,
}

impl FakeSomeIpInterface {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn calls(&self) -> Vec<RecordedCall> {
		self.calls.lock().unwrap().clone()
	}

	/// Simulates the SOME/IP stack delivering an inbound message.
	pub fn deliver(&self, message: SomeIpMessage) {
		if let Some(handler) = self.message_handler.lock().unwrap().as_ref() {
			handler(message);
		}
	}

	/// Simulates a service becoming (un)available.
	pub fn simulate_availability(&self, service: ServiceId, instance: InstanceId, available: bool) {
		if let Some(handler) = self.availability_handler.lock().unwrap().as_ref() {
			handler(service, instance, available);
		}
	}

	/// Simulates a remote client (un)subscribing to one of our offered
	/// eventgroups.
	pub fn simulate_subscription(&self, eventgroup: EventGroupId, client_id: ClientId, subscribed: bool) -> bool {
		let handlers = self.subscription_handlers.lock().unwrap();
		match handlers.iter().find(|(eg, _)| *eg == eventgroup) {
			Some((_, handler)) => handler(client_id, subscribed),
			None => false,
		}
	}

	/// Simulates the ack for a subscription this fake made as a client.
	pub fn simulate_subscription_ack(&self, eventgroup: EventGroupId, status: u16) {
		let handlers = self.subscription_status_handlers.lock().unwrap();
		if let Some((_, handler)) = handlers.iter().find(|(eg, _)| *eg == eventgroup) {
			handler(0, 0, eventgroup, eventgroup, status);
		}
	}

	/// Marks `resource_id` as a method rather than an event for the
	/// purposes of `is_method`, matching vsomeip's own id-space split.
	pub fn mark_as_method(&self, resource_id: crate::ids::UResourceId) {
		self.methods.lock().unwrap().insert(resource_id);
	}
}

impl SomeIpInterface for FakeSomeIpInterface {
	fn offer_service(&self, service: ServiceId, instance: InstanceId) {
		self.calls.lock().unwrap().push(RecordedCall::OfferService(service, instance));
	}

	fn request_service(&self, service: ServiceId, instance: InstanceId) {
		self.calls.lock().unwrap().push(RecordedCall::RequestService(service, instance));
	}

	fn offer_event(
		&self,
		service: ServiceId,
		instance: InstanceId,
		event: EventId,
		eventgroups: HashSet<EventGroupId>,
	) {
		let mut eventgroups: Vec<_> = eventgroups.into_iter().collect();
		eventgroups.sort_unstable();
		self.calls
			.lock()
			.unwrap()
			.push(RecordedCall::OfferEvent(service, instance, event, eventgroups));
	}

	fn request_event(
		&self,
		service: ServiceId,
		instance: InstanceId,
		event: EventId,
		eventgroups: HashSet<EventGroupId>,
	) {
		let mut eventgroups: Vec<_> = eventgroups.into_iter().collect();
		eventgroups.sort_unstable();
		self.calls
			.lock()
			.unwrap()
			.push(RecordedCall::RequestEvent(service, instance, event, eventgroups));
	}

	fn subscribe(&self, service: ServiceId, instance: InstanceId, eventgroup: EventGroupId) {
		self.calls.lock().unwrap().push(RecordedCall::Subscribe(service, instance, eventgroup));
	}

	fn unsubscribe(&self, service: ServiceId, instance: InstanceId, eventgroup: EventGroupId) {
		self.calls.lock().unwrap().push(RecordedCall::Unsubscribe(service, instance, eventgroup));
	}

	fn notify(&self, service: ServiceId, instance: InstanceId, event: EventId, payload: Bytes) {
		self.calls
			.lock()
			.unwrap()
			.push(RecordedCall::Notify(service, instance, event, payload));
	}

	fn send_request(&self, message: SomeIpMessage) {
		self.calls.lock().unwrap().push(RecordedCall::SendRequest(message));
	}

	fn send_response(&self, message: SomeIpMessage) {
		self.calls.lock().unwrap().push(RecordedCall::SendResponse(message));
	}

	fn is_method(&self, resource_id: crate::ids::UResourceId) -> bool {
		self.methods.lock().unwrap().contains(&resource_id)
	}

	fn register_message_handler(
		&self,
		_service: ServiceId,
		_instance: InstanceId,
		_method: MethodId,
		callback: MessageHandler,
	) {
		*self.message_handler.lock().unwrap() = Some(callback);
	}

	fn register_availability_handler(
		&self,
		_service: ServiceId,
		_instance: InstanceId,
		callback: AvailabilityHandler,
	) {
		*self.availability_handler.lock().unwrap() = Some(callback);
	}

	fn register_subscription_handler(
		&self,
		_service: ServiceId,
		_instance: InstanceId,
		eventgroup: EventGroupId,
		callback: SubscriptionHandler,
	) {
		self.subscription_handlers.lock().unwrap().push((eventgroup, callback));
	}

	fn register_subscription_status_handler(
		&self,
		_service: ServiceId,
		_instance: InstanceId,
		eventgroup: EventGroupId,
		_event: EventId,
		callback: SubscriptionStatusHandler,
	) {
		self.subscription_status_handlers.lock().unwrap().push((eventgroup, callback));
	}
}

#[derive(Default)]
pub struct FakeRouter {
	registered: Mutex<bool>,
	routed: Mutex<Vec<UMessage>>,
}

impl FakeRouter {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			registered: Mutex::new(true),
			routed: Mutex::new(Vec::new()),
		})
	}

	pub fn routed(&self) -> Vec<UMessage> {
		self.routed.lock().unwrap().clone()
	}

	pub fn set_registered(&self, registered: bool) {
		*self.registered.lock().unwrap() = registered;
	}
}

impl Router for FakeRouter {
	fn is_registered(&self) -> bool {
		*self.registered.lock().unwrap()
	}

	fn route_inbound(&self, message: UMessage) {
		self.routed.lock().unwrap().push(message);
	}
}

/// A translator that carries payloads through untouched and fabricates
/// just enough addressing to keep messages distinguishable. Good enough
/// for exercising dispatch logic; a real deployment's translator would
/// encode/decode actual SOME/IP payload layouts.
#[derive(Default)]
pub struct PassthroughTranslator;

impl PassthroughTranslator {
	pub fn new() -> Arc<Self> {
		Arc::new(Self)
	}

	fn resource_uuri(entity: &UEntity, authority: &UAuthority, resource: &UResource) -> UUri {
		UUri {
			authority: authority.clone(),
			entity: entity.clone(),
			resource: resource.clone(),
		}
	}
}

impl MessageTranslator for PassthroughTranslator {
	fn someip_request_to_umessage(
		&self,
		someip: &SomeIpMessage,
		entity: &UEntity,
		resource: &UResource,
	) -> Result<UMessage, TranslationError> {
		Ok(UMessage {
			attributes: UAttributes {
				id: uuid::Uuid::new_v4().to_string(),
				message_type: UMessageType::Request,
				source: Self::resource_uuri(entity, &UAuthority { name: String::new() }, resource),
				sink: None,
				reqid: None,
				ttl_ms: None,
			},
			payload: someip.payload.clone(),
		})
	}

	fn someip_response_to_umessage(
		&self,
		someip: &SomeIpMessage,
		original_request_uuid: &str,
		respond_to: &UUri,
	) -> Result<UMessage, TranslationError> {
		Ok(UMessage {
			attributes: UAttributes {
				id: uuid::Uuid::new_v4().to_string(),
				message_type: UMessageType::Response,
				source: respond_to.clone(),
				sink: Some(respond_to.clone()),
				reqid: Some(original_request_uuid.to_string()),
				ttl_ms: None,
			},
			payload: someip.payload.clone(),
		})
	}

	fn someip_notification_to_umessage(
		&self,
		someip: &SomeIpMessage,
		entity: &UEntity,
		authority: &UAuthority,
		resource: &UResource,
	) -> Result<UMessage, TranslationError> {
		Ok(UMessage {
			attributes: UAttributes {
				id: uuid::Uuid::new_v4().to_string(),
				message_type: UMessageType::Publish,
				source: Self::resource_uuri(entity, authority, resource),
				sink: None,
				reqid: None,
				ttl_ms: None,
			},
			payload: someip.payload.clone(),
		})
	}

	fn subscription_ack_to_umessage(
		&self,
		entity: &UEntity,
		authority: &UAuthority,
		resource: &UResource,
	) -> Result<UMessage, TranslationError> {
		Ok(UMessage {
			attributes: UAttributes {
				id: uuid::Uuid::new_v4().to_string(),
				message_type: UMessageType::Publish,
				source: Self::resource_uuri(entity, authority, resource),
				sink: None,
				reqid: None,
				ttl_ms: None,
			},
			payload: Bytes::new(),
		})
	}

	fn umessage_to_someip_request(&self, message: &UMessage) -> Result<SomeIpMessage, TranslationError> {
		let sink = message.attributes.sink.as_ref().ok_or(TranslationError::MissingSink)?;
		Ok(SomeIpMessage {
			message_type: crate::someip::SomeIpMessageType::Request,
			service_id: (sink.entity.id & 0xFFFF) as u16,
			instance_id: crate::ids::INSTANCE_ID_PER_SPEC,
			method_id: sink.resource.id,
			client_id: 1,
			request_id: next_request_id(),
			payload: message.payload.clone(),
		})
	}
}

fn next_request_id() -> u32 {
	use std::sync::atomic::{AtomicU32, Ordering};
	static NEXT: AtomicU32 = AtomicU32::new(1);
	NEXT.fetch_add(1, Ordering::Relaxed)
}
