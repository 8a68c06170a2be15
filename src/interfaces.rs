//! The collaborators the handler is built against but does not own: the
//! SOME/IP stack it sends and registers callbacks with, and the
//! uProtocol-side router it hands inbound messages to. Kept as traits so
//! tests can swap in fakes instead of a real vsomeip/up-rust wiring.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::TranslationError;
use crate::ids::{ClientId, EventGroupId, EventId, InstanceId, MethodId, ServiceId};
use crate::someip::SomeIpMessage;
use crate::uprotocol::{UAuthority, UEntity, UMessage, UResource};

pub type AvailabilityHandler = Arc<dyn Fn(ServiceId, InstanceId, bool) + Send + Sync>;
pub type MessageHandler = Arc<dyn Fn(SomeIpMessage) + Send + Sync>;
/// Returns whether the (un)subscribe should be accepted.
pub type SubscriptionHandler = Arc<dyn Fn(ClientId, bool) -> bool + Send + Sync>;
pub type SubscriptionStatusHandler =
	Arc<dyn Fn(ServiceId, InstanceId, EventGroupId, EventId, u16) + Send + Sync>;

/// The SOME/IP-side surface the handler drives: offering and requesting
/// services, subscribing to and notifying eventgroups, and sending
/// requests/responses. Modelled closely on vsomeip's `application`
/// interface, trimmed to what the handler actually calls.
pub trait SomeIpInterface: Send + Sync {
	fn offer_service(&self, service: ServiceId, instance: InstanceId);
	fn request_service(&self, service: ServiceId, instance: InstanceId);
	fn offer_event(
		&self,
		service: ServiceId,
		instance: InstanceId,
		event: EventId,
		eventgroups: HashSet<EventGroupId>,
	);
	fn request_event(
		&self,
		service: ServiceId,
		instance: InstanceId,
		event: EventId,
		eventgroups: HashSet<EventGroupId>,
	);
	fn subscribe(&self, service: ServiceId, instance: InstanceId, eventgroup: EventGroupId);
	fn unsubscribe(&self, service: ServiceId, instance: InstanceId, eventgroup: EventGroupId);
	fn notify(
		&self,
		service: ServiceId,
		instance: InstanceId,
		event: EventId,
		payload: Bytes,
	);
	fn send_request(&self, message: SomeIpMessage);
	fn send_response(&self, message: SomeIpMessage);

	/// Whether `resource_id` names a method rather than an event/eventgroup.
	/// Methods need no further offer beyond the generic message handler
	/// every handler registers at construction; events need `offer_event`
	/// and a subscription handler.
	fn is_method(&self, resource_id: crate::ids::UResourceId) -> bool;

	fn register_message_handler(
		&self,
		service: ServiceId,
		instance: InstanceId,
		method: MethodId,
		callback: MessageHandler,
	);
	fn register_availability_handler(
		&self,
		service: ServiceId,
		instance: InstanceId,
		callback: AvailabilityHandler,
	);
	fn register_subscription_handler(
		&self,
		service: ServiceId,
		instance: InstanceId,
		eventgroup: EventGroupId,
		callback: SubscriptionHandler,
	);
	fn register_subscription_status_handler(
		&self,
		service: ServiceId,
		instance: InstanceId,
		eventgroup: EventGroupId,
		event: EventId,
		callback: SubscriptionStatusHandler,
	);
}

/// The uProtocol-side destination for messages arriving off SOME/IP.
pub trait Router: Send + Sync {
	fn is_registered(&self) -> bool;
	fn route_inbound(&self, message: UMessage);
}

/// Translates between the two wire models. Kept separate from `Router`
/// because a router forwards messages, while a translator only reshapes
/// them; pairing them in one trait would force every router fake to also
/// reimplement translation.
pub trait MessageTranslator: Send + Sync {
	fn someip_request_to_umessage(
		&self,
		someip: &SomeIpMessage,
		entity: &UEntity,
		resource: &UResource,
	) -> Result<UMessage, TranslationError>;

	fn someip_response_to_umessage(
		&self,
		someip: &SomeIpMessage,
		original_request_uuid: &str,
		respond_to: &crate::uprotocol::UUri,
	) -> Result<UMessage, TranslationError>;

	fn someip_notification_to_umessage(
		&self,
		someip: &SomeIpMessage,
		entity: &UEntity,
		authority: &UAuthority,
		resource: &UResource,
	) -> Result<UMessage, TranslationError>;

	fn subscription_ack_to_umessage(
		&self,
		entity: &UEntity,
		authority: &UAuthority,
		resource: &UResource,
	) -> Result<UMessage, TranslationError>;

	fn umessage_to_someip_request(
		&self,
		message: &UMessage,
	) -> Result<SomeIpMessage, TranslationError>;
}
