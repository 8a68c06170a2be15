//! End-to-end dispatch scenarios driven against the bundled in-memory
//! fakes. Every test pumps the dispatch loop itself via `run_once`
//! instead of racing a real background thread, so outcomes are
//! deterministic.

use std::sync::Arc;

use bytes::Bytes;

use someip_uprotocol_bridge::config::BridgeConfig;
use someip_uprotocol_bridge::handler::SomeipHandler;
use someip_uprotocol_bridge::ids::{Role, UT_SUBSCRIPTION_REQUEST_SINK_URI_UEID};
use someip_uprotocol_bridge::scheduler::NoopScheduler;
use someip_uprotocol_bridge::someip::{SomeIpMessage, SomeIpMessageType};
use someip_uprotocol_bridge::testing::{FakeRouter, FakeSomeIpInterface, PassthroughTranslator, RecordedCall};
use someip_uprotocol_bridge::uprotocol::{UAttributes, UAuthority, UEntity, UMessage, UMessageType, UResource, UUri};

type Handler = SomeipHandler<FakeSomeIpInterface, FakeRouter, PassthroughTranslator, NoopScheduler>;

fn build_handler(role: Role, default_ttl_ms: u32) -> (Arc<Handler>, Arc<FakeSomeIpInterface>, Arc<FakeRouter>) {
	let config = BridgeConfig {
		entity_id: 0x1001,
		entity_version: 1,
		authority_name: "vehicle1".into(),
		role,
		queue_priority_levels: 3,
		default_ttl_ms,
	};
	let someip = FakeSomeIpInterface::new();
	let router = FakeRouter::new();
	let translator = PassthroughTranslator::new();
	let scheduler = Arc::new(NoopScheduler);

	let handler = SomeipHandler::new(&config, Arc::clone(&someip), Arc::clone(&router), translator, scheduler);
	(handler, someip, router)
}

fn drain(handler: &Handler) {
	while handler.run_once() {}
}

fn resource(id: u16, name: &str) -> UResource {
	UResource {
		id,
		name: name.into(),
		instance: None,
	}
}

fn uuri(authority: &str, entity_id: u32, resource: UResource) -> UUri {
	UUri {
		authority: UAuthority { name: authority.into() },
		entity: UEntity { id: entity_id, version: 1 },
		resource,
	}
}

fn request_message(id: &str, source: UUri, sink: UUri, payload: &'static [u8], ttl_ms: u32) -> UMessage {
	UMessage {
		attributes: UAttributes {
			id: id.into(),
			message_type: UMessageType::Request,
			source,
			sink: Some(sink),
			reqid: None,
			ttl_ms: Some(ttl_ms),
		},
		payload: Bytes::from_static(payload),
	}
}

#[test]
fn client_request_response_round_trip() {
	let (handler, someip, router) = build_handler(Role::Client, 5_000);
	handler.start_for_test();
	handler.on_availability(0x1001, 1, true);

	let method = resource(0x0421, "GetOdometer");
	let sink = uuri("vehicle1", 0x1001, method.clone());
	let source = uuri("local", 0x2000, resource(0, "rpc.response"));
	let request = request_message("req-1", source, sink, b"ping", 5_000);

	assert!(handler.queue_outbound_msg(request));
	drain(&handler);

	let sent_request_id = match someip.calls().last() {
		Some(RecordedCall::SendRequest(message)) => {
			assert_eq!(message.method_id, 0x0421);
			assert_eq!(message.payload, Bytes::from_static(b"ping"));
			message.request_id
		}
		other => panic!("expected a SendRequest call, got {other:?}"),
	};

	let response = SomeIpMessage {
		message_type: SomeIpMessageType::Response,
		service_id: 0x1001,
		instance_id: someip_uprotocol_bridge::ids::INSTANCE_ID_PER_SPEC,
		method_id: 0x0421,
		client_id: 1,
		request_id: sent_request_id,
		payload: Bytes::from_static(b"pong"),
	};
	someip.deliver(response);
	drain(&handler);

	let routed = router.routed();
	let reply = routed.last().expect("response should have been routed");
	assert_eq!(reply.message_type(), UMessageType::Response);
	assert_eq!(reply.attributes.reqid.as_deref(), Some("req-1"));
	assert_eq!(reply.payload, Bytes::from_static(b"pong"));
}

#[test]
fn server_inbound_request_response_round_trip() {
	let (handler, someip, router) = build_handler(Role::Server, 5_000);
	handler.start_for_test();

	let method = resource(0x0810, "SetClimate");
	someip.mark_as_method(0x0810);
	handler.queue_offer_uresource(uuri("vehicle1", 0x1001, method));
	drain(&handler);
	assert!(
		!someip.calls().iter().any(|call| matches!(call, RecordedCall::OfferEvent(..))),
		"a method needs no offer_event"
	);

	let inbound_request = SomeIpMessage {
		message_type: SomeIpMessageType::Request,
		service_id: 0x1001,
		instance_id: someip_uprotocol_bridge::ids::INSTANCE_ID_PER_SPEC,
		method_id: 0x0810,
		client_id: 9,
		request_id: 7,
		payload: Bytes::from_static(b"21C"),
	};
	someip.deliver(inbound_request);
	drain(&handler);

	let routed_request = router.routed().pop().expect("request should have been routed");
	assert_eq!(routed_request.message_type(), UMessageType::Request);

	let response = UMessage {
		attributes: UAttributes {
			id: "resp-1".into(),
			message_type: UMessageType::Response,
			source: routed_request.attributes.source.clone(),
			sink: None,
			reqid: Some(routed_request.uuid().to_string()),
			ttl_ms: None,
		},
		payload: Bytes::from_static(b"ack"),
	};
	assert!(handler.queue_outbound_msg(response));
	drain(&handler);

	match someip.calls().last() {
		Some(RecordedCall::SendResponse(message)) => {
			assert_eq!(message.request_id, 7);
			assert_eq!(message.client_id, 9);
			assert_eq!(message.payload, Bytes::from_static(b"ack"));
		}
		other => panic!("expected a SendResponse call, got {other:?}"),
	}
}

#[test]
fn notification_without_subscribers_is_dropped() {
	let (handler, someip, _router) = build_handler(Role::Server, 5_000);
	handler.start_for_test();

	let event = resource(0x8001, "SpeedEvent");
	handler.queue_offer_uresource(uuri("vehicle1", 0x1001, event.clone()));
	drain(&handler);

	let notification = UMessage {
		attributes: UAttributes {
			id: "notif-1".into(),
			message_type: UMessageType::Publish,
			source: uuri("vehicle1", 0x1001, event.clone()),
			sink: None,
			reqid: None,
			ttl_ms: None,
		},
		payload: Bytes::from_static(b"88kph"),
	};
	handler.queue_outbound_msg(notification.clone());
	drain(&handler);
	assert!(!someip.calls().iter().any(|call| matches!(call, RecordedCall::Notify(..))));

	assert!(someip.simulate_subscription(0x8001, 5, true));
	drain(&handler);

	handler.queue_outbound_msg(notification);
	drain(&handler);
	assert!(someip.calls().iter().any(|call| matches!(call, RecordedCall::Notify(..))));
}

#[test]
fn repeated_subscription_request_is_idempotent() {
	let (handler, someip, router) = build_handler(Role::Client, 5_000);
	handler.start_for_test();

	let eventgroup = resource(0x9001, "DoorEvents");
	let sink = uuri("vehicle1", UT_SUBSCRIPTION_REQUEST_SINK_URI_UEID, eventgroup.clone());

	let first = request_message(
		"sub-1",
		uuri("local", 0x2001, resource(0, "subscriber.a")),
		sink.clone(),
		b"",
		5_000,
	);
	let second = request_message(
		"sub-2",
		uuri("local", 0x2002, resource(0, "subscriber.b")),
		sink,
		b"",
		5_000,
	);

	assert!(handler.queue_outbound_msg(first));
	drain(&handler);
	// The remote service acking the first subscriber's wire subscribe.
	someip.simulate_subscription_ack(eventgroup.id, 0);
	drain(&handler);

	assert!(handler.queue_outbound_msg(second));
	drain(&handler);

	let subscribe_calls = someip
		.calls()
		.into_iter()
		.filter(|call| matches!(call, RecordedCall::Subscribe(..)))
		.count();
	assert_eq!(subscribe_calls, 1, "a second local subscriber must not re-subscribe over the wire");

	let acks_routed = router
		.routed()
		.into_iter()
		.filter(|message| message.message_type() == UMessageType::Publish)
		.count();
	assert_eq!(acks_routed, 2, "every subscriber gets its own ack, even a synthesized one");
}

#[test]
fn outbound_request_without_availability_times_out_and_is_dropped() {
	let (handler, someip, _router) = build_handler(Role::Client, 5_000);
	handler.start_for_test();

	let method = resource(0x0421, "GetOdometer");
	let sink = uuri("vehicle1", 0x1001, method);
	let source = uuri("local", 0x2000, resource(0, "rpc.response"));
	let request = request_message("req-timeout", source, sink, b"ping", 30);

	assert!(handler.queue_outbound_msg(request));
	drain(&handler);

	assert!(!someip.calls().iter().any(|call| matches!(call, RecordedCall::SendRequest(_))));
}

#[test]
fn queueing_while_not_running_is_rejected() {
	let (handler, someip, _router) = build_handler(Role::Client, 5_000);

	let method = resource(0x0421, "GetOdometer");
	let sink = uuri("vehicle1", 0x1001, method);
	let source = uuri("local", 0x2000, resource(0, "rpc.response"));
	let request = request_message("req-not-running", source, sink, b"ping", 5_000);

	assert!(!handler.queue_outbound_msg(request));
	assert!(someip.calls().is_empty());
}

#[test]
fn subscription_request_dropped_when_router_not_registered() {
	let (handler, someip, router) = build_handler(Role::Client, 5_000);
	handler.start_for_test();
	router.set_registered(false);

	let eventgroup = resource(0x9005, "WindowEvents");
	let sink = uuri("vehicle1", UT_SUBSCRIPTION_REQUEST_SINK_URI_UEID, eventgroup.clone());
	let request = request_message(
		"sub-dropped",
		uuri("local", 0x2003, resource(0, "subscriber.c")),
		sink,
		b"",
		5_000,
	);

	assert!(handler.queue_outbound_msg(request));
	drain(&handler);

	assert!(!someip.calls().iter().any(|call| matches!(call, RecordedCall::Subscribe(..))));
	assert!(router.routed().is_empty());
}
