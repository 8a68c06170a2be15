//! The bridge itself: a single-consumer dispatch loop sitting between a
//! SOME/IP stack and a uProtocol router, fed through a priority queue by
//! whichever thread the SOME/IP stack or a local uProtocol producer calls
//! in on.
//!
//! All correlation-table mutation happens inside [`SomeipHandler::dispatch`],
//! which only ever runs on the dispatch thread (or, in tests, on whatever
//! thread calls [`SomeipHandler::run_once`]) — never concurrently with
//! itself.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tracing::{debug, error, instrument, warn};

use crate::availability::AvailabilityLatch;
use crate::config::BridgeConfig;
use crate::correlation::{CorrelationTables, PendingOutboundRequest, ResourceInformation};
use crate::error::DispatchError;
use crate::ids::{EventGroupId, Role, UResourceId, UT_SUBSCRIPTION_REQUEST_SINK_URI_UEID};
use crate::interfaces::{MessageTranslator, Router, SomeIpInterface};
use crate::item::{QItem, DEFAULT_PRIORITY};
use crate::queue::PriorityQueue;
use crate::scheduler::Scheduler;
use crate::someip::{SomeIpMessage, SomeIpMessageType, SubscriptionStatus};
use crate::uprotocol::{UAuthority, UEntity, UMessage, UMessageType, UUri};

pub struct SomeipHandler<S, R, T, Sch>
where
	S: SomeIpInterface + 'static,
	R: Router + 'static,
	T: MessageTranslator + 'static,
	Sch: Scheduler + 'static,
{
	entity: UEntity,
	authority: UAuthority,
	role: Role,
	someip: Arc<S>,
	router: Arc<R>,
	translator: Arc<T>,
	scheduler: Arc<Sch>,
	queue: Arc<PriorityQueue<QItem>>,
	availability: Arc<AvailabilityLatch>,
	/// Availability wait bound used when an outbound request's own
	/// `ttl_ms` is absent.
	default_ttl: Duration,
	tables: Mutex<CorrelationTables>,
	running: Arc<AtomicBool>,
	top_priority: u16,
	/// A handle to this handler's own `Arc`, so dispatch code running
	/// behind `&self` can still register callbacks (e.g. a per-eventgroup
	/// subscription status handler) that need to call back into it later.
	self_weak: Weak<Self>,
}

impl<S, R, T, Sch> SomeipHandler<S, R, T, Sch>
where
	S: SomeIpInterface + 'static,
	R: Router + 'static,
	T: MessageTranslator + 'static,
	Sch: Scheduler + 'static,
{
	pub fn new(
		config: &BridgeConfig,
		someip: Arc<S>,
		router: Arc<R>,
		translator: Arc<T>,
		scheduler: Arc<Sch>,
	) -> Arc<Self> {
		let handler = Arc::new_cyclic(|self_weak| Self {
			entity: UEntity {
				id: config.entity_id,
				version: config.entity_version,
			},
			authority: UAuthority {
				name: config.authority_name.clone(),
			},
			role: config.role,
			someip,
			router,
			translator,
			scheduler,
			queue: Arc::new(PriorityQueue::new(config.queue_priority_levels)),
			availability: Arc::new(AvailabilityLatch::new()),
			default_ttl: Duration::from_millis(config.default_ttl_ms as u64),
			tables: Mutex::new(CorrelationTables::new()),
			running: Arc::new(AtomicBool::new(false)),
			top_priority: config.queue_priority_levels.saturating_sub(1),
			self_weak: self_weak.clone(),
		});

		handler.register_with_someip();
		handler
	}

	fn register_with_someip(self: &Arc<Self>) {
		let weak = Arc::downgrade(self);
		self.someip.register_message_handler(
			self.service_id(),
			self.instance_id(),
			crate::ids::ANY_METHOD,
			Arc::new(move |message| {
				if let Some(handler) = weak.upgrade() {
					handler.on_message(message);
				}
			}),
		);

		match self.role {
			Role::Client => {
				if self.router.is_registered() {
					let weak = Arc::downgrade(self);
					self.someip.register_availability_handler(
						self.service_id(),
						self.instance_id(),
						Arc::new(move |service, instance, available| {
							if let Some(handler) = weak.upgrade() {
								handler.on_availability(service, instance, available);
							}
						}),
					);
					self.someip.request_service(self.service_id(), self.instance_id());
				}
			}
			Role::Server => {
				self.someip.offer_service(self.service_id(), self.instance_id());
			}
		}
	}

	fn service_id(&self) -> u16 {
		(self.entity.id & 0xFFFF) as u16
	}

	fn instance_id(&self) -> u16 {
		crate::ids::INSTANCE_ID_PER_SPEC
	}

	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::Acquire)
	}

	pub fn role(&self) -> Role {
		self.role
	}

	/// Marks the handler running without posting a task to the scheduler.
	/// For tests that exercise producer methods guarded by `is_running`
	/// and then pump the queue themselves via [`Self::run_once`], without
	/// going through [`Self::on_message`]'s lazy start.
	#[cfg(any(test, feature = "test-utils"))]
	pub fn start_for_test(&self) {
		self.running.store(true, Ordering::Release);
	}

	/// Registers a resource this handler offers (server role) or expects
	/// to subscribe to on a remote service (client role). Deferred onto
	/// the dispatch thread like every other producer call.
	pub fn queue_offer_uresource(&self, resource: UUri) -> bool {
		if !self.is_running() {
			warn!(resource = %resource, "dropping offer, handler is not running");
			return false;
		}
		self.queue.push(QItem::OfferUResource(resource), DEFAULT_PRIORITY)
	}

	/// Hands a locally produced uMessage to the bridge for translation and
	/// delivery over SOME/IP.
	pub fn queue_outbound_msg(&self, message: UMessage) -> bool {
		if !self.is_running() {
			warn!(uuid = %message.uuid(), "dropping outbound message, handler is not running");
			return false;
		}
		self.queue.push(QItem::Outbound(message), DEFAULT_PRIORITY)
	}

	/// Registered as the SOME/IP stack's generic message callback. Starts
	/// the dispatch thread on first call.
	pub fn on_message(self: &Arc<Self>, message: SomeIpMessage) {
		self.queue.push(QItem::Inbound(message), DEFAULT_PRIORITY);
		self.start_if_not_running();
	}

	/// Registered as the SOME/IP stack's availability callback. Only a
	/// positive transition sets the latch: a service going away is a
	/// reason to keep waiting, not a reason to wake a waiter into a
	/// spurious failure.
	pub fn on_availability(&self, _service: u16, _instance: u16, available: bool) {
		if available {
			self.availability.set_and_notify(true);
		}
	}

	/// Registered per offered eventgroup once it starts being offered.
	/// Always accepts; the bookkeeping that decides whether this is a
	/// first subscriber happens on the dispatch thread.
	pub fn on_subscription(&self, eventgroup_id: EventGroupId, client_id: u16, is_subscribed: bool) -> bool {
		self.queue.push(
			QItem::InboundSubscription(SubscriptionStatus {
				service_id: self.service_id(),
				instance_id: self.instance_id(),
				eventgroup_id,
				event_id: eventgroup_id,
				client_id,
				is_subscribed,
			}),
			DEFAULT_PRIORITY,
		);
		true
	}

	/// Registered per eventgroup this handler subscribes to as a client,
	/// to learn whether the remote service accepted the subscription.
	pub fn on_subscription_status(
		&self,
		eventgroup_id: EventGroupId,
		client_id: u16,
		status: u16,
	) {
		self.queue.push(
			QItem::InboundSubscriptionAck(SubscriptionStatus {
				service_id: self.service_id(),
				instance_id: self.instance_id(),
				eventgroup_id,
				event_id: eventgroup_id,
				client_id,
				is_subscribed: status == 0,
			}),
			DEFAULT_PRIORITY,
		);
	}

	/// Stops the dispatch loop after it drains whatever is already
	/// queued. Safe to call more than once.
	pub fn quit(&self) {
		self.running.store(false, Ordering::Release);
		self.queue.push(QItem::Stop, self.top_priority);
	}

	fn start_if_not_running(self: &Arc<Self>) {
		if self
			.running
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_ok()
		{
			let worker: Arc<Self> = Arc::clone(self);
			self.scheduler.post(Box::new(move || worker.run()));
		}
	}

	/// Blocks forever, dispatching queued items in priority order, until
	/// a [`QItem::Stop`] is dequeued after `running` has been cleared.
	pub fn run(&self) {
		loop {
			let item = self.queue.pop_blocking();
			let is_stop = matches!(item, QItem::Stop);
			self.dispatch(item);
			if is_stop && !self.is_running() {
				break;
			}
		}
	}

	/// Dispatches exactly one already-queued item, if any. Returns `false`
	/// if the queue was empty. Intended for deterministic tests that pump
	/// the loop themselves instead of spinning a real thread.
	pub fn run_once(&self) -> bool {
		match self.queue.try_pop() {
			Some(item) => {
				self.dispatch(item);
				true
			}
			None => false,
		}
	}

	#[instrument(skip_all)]
	fn dispatch(&self, item: QItem) {
		let mut tables = self.tables.lock().expect("correlation tables poisoned");
		let result = match item {
			QItem::Outbound(message) => self.handle_outbound(&mut tables, message),
			QItem::Inbound(message) => self.handle_inbound(&mut tables, message),
			QItem::InboundSubscription(status) => self.handle_inbound_subscription(&mut tables, status),
			QItem::InboundSubscriptionAck(status) => {
				self.handle_inbound_subscription_ack(&mut tables, status)
			}
			QItem::OfferUResource(uri) => self.handle_offer_uresource(&mut tables, uri),
			QItem::Stop => Ok(()),
		};
		if let Err(error) = result {
			match &error {
				DispatchError::UnknownMessageType | DispatchError::UnknownCorrelation(_) => {
					error!(%error, "dropping queued item after dispatch error");
				}
				DispatchError::UnsupportedResource(_) | DispatchError::AvailabilityTimeout => {
					warn!(%error, "dropping queued item after dispatch error");
				}
				DispatchError::UnknownReqId(_) | DispatchError::Translation(_) => {
					error!(%error, "dropping queued item after dispatch error");
				}
			}
		}
	}

	fn handle_offer_uresource(
		&self,
		tables: &mut CorrelationTables,
		uri: UUri,
	) -> Result<(), DispatchError> {
		let resource_id: UResourceId = uri.resource.id;
		let newly_offered = !tables.offered_resources.contains_key(&resource_id);
		tables
			.offered_resources
			.entry(resource_id)
			.or_insert_with(|| ResourceInformation::new(uri.resource.clone()));

		if newly_offered && !self.someip.is_method(resource_id) {
			let mut eventgroups = HashSet::new();
			eventgroups.insert(resource_id);
			self.someip
				.offer_event(self.service_id(), self.instance_id(), resource_id, eventgroups);

			let weak = self.self_weak.clone();
			self.someip.register_subscription_handler(
				self.service_id(),
				self.instance_id(),
				resource_id,
				Arc::new(move |client_id, is_subscribed| match weak.upgrade() {
					Some(handler) => handler.on_subscription(resource_id, client_id, is_subscribed),
					None => false,
				}),
			);
		}
		Ok(())
	}

	fn handle_outbound(
		&self,
		tables: &mut CorrelationTables,
		message: UMessage,
	) -> Result<(), DispatchError> {
		match message.message_type() {
			UMessageType::Publish => self.handle_outbound_notification(tables, message),
			UMessageType::Request => {
				let wants_subscription = message
					.attributes
					.sink
					.as_ref()
					.map(|sink| sink.entity.id == UT_SUBSCRIPTION_REQUEST_SINK_URI_UEID)
					.unwrap_or(false);
				if wants_subscription {
					self.handle_subscription_request_for_remote_service(tables, message)
				} else {
					self.handle_outbound_request(tables, message)
				}
			}
			UMessageType::Response => self.handle_outbound_response(tables, message),
		}
	}

	fn handle_outbound_notification(
		&self,
		tables: &CorrelationTables,
		message: UMessage,
	) -> Result<(), DispatchError> {
		let resource_id = message.attributes.source.resource.id;
		let Some(info) = tables.offered_resources.get(&resource_id) else {
			return Err(DispatchError::UnsupportedResource(resource_id));
		};
		if !info.does_subscription_exist() {
			debug!(resource_id, "no subscribers, dropping notification");
			return Ok(());
		}
		self.someip
			.notify(self.service_id(), self.instance_id(), resource_id, message.payload);
		Ok(())
	}

	fn handle_subscription_request_for_remote_service(
		&self,
		tables: &mut CorrelationTables,
		message: UMessage,
	) -> Result<(), DispatchError> {
		if !self.router.is_registered() {
			warn!("dropping subscription request, router is not registered");
			return Ok(());
		}

		let sink = message
			.attributes
			.sink
			.as_ref()
			.ok_or(crate::error::TranslationError::MissingSink)?;
		let eventgroup_id: EventGroupId = sink.resource.id;

		let already_subscribed = tables.subscriptions_for_remote_services.contains_key(&eventgroup_id);
		let info = tables
			.subscriptions_for_remote_services
			.entry(eventgroup_id)
			.or_insert_with(|| ResourceInformation::new(sink.resource.clone()));
		info.add_subscriber();

		if already_subscribed {
			// A second local subscriber doesn't need a second wire
			// subscribe; re-deliver the ack it would have gotten anyway.
			self.on_subscription_status(eventgroup_id, 0, 0);
		} else {
			let mut eventgroups = HashSet::new();
			eventgroups.insert(eventgroup_id);
			self.someip
				.request_event(self.service_id(), self.instance_id(), eventgroup_id, eventgroups);
			self.someip
				.subscribe(self.service_id(), self.instance_id(), eventgroup_id);

			let weak = self.self_weak.clone();
			self.someip.register_subscription_status_handler(
				self.service_id(),
				self.instance_id(),
				eventgroup_id,
				eventgroup_id,
				Arc::new(move |_service, _instance, eventgroup, _event, status| {
					if let Some(handler) = weak.upgrade() {
						handler.on_subscription_status(eventgroup, 0, status);
					}
				}),
			);
		}
		Ok(())
	}

	fn handle_outbound_request(
		&self,
		tables: &mut CorrelationTables,
		message: UMessage,
	) -> Result<(), DispatchError> {
		let wait = message
			.attributes
			.ttl_ms
			.map(|ttl| Duration::from_millis(ttl as u64))
			.unwrap_or(self.default_ttl);
		if !self.availability.wait_readable(wait) {
			return Err(DispatchError::AvailabilityTimeout);
		}
		let someip_request = self.translator.umessage_to_someip_request(&message)?;
		tables.pending_outbound_requests.insert(
			message.uuid().to_string(),
			PendingOutboundRequest {
				someip_request: someip_request.clone(),
				respond_to: message.attributes.source.clone(),
			},
		);
		self.someip.send_request(someip_request);
		Ok(())
	}

	fn handle_outbound_response(
		&self,
		tables: &mut CorrelationTables,
		message: UMessage,
	) -> Result<(), DispatchError> {
		let reqid = message
			.attributes
			.reqid
			.as_ref()
			.ok_or(crate::error::TranslationError::MissingReqId)?;
		let original_request = tables
			.pending_inbound_requests
			.remove(reqid)
			.ok_or_else(|| DispatchError::UnknownReqId(reqid.clone()))?;
		let response = SomeIpMessage::response_for(&original_request, message.payload);
		self.someip.send_response(response);
		Ok(())
	}

	fn handle_inbound(
		&self,
		tables: &mut CorrelationTables,
		message: SomeIpMessage,
	) -> Result<(), DispatchError> {
		match message.get_message_type() {
			SomeIpMessageType::Notification => self.handle_inbound_notification(tables, message),
			SomeIpMessageType::Request => self.handle_inbound_request(tables, message),
			SomeIpMessageType::Response => self.handle_inbound_response(tables, message),
		}
	}

	fn handle_inbound_notification(
		&self,
		tables: &CorrelationTables,
		message: SomeIpMessage,
	) -> Result<(), DispatchError> {
		let eventgroup_id = message.get_method();
		let info = tables
			.subscriptions_for_remote_services
			.get(&eventgroup_id)
			.ok_or(DispatchError::UnsupportedResource(eventgroup_id))?;
		let umsg = self.translator.someip_notification_to_umessage(
			&message,
			&self.entity,
			&self.authority,
			&info.resource,
		)?;
		self.router.route_inbound(umsg);
		Ok(())
	}

	fn handle_inbound_request(
		&self,
		tables: &mut CorrelationTables,
		message: SomeIpMessage,
	) -> Result<(), DispatchError> {
		let method_id = message.get_method();
		let info = tables
			.offered_resources
			.get(&method_id)
			.ok_or(DispatchError::UnsupportedResource(method_id))?;
		let umsg = self
			.translator
			.someip_request_to_umessage(&message, &self.entity, &info.resource)?;
		tables
			.pending_inbound_requests
			.insert(umsg.uuid().to_string(), message);
		self.router.route_inbound(umsg);
		Ok(())
	}

	fn handle_inbound_response(
		&self,
		tables: &mut CorrelationTables,
		message: SomeIpMessage,
	) -> Result<(), DispatchError> {
		let (uuid, pending) = tables
			.take_pending_outbound_request_by_someip_id(message.get_request())
			.ok_or(DispatchError::UnknownCorrelation(message.get_request()))?;
		let umsg = self
			.translator
			.someip_response_to_umessage(&message, &uuid, &pending.respond_to)?;
		self.router.route_inbound(umsg);
		Ok(())
	}

	fn handle_inbound_subscription(
		&self,
		tables: &mut CorrelationTables,
		status: SubscriptionStatus,
	) -> Result<(), DispatchError> {
		let info = tables
			.offered_resources
			.get_mut(&status.eventgroup_id)
			.ok_or(DispatchError::UnsupportedResource(status.eventgroup_id))?;
		if status.is_subscribed {
			info.add_subscriber();
		} else {
			info.remove_subscriber();
		}
		Ok(())
	}

	fn handle_inbound_subscription_ack(
		&self,
		tables: &CorrelationTables,
		status: SubscriptionStatus,
	) -> Result<(), DispatchError> {
		let info = tables
			.subscriptions_for_remote_services
			.get(&status.eventgroup_id)
			.ok_or(DispatchError::UnsupportedResource(status.eventgroup_id))?;
		if !status.is_subscribed {
			return Ok(());
		}
		let umsg = self.translator.subscription_ack_to_umessage(
			&self.entity,
			&self.authority,
			&info.resource,
		)?;
		self.router.route_inbound(umsg);
		Ok(())
	}
}
