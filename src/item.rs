//! The queue's payload type. One variant per thing that can land on the
//! dispatch loop's desk, each carrying exactly what its handler needs —
//! the sum-type replacement for the opaque `(tag, void*)` pairs the
//! original handler pushed onto its queue.

use crate::someip::{SomeIpMessage, SubscriptionStatus};
use crate::uprotocol::{UMessage, UUri};

#[derive(Debug)]
pub enum QItem {
	/// A uMessage a local producer wants translated and sent over SOME/IP.
	Outbound(UMessage),
	/// A SOME/IP message (request, response or notification) received off
	/// the wire.
	Inbound(SomeIpMessage),
	/// A remote subscribe/unsubscribe request landing on a server-role
	/// handler.
	InboundSubscription(SubscriptionStatus),
	/// The ack for a subscription this handler asked for, as a client.
	InboundSubscriptionAck(SubscriptionStatus),
	/// A resource this handler should start offering, queued so the
	/// registration happens on the dispatch thread rather than whatever
	/// thread discovered the resource.
	OfferUResource(UUri),
	/// Drains the current queue and lets the dispatch loop return once
	/// seen, provided `running` was cleared before it was enqueued.
	Stop,
}

/// Default priority level used by every producer in this crate, matching
/// the single priority class the original handler's call sites actually
/// exercised (the queue itself supports any number of levels).
pub const DEFAULT_PRIORITY: u16 = 0;
