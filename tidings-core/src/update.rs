//! Update trait for inbound events.

/// An inbound event delivered by the remote service.
///
/// The dispatch core never looks inside an update. It only needs the
/// strictly increasing [`id`](Update::id) to advance the delivery cursor;
/// everything else is inspected through caller-supplied predicates.
///
/// The classification accessors default to `None` so that plain event types
/// only have to provide an id. Chat-shaped updates can override them to make
/// the ready-made predicates in `tidings-std::filters` work.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Debug)]
/// struct Incoming { update_id: u64, chat: i64, text: String }
///
/// impl Update for Incoming {
///     fn id(&self) -> u64 { self.update_id }
///     fn chat_id(&self) -> Option<i64> { Some(self.chat) }
///     fn text(&self) -> Option<&str> { Some(&self.text) }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a valid Update",
    label = "must implement `Update` and be `Send + Sync + 'static`",
    note = "Updates need a monotonically increasing `id()` to be dispatched."
)]
pub trait Update: Send + Sync + 'static {
    /// The monotonically increasing identifier assigned by the remote service.
    fn id(&self) -> u64;

    /// The conversation this update belongs to.
    ///
    /// Private conversations carry positive ids, group conversations negative ones.
    fn chat_id(&self) -> Option<i64> {
        None
    }

    /// The originator of the update.
    fn sender_id(&self) -> Option<i64> {
        None
    }

    /// The textual content, if any.
    fn text(&self) -> Option<&str> {
        None
    }
}

impl<T: Update> Update for Box<T> {
    fn id(&self) -> u64 {
        (**self).id()
    }

    fn chat_id(&self) -> Option<i64> {
        (**self).chat_id()
    }

    fn sender_id(&self) -> Option<i64> {
        (**self).sender_id()
    }

    fn text(&self) -> Option<&str> {
        (**self).text()
    }
}
