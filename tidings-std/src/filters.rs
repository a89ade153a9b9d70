//! Ready-made predicates for chat updates.
//!
//! They rely on the optional accessors of [`Update`]; an update that does not
//! provide the inspected field never matches.
//!
//! ```rust,ignore
//! RouterBuilder::<TestUpdate>::new()
//!     .filter(filters::is_private)
//!     .branch(filters::text_starts_with("ping"), pong)
//!     .filter(filters::not(filters::from_sender(BANNED)))
//!     .handle(everything_else);
//! ```

use tidings_core::Update;

/// Updates from a private conversation (positive chat id).
pub fn is_private<E: Update>(update: &E) -> bool {
    update.chat_id().is_some_and(|id| id > 0)
}

/// Updates from a group conversation (negative chat id).
pub fn is_group<E: Update>(update: &E) -> bool {
    update.chat_id().is_some_and(|id| id < 0)
}

/// Updates whose first word is the command `name`.
///
/// `/start@my_bot` matches `command("/start")`.
pub fn command<E: Update>(name: &str) -> impl Fn(&E) -> bool + Send + Sync + 'static {
    let name = name.to_string();
    move |update: &E| {
        update
            .text()
            .and_then(|text| text.split_whitespace().next())
            .map(|word| word.split('@').next().unwrap_or(word))
            .is_some_and(|word| word == name)
    }
}

/// Updates whose text is exactly `expected`.
pub fn text_eq<E: Update>(expected: &str) -> impl Fn(&E) -> bool + Send + Sync + 'static {
    let expected = expected.to_string();
    move |update: &E| update.text() == Some(expected.as_str())
}

/// Updates whose text starts with `prefix`.
pub fn text_starts_with<E: Update>(prefix: &str) -> impl Fn(&E) -> bool + Send + Sync + 'static {
    let prefix = prefix.to_string();
    move |update: &E| update.text().is_some_and(|text| text.starts_with(&prefix))
}

/// Updates sent by `sender`.
pub fn from_sender<E: Update>(sender: i64) -> impl Fn(&E) -> bool + Send + Sync + 'static {
    move |update: &E| update.sender_id() == Some(sender)
}

/// Updates belonging to conversation `chat`.
pub fn in_chat<E: Update>(chat: i64) -> impl Fn(&E) -> bool + Send + Sync + 'static {
    move |update: &E| update.chat_id() == Some(chat)
}

/// Both predicates hold.
pub fn and<E, A, B>(a: A, b: B) -> impl Fn(&E) -> bool + Send + Sync + 'static
where
    E: Update,
    A: Fn(&E) -> bool + Send + Sync + 'static,
    B: Fn(&E) -> bool + Send + Sync + 'static,
{
    move |update: &E| a(update) && b(update)
}

/// Either predicate holds.
pub fn or<E, A, B>(a: A, b: B) -> impl Fn(&E) -> bool + Send + Sync + 'static
where
    E: Update,
    A: Fn(&E) -> bool + Send + Sync + 'static,
    B: Fn(&E) -> bool + Send + Sync + 'static,
{
    move |update: &E| a(update) || b(update)
}

/// The predicate does not hold.
pub fn not<E, P>(predicate: P) -> impl Fn(&E) -> bool + Send + Sync + 'static
where
    E: Update,
    P: Fn(&E) -> bool + Send + Sync + 'static,
{
    move |update: &E| !predicate(update)
}
