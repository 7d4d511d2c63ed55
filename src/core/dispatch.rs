//! Routing of server-pushed messages to registered handlers

use std::collections::HashMap;

use serde_json::Value;
use tracing::trace;

use super::protocol::MessageKind;

type Handler<C, E> = Box<dyn FnMut(&mut C, &[Value]) -> Result<(), E>>;

/// Maps message tags to handlers run against a context `C`
pub struct Dispatcher<C, E> {
    handlers: HashMap<String, Vec<Handler<C, E>>>,
}

impl<C, E> Default for Dispatcher<C, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, E> Dispatcher<C, E> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler. Handlers for one tag run in registration order.
    pub fn on<F>(&mut self, kind: MessageKind, handler: F)
    where
        F: FnMut(&mut C, &[Value]) -> Result<(), E> + 'static,
    {
        self.handlers
            .entry(kind.tag().to_string())
            .or_default()
            .push(Box::new(handler));
    }

    pub fn handler_count(&self, kind: MessageKind) -> usize {
        self.handlers.get(kind.tag()).map_or(0, Vec::len)
    }

    /// Run every handler registered for `tag`.
    ///
    /// All handlers run even if one fails; the first failure is returned.
    /// A tag nobody listens for is not an error.
    pub fn dispatch(&mut self, ctx: &mut C, tag: &str, args: &[Value]) -> Result<(), E> {
        let Some(handlers) = self.handlers.get_mut(tag) else {
            trace!(tag, "no handlers");
            return Ok(());
        };

        let mut first_err = None;
        for handler in handlers.iter_mut() {
            if let Err(e) = handler(ctx, args) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handlers_run_in_order() {
        let mut dispatcher: Dispatcher<Vec<String>, ()> = Dispatcher::new();
        dispatcher.on(MessageKind::Status, |log, args| {
            log.push(format!("first {}", args[0]));
            Ok(())
        });
        dispatcher.on(MessageKind::Status, |log, _| {
            log.push("second".to_string());
            Ok(())
        });

        let mut log = Vec::new();
        dispatcher.dispatch(&mut log, "u", &[json!("hi")]).unwrap();
        dispatcher.dispatch(&mut log, "u", &[json!("again")]).unwrap();
        assert_eq!(log, vec!["first \"hi\"", "second", "first \"again\"", "second"]);
        assert_eq!(dispatcher.handler_count(MessageKind::Status), 2);
    }

    #[test]
    fn test_unknown_tag_is_ignored() {
        let mut dispatcher: Dispatcher<u32, ()> = Dispatcher::new();
        dispatcher.on(MessageKind::Chat, |n, _| {
            *n += 1;
            Ok(())
        });
        let mut n = 0;
        assert!(dispatcher.dispatch(&mut n, "!", &[]).is_ok());
        assert!(dispatcher.dispatch(&mut n, "u", &[]).is_ok());
        assert_eq!(n, 0);
    }

    #[test]
    fn test_failure_does_not_stop_later_handlers() {
        let mut dispatcher: Dispatcher<u32, &'static str> = Dispatcher::new();
        dispatcher.on(MessageKind::Error, |_, _| Err("first"));
        dispatcher.on(MessageKind::Error, |_, _| Err("second"));
        dispatcher.on(MessageKind::Error, |n, _| {
            *n += 1;
            Ok(())
        });
        let mut n = 0;
        assert_eq!(dispatcher.dispatch(&mut n, "e", &[]), Err("first"));
        assert_eq!(n, 1);
    }
}
