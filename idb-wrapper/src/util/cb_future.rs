use futures::channel::oneshot;
use futures::FutureExt;
use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tracing::{debug, error};
use wasm_bindgen::prelude::*;
use web_sys::{Event, EventTarget, IdbRequest};

use super::require::WBGRequire;
use crate::error::{describe_event, IdbError};

/// A future that settles exactly once, with whichever of the given events fires first.
///
/// Success events resolve `Ok`, error events resolve `Err`; both carry the event that fired.
pub struct CBFuture {
    receiver: oneshot::Receiver<Result<Event, Event>>,
    _sender: Settle,
    _listeners: Vec<Listener>,
}

#[derive(Clone)]
pub enum EventNames {
    Single(Option<&'static str>),
    Multiple { events: &'static [&'static str], index: usize },
}

impl Iterator for EventNames {
    type Item = &'static str;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            EventNames::Single(opt) => opt.take(),
            EventNames::Multiple { events, index } => {
                let ev = *events.get(*index)?;
                *index += 1;
                Some(ev)
            }
        }
    }
}

impl From<&'static str> for EventNames {
    fn from(event: &'static str) -> Self { Self::Single(Some(event)) }
}

impl<const N: usize> From<&'static [&'static str; N]> for EventNames {
    fn from(events: &'static [&'static str; N]) -> Self { Self::Multiple { events, index: 0 } }
}

/// An event listener that unregisters itself when dropped.
pub(crate) struct Listener {
    target: EventTarget,
    event_name: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    pub(crate) fn register(target: &EventTarget, event_name: &'static str, callback: Closure<dyn FnMut(Event)>) -> Self {
        if let Err(e) = target.add_event_listener_with_callback(event_name, callback.as_ref().unchecked_ref()) {
            error!("failed to listen for {event_name}: {}", crate::error::extract_message(&e));
        }
        Self { target: target.clone(), event_name, callback }
    }
}

impl Drop for Listener {
    fn drop(&mut self) { let _ = self.target.remove_event_listener_with_callback(self.event_name, self.callback.as_ref().unchecked_ref()); }
}

type Settle = Rc<RefCell<Option<oneshot::Sender<Result<Event, Event>>>>>;

impl CBFuture {
    pub fn new<T: AsRef<EventTarget>, S: Into<EventNames>, E: Into<EventNames>>(target: T, success_events: S, error_events: E) -> Self {
        let (sender, receiver) = oneshot::channel();
        let sender: Settle = Rc::new(RefCell::new(Some(sender)));
        let target = target.as_ref();

        let mut listeners = Vec::new();
        for event_name in success_events.into() {
            let callback = Closure::wrap(Box::new({
                let sender = sender.clone();
                move |event: Event| {
                    if let Some(sender) = sender.borrow_mut().take() {
                        let _ = sender.send(Ok(event));
                    }
                }
            }) as Box<dyn FnMut(_)>);
            listeners.push(Listener::register(target, event_name, callback));
        }
        for event_name in error_events.into() {
            let callback = Closure::wrap(Box::new({
                let sender = sender.clone();
                move |event: Event| {
                    error!("CB Future error: {}", describe_event(&event));
                    if let Some(sender) = sender.borrow_mut().take() {
                        let _ = sender.send(Err(event));
                    }
                }
            }) as Box<dyn FnMut(_)>);
            listeners.push(Listener::register(target, event_name, callback));
        }

        Self { receiver, _sender: sender, _listeners: listeners }
    }
}

impl Future for CBFuture {
    type Output = Result<Event, Event>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // we hold the sender ourselves, so the channel is never canceled; with no event names it just stays pending
        match self.receiver.poll_unpin(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(oneshot::Canceled)) | Poll::Pending => Poll::Pending,
        }
    }
}

/// Awaits a single request: its `result` on success, the unmodified error event otherwise.
pub async fn settle(request: &IdbRequest) -> Result<JsValue, IdbError> {
    match CBFuture::new(request, "success", "error").await {
        Ok(_) => {
            let result = request.result().require("read request result")?;
            debug!("request settled");
            Ok(result)
        }
        Err(event) => Err(IdbError::Request(send_wrapper::SendWrapper::new(event))),
    }
}
