use futures::channel::mpsc;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::error;
use wasm_bindgen::prelude::*;
use web_sys::{Event, IdbRequest};

use super::cb_future::Listener;
use crate::error::{describe_event, IdbError};

/// Every success event on a request (a cursor re-fires `success` on each `continue()`), until the first error.
pub fn cb_stream(request: &IdbRequest) -> CBStream { CBStream::new(request) }

pub struct CBStream {
    receiver: mpsc::UnboundedReceiver<Result<JsValue, IdbError>>,
    _listeners: [Listener; 2],
}

impl CBStream {
    pub fn new(request: &IdbRequest) -> Self {
        let (sender, receiver) = mpsc::unbounded();

        let success_callback = Closure::wrap(Box::new({
            let sender = sender.clone();
            let request = request.clone();
            move |_event: Event| {
                let item = request.result().map_err(|e| IdbError::host("read cursor request result", e));
                let _ = sender.unbounded_send(item);
            }
        }) as Box<dyn FnMut(_)>);

        let error_callback = Closure::wrap(Box::new(move |event: Event| {
            error!("CB Stream error: {}", describe_event(&event));
            let _ = sender.unbounded_send(Err(IdbError::Request(send_wrapper::SendWrapper::new(event))));
            sender.close_channel();
        }) as Box<dyn FnMut(_)>);

        let listeners = [Listener::register(request, "success", success_callback), Listener::register(request, "error", error_callback)];
        Self { receiver, _listeners: listeners }
    }
}

impl Stream for CBStream {
    type Item = Result<JsValue, IdbError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> { Pin::new(&mut self.receiver).poll_next(cx) }
}
