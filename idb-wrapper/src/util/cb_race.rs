use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::oneshot::{self, error::TryRecvError};
use wasm_bindgen::prelude::Closure;

/// the first callback to finish wins
pub struct CBRace<T: 'static> {
    sender: Rc<RefCell<Option<oneshot::Sender<T>>>>,
    receiver: oneshot::Receiver<T>,
}

impl<T: 'static> CBRace<T> {
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self { sender: Rc::new(RefCell::new(Some(sender))), receiver }
    }

    /// Wrap a closure, sending its result through the channel, returns the js function ref
    pub fn wrap<Args>(&self, mut f: impl FnMut(Args) -> T + 'static) -> Closure<dyn FnMut(Args)>
    where Args: wasm_bindgen::convert::FromWasmAbi + 'static {
        let sender = self.sender.clone();
        Closure::wrap(Box::new(move |args| {
            let result = f(args);
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(result);
            }
        }))
    }

    /// The winning result, if a wrapped callback has run
    pub fn take(&mut self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }
}

impl<E: 'static> CBRace<Result<(), E>> {
    /// The error returned by the winning callback; `None` if it succeeded or never ran
    pub fn take_err(mut self) -> Option<E> { self.take()?.err() }
}
