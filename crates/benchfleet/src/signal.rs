use parking_lot::Mutex;
use std::{
  future::Future,
  sync::Arc,
  task::{Context, Poll, Waker},
};

#[derive(Debug)]
struct SignalState {
  shutdown: bool,
  wakers: Vec<Waker>,
}

/// One-shot process shutdown signal, observable by any number of tasks.
/// Long-lived loops (daemon ticks, reporter backoff sleeps, the dispatch
/// sweeper) select on `recv` so shutdown stops them between steps instead
/// of interrupting in-flight work.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
  state: Arc<Mutex<SignalState>>,
}

impl ShutdownSignal {
  pub fn new() -> Self {
    Self {
      state: Arc::new(Mutex::new(SignalState {
        shutdown: false,
        wakers: Vec::new(),
      })),
    }
  }

  pub fn shutdown(&self) {
    let mut state = self.state.lock();
    state.shutdown = true;

    for waker in state.wakers.drain(..) {
      waker.wake();
    }
  }

  pub fn is_shutdown(&self) -> bool {
    self.state.lock().shutdown
  }

  pub fn recv(&self) -> ShutdownReceiver<'_> {
    ShutdownReceiver { signal: self }
  }
}

impl Default for ShutdownSignal {
  fn default() -> Self {
    Self::new()
  }
}

pub struct ShutdownReceiver<'a> {
  signal: &'a ShutdownSignal,
}

impl<'a> Future for ShutdownReceiver<'a> {
  type Output = ();

  fn poll(self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut state = self.signal.state.lock();

    if state.shutdown {
      Poll::Ready(())
    } else {
      state.wakers.push(cx.waker().clone());
      Poll::Pending
    }
  }
}
