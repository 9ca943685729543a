use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;

use crate::signaling::protocol::SignalingMsg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OutboxError {
    #[error("outbox full")]
    Full,
    #[error("outbox closed")]
    Closed,
}

/// Bounded outbound queue of one connection, drained by its writer task.
///
/// Producers never wait: `push` either queues, makes room by dropping the
/// oldest pending low-priority message, or fails with [`OutboxError::Full`].
/// A low-priority message (a presence snapshot) also replaces any pending one
/// of its kind, since only the latest snapshot matters.
///
/// Messages that are delivered keep the order in which they were pushed.
#[derive(Clone)]
pub struct Outbox {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    notify: Notify,
    capacity: usize,
}

#[derive(Default)]
struct State {
    queue: VecDeque<SignalingMsg>,
    closed: bool,
}

impl Outbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                notify: Notify::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn push(&self, msg: SignalingMsg) -> Result<(), OutboxError> {
        {
            let mut st = self.shared.state.lock();
            if st.closed {
                return Err(OutboxError::Closed);
            }

            if msg.is_low_priority() {
                st.queue.retain(|pending| !pending.is_low_priority());
            }

            if st.queue.len() >= self.shared.capacity {
                let victim = st.queue.iter().position(SignalingMsg::is_low_priority);
                match victim {
                    Some(pos) => {
                        st.queue.remove(pos);
                    }
                    None => return Err(OutboxError::Full),
                }
            }

            st.queue.push_back(msg);
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    /// Next queued message; waits while the queue is empty.
    ///
    /// Returns `None` once the outbox is closed and everything queued before
    /// the close has been handed out.
    pub async fn recv(&self) -> Option<SignalingMsg> {
        loop {
            {
                let mut st = self.shared.state.lock();
                if let Some(msg) = st.queue.pop_front() {
                    return Some(msg);
                }
                if st.closed {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }

    pub fn try_recv(&self) -> Option<SignalingMsg> {
        self.shared.state.lock().queue.pop_front()
    }

    /// Takes everything currently queued.
    pub fn drain(&self) -> Vec<SignalingMsg> {
        self.shared.state.lock().queue.drain(..).collect()
    }

    /// Refuses further pushes and wakes the consumer. Already queued messages
    /// can still be received.
    pub fn close(&self) {
        self.shared.state.lock().closed = true;
        self.shared.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
