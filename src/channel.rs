use std::collections::BTreeSet;
use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;
use std::time::Instant;

use log::debug;
use log::warn;

use crate::error::EventError;

struct Queue<T> {
    next_ticket: u64,
    serving: u64,
    abandoned: BTreeSet<u64>,
    busy: bool,
    driver: Option<T>,
}

impl<T> Queue<T> {
    fn advance(&mut self) {
        self.serving += 1;
        while self.abandoned.remove(&self.serving) {
            self.serving += 1;
        }
    }
}

/// Exclusive access to one physical channel.
///
/// Callers draw a ticket on arrival and are let in strictly in ticket order,
/// so writes hit the hardware in the order they were accepted. Waiting is
/// bounded; a caller that gives up leaves its ticket behind as abandoned and
/// the queue skips over it.
pub struct Channel<T> {
    name: &'static str,
    max_wait: Duration,
    queue: Mutex<Queue<T>>,
    turn: Condvar,
}

impl<T> Channel<T> {
    pub fn new(name: &'static str, driver: T, max_wait: Duration) -> Channel<T> {
        Channel {
            name,
            max_wait,
            queue: Mutex::new(Queue {
                next_ticket: 0,
                serving: 0,
                abandoned: BTreeSet::new(),
                busy: false,
                driver: Some(driver),
            }),
            turn: Condvar::new(),
        }
    }

    pub fn acquire(&self) -> Result<ChannelGuard<'_, T>, EventError> {
        let mut queue = self.lock();
        let ticket = queue.next_ticket;
        queue.next_ticket += 1;

        let deadline = Instant::now() + self.max_wait;
        while queue.busy || queue.serving != ticket {
            let now = Instant::now();
            if now >= deadline {
                if queue.serving == ticket {
                    // Our turn came but the holder is still busy; pass the turn on.
                    queue.advance();
                } else {
                    queue.abandoned.insert(ticket);
                }
                self.turn.notify_all();
                warn!(
                    "Gave up waiting for {} channel after {:?}",
                    self.name, self.max_wait
                );
                return Err(EventError::ChannelUnavailable {
                    channel: self.name,
                    waited: self.max_wait,
                });
            }
            queue = match self.turn.wait_timeout(queue, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        queue.busy = true;
        queue.advance();
        let driver = queue.driver.take();
        debug!("{} channel busy (ticket {})", self.name, ticket);
        Ok(ChannelGuard {
            channel: self,
            driver,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Queue<T>> {
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release(&self, driver: Option<T>) {
        let mut queue = self.lock();
        queue.driver = driver;
        queue.busy = false;
        self.turn.notify_all();
        debug!("{} channel idle", self.name);
    }
}

/// Held while one caller owns the channel; releases on drop.
pub struct ChannelGuard<'a, T> {
    channel: &'a Channel<T>,
    driver: Option<T>,
}

impl<T> Deref for ChannelGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.driver {
            Some(driver) => driver,
            None => unreachable!("driver is present while the channel is held"),
        }
    }
}

impl<T> DerefMut for ChannelGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.driver {
            Some(driver) => driver,
            None => unreachable!("driver is present while the channel is held"),
        }
    }
}

impl<T> Drop for ChannelGuard<'_, T> {
    fn drop(&mut self) {
        self.channel.release(self.driver.take());
    }
}
