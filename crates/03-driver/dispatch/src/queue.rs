use crate::dispatch_loop::ContinuePolicy;
use jobs::{JobHandle, Signal};
use transport::{RingProducer, RingPush};

/// Producer half of a subsystem command stream.
///
/// Owns the ring producer, so exactly one thread can submit to a given
/// consumer; a second producer needs its own queue.
pub struct CommandQueue<C> {
    ring: RingProducer<C>,
    job: JobHandle,
    policy: ContinuePolicy,
    stalls: u64,
}

impl<C> CommandQueue<C> {
    pub fn new(ring: RingProducer<C>, job: JobHandle) -> Self {
        Self {
            ring,
            job,
            policy: ContinuePolicy::Never,
            stalls: 0,
        }
    }

    /// Matches the consumer's [`ContinuePolicy`] so `continue` permits stay
    /// paired with the `consume` posts that caused them.
    pub fn with_continue_policy(mut self, policy: ContinuePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn continue_policy(&self) -> ContinuePolicy {
        self.policy
    }

    /// Enqueues `cmd`, blocking while the ring is full.
    ///
    /// A full ring posts `consume` first so an idle consumer starts draining.
    /// Under [`ContinuePolicy::OnConsume`] the stall also takes the `continue`
    /// it provokes. Records are never overwritten or dropped.
    pub fn submit(&mut self, cmd: C) {
        match self.ring.try_put(cmd) {
            RingPush::Ok => {}
            RingPush::WouldBlock(cmd) => {
                self.stalls += 1;
                log::trace!(
                    "command ring for `{}` full ({} records); waiting",
                    self.job.name(),
                    self.ring.capacity()
                );
                if self.policy == ContinuePolicy::OnConsume {
                    self.kick_and_wait();
                } else {
                    self.job.post(Signal::Consume);
                }
                self.ring.put(cmd);
            }
        }
    }

    /// Enqueues `cmd` only if there is room, handing it back otherwise.
    pub fn try_submit(&mut self, cmd: C) -> RingPush<C> {
        self.ring.try_put(cmd)
    }

    /// Tells the consumer there is work to drain.
    pub fn kick(&self) {
        self.job.post(Signal::Consume);
    }

    /// Posts `consume` and blocks on the consumer's `continue`.
    ///
    /// Under [`ContinuePolicy::OnConsume`] a permit left over from an earlier
    /// unwaited `kick` is discarded first, so the wait always covers this
    /// consume. Under `AfterBatch` a pending permit belongs to a batch that
    /// already ended and is kept.
    pub fn kick_and_wait(&self) {
        if self.policy == ContinuePolicy::OnConsume && self.job.try_wait(Signal::Continue) {
            log::trace!("discarded stale continue for `{}`", self.job.name());
        }
        self.job.post(Signal::Consume);
        self.job.wait(Signal::Continue);
    }

    /// Records submitted but not yet taken by the consumer.
    pub fn pending(&self) -> usize {
        self.ring.len()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Number of submits that found the ring full.
    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    pub fn job(&self) -> &JobHandle {
        &self.job
    }
}
