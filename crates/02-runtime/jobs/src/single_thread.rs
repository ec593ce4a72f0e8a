use std::time::{Duration, Instant};

/// A subsystem tick that can run on the caller's thread instead of a job.
pub trait UpdateJob {
    /// Runs one iteration and returns the number of work items processed.
    fn update(&mut self) -> usize;
    fn name(&self) -> &str;
}

struct NamedUpdate<F> {
    name: String,
    update: F,
}

impl<F> UpdateJob for NamedUpdate<F>
where
    F: FnMut() -> usize,
{
    fn update(&mut self) -> usize {
        (self.update)()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Fallback for targets without threads: registered updates are called in
/// registration order, once per tick, on the calling thread.
#[derive(Default)]
pub struct SingleThreadUpdates {
    updates: Vec<Box<dyn UpdateJob>>,
}

impl SingleThreadUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<U>(&mut self, update: U)
    where
        U: UpdateJob + 'static,
    {
        log::debug!("registered single-threaded update `{}`", update.name());
        self.updates.push(Box::new(update));
    }

    pub fn register_fn<F>(&mut self, name: impl Into<String>, update: F)
    where
        F: FnMut() -> usize + 'static,
    {
        self.register(NamedUpdate {
            name: name.into(),
            update,
        });
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Calls every update once.
    pub fn run_tick(&mut self) -> usize {
        let mut work = 0;
        for update in self.updates.iter_mut() {
            work += update.update();
        }
        work
    }

    /// Ticks until no update reports work and `idle_threshold` has elapsed.
    pub fn run_until_idle(&mut self, idle_threshold: Duration) {
        let deadline = Instant::now() + idle_threshold;
        loop {
            let work = self.run_tick();
            if work == 0 && Instant::now() >= deadline {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn ticks_updates_in_registration_order() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut updates = SingleThreadUpdates::new();
        for name in ["render", "audio"] {
            let order = Rc::clone(&order);
            updates.register_fn(name, move || {
                order.borrow_mut().push(name);
                1
            });
        }
        assert_eq!(updates.run_tick(), 2);
        assert_eq!(updates.run_tick(), 2);
        assert_eq!(*order.borrow(), vec!["render", "audio", "render", "audio"]);
    }

    #[test]
    fn run_until_idle_drains_pending_work() {
        let pending = Rc::new(Cell::new(5usize));
        let mut updates = SingleThreadUpdates::new();
        {
            let pending = Rc::clone(&pending);
            updates.register_fn("drain", move || {
                let left = pending.get();
                if left > 0 {
                    pending.set(left - 1);
                    1
                } else {
                    0
                }
            });
        }
        updates.run_until_idle(Duration::ZERO);
        assert_eq!(pending.get(), 0);
    }
}
