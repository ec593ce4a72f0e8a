//! Cross-crate tests for the threaded command core.

#[cfg(test)]
mod end_to_end;

#[cfg(test)]
mod payload_drops;

#[cfg(test)]
mod ring_stress;

#[cfg(test)]
mod shutdown_order;

#[cfg(test)]
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
