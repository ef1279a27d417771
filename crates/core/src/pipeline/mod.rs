pub mod analyzer_slot;
pub mod expression_detector;
pub mod expression_poller;
pub mod mood_state;
pub mod overlay;
pub mod tick_logger;

#[cfg(test)]
pub(crate) mod test_support;
