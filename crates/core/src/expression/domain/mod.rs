pub mod expression;
pub mod expression_classifier;
pub mod mood;
pub mod mood_reducer;
