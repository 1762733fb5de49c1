//! Request gateway for xs.
//!
//! This crate turns a request into displayed text: the scenario router
//! picks a pipeline, the dispatcher runs it with retries and the renderer
//! writes the displayable part of the result.

pub mod dispatcher;
pub mod handler;
pub mod render;
pub mod router;

pub use dispatcher::{
    failure_message, Dispatcher, MemoryReporter, RetryPolicy, StatusReporter, StdoutReporter,
};
pub use handler::RequestHandler;
pub use render::{Renderer, NO_CONTENT, NO_DISPLAYABLE_TEXT};
pub use router::{classify, Classification, ClassificationRule, ScenarioClassifier};
