//! Request handler: classify, dispatch, render.

use std::io::Write;

use xs_core::{
    types::{Request, Scenario},
    Result,
};

use crate::dispatcher::Dispatcher;
use crate::render::Renderer;
use crate::router::ScenarioClassifier;

/// Serves one request end to end.
pub struct RequestHandler<'a> {
    classifier: ScenarioClassifier,
    dispatcher: Dispatcher<'a>,
    streaming: bool,
}

impl<'a> RequestHandler<'a> {
    pub fn new(dispatcher: Dispatcher<'a>) -> Self {
        Self {
            classifier: ScenarioClassifier::new(),
            dispatcher,
            streaming: true,
        }
    }

    pub fn with_classifier(mut self, classifier: ScenarioClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Stream answers of the text scenario instead of buffering them.
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher<'a> {
        &self.dispatcher
    }

    /// Classify the request content and serve it.
    ///
    /// The working-directory suffix is not part of the classified text.
    pub async fn handle<W: Write>(
        &self,
        request: &Request,
        renderer: &mut Renderer<W>,
    ) -> Result<String> {
        let scenario = self.classifier.classify(&request.content);
        self.handle_as(scenario, request, renderer).await
    }

    /// Serve a request with a known scenario.
    ///
    /// Only writer failures are returned as errors. Backend failures end up
    /// as rendered text.
    pub async fn handle_as<W: Write>(
        &self,
        scenario: Scenario,
        request: &Request,
        renderer: &mut Renderer<W>,
    ) -> Result<String> {
        if scenario == Scenario::Text && self.streaming {
            self.dispatcher.announce(scenario);
            let pipeline = self.dispatcher.registry().get(scenario);

            let streamed = match pipeline.stream(request).await {
                Ok(stream) => renderer.render_stream(stream).await,
                Err(e) => Err(e),
            };

            match streamed {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(scenario = %scenario, error = %e, "Streaming failed, falling back");
                    self.dispatcher
                        .reporter()
                        .report(&format!("[系统] 流式响应失败，切换到普通模式: {}", e));
                }
            }

            let response = self.dispatcher.invoke_with_retry(scenario, request).await;
            return Ok(renderer.render(&response)?);
        }

        let response = self.dispatcher.dispatch(scenario, request).await;
        Ok(renderer.render(&response)?)
    }
}
