use crate::{
    error::RtiError,
    messages::{Response, ResponseBody, RtiMessage},
};

/// A message on its way through a sink, plus the response handlers build up
pub struct MessageContext {
    request: RtiMessage,
    response: Option<Response>,
}

impl MessageContext {
    pub fn new(request: RtiMessage) -> Self {
        Self {
            request,
            response: None,
        }
    }

    pub fn request(&self) -> &RtiMessage {
        &self.request
    }

    /// Handlers may rewrite the request for later handlers, e.g. to clamp a
    /// time or fill in an assigned handle
    pub fn request_mut(&mut self) -> &mut RtiMessage {
        &mut self.request
    }

    pub fn into_request(self) -> RtiMessage {
        self.request
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.response.as_ref().is_some_and(Response::is_success)
    }

    pub fn success(&mut self) {
        self.response = Some(Response::success());
    }

    pub fn success_with(&mut self, body: ResponseBody) {
        self.response = Some(Response::Success(body));
    }

    pub fn error(&mut self, error: RtiError) {
        self.response = Some(Response::Failure(error));
    }
}
