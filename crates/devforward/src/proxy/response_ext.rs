//! Response body unification.
//!
//! Mock files, error responses, upstream responses and whatever the next
//! handler produces all leave the middleware as `Response<ForwardBody>`.

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::Response;
use tower::BoxError;

/// Body type of every response produced by the forwarding middleware.
pub type ForwardBody = UnsyncBoxBody<Bytes, BoxError>;

/// Extension trait for converting any response into a `Response<ForwardBody>`.
pub trait ResponseExt {
    /// Box the body, widening its error to `BoxError`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use crate::proxy::response_ext::ResponseExt;
    ///
    /// let response = Response::new(Full::new(Bytes::from("hello")));
    /// let boxed = response.into_forward_body();
    /// ```
    fn into_forward_body(self) -> Response<ForwardBody>;
}

impl<B> ResponseExt for Response<B>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn into_forward_body(self) -> Response<ForwardBody> {
        self.map(|b| b.map_err(Into::into).boxed_unsync())
    }
}
