use crate::error::Error;
use crate::hpack::HeaderField;
use crate::response::Response;
use crate::types::Headers;
use bytes::Bytes;
use std::collections::VecDeque;
use std::time::Duration;
use url::Url;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, derive_more::Display)]
pub enum Method {
    #[display(fmt = "GET")]
    Get,
    #[display(fmt = "POST")]
    Post,
    #[display(fmt = "PUT")]
    Put,
    #[display(fmt = "DELETE")]
    Delete,
    #[display(fmt = "HEAD")]
    Head,
    #[display(fmt = "PATCH")]
    Patch,
    #[display(fmt = "OPTIONS")]
    Options,
    #[display(fmt = "{}", _0)]
    Other(String),
}

/// An HTTP/2 request: pseudo-headers derived from the URL, regular headers
/// in insertion order, and a body as a sequence of byte slices that are
/// sent back to back.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Vec<Bytes>,
    timeout: Duration,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, url: Url, headers: Option<Headers>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            method,
            url,
            headers: headers.unwrap_or_default(),
            body: if body.is_empty() { Vec::new() } else { vec![body] },
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[inline]
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url, None, Bytes::new())
    }

    #[inline]
    #[must_use]
    pub fn post(url: Url, body: impl Into<Bytes>) -> Self {
        Self::new(Method::Post, url, None, body)
    }

    /// POST with a JSON body and matching content-type.
    #[cfg(feature = "json")]
    pub fn post_json<T: serde::Serialize>(url: Url, body: &T) -> serde_json::Result<Self> {
        let body = serde_json::to_vec(body)?;
        Ok(Self::post(url, body).header("content-type", "application/json"))
    }

    /// Appends one regular header. No deduplication, matching the wire.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Appends one more body slice; slices are emitted in insertion order.
    #[must_use]
    pub fn body(mut self, slice: impl Into<Bytes>) -> Self {
        self.body.push(slice.into());
        self
    }

    /// Overrides the default 30 s completion timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn timeout_value(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn body_len(&self) -> usize {
        self.body.iter().map(Bytes::len).sum()
    }

    /// A follow-up GET for a redirect response, if it carries a usable
    /// Location header.
    #[must_use]
    pub fn redirect(&self, response: &Response) -> Option<Self> {
        let location = response.header("location")?;
        let url = self.url.join(location).ok()?;
        Some(Self::get(url))
    }

    /// The checks done synchronously before a stream is opened.
    pub fn check_valid(&self) -> Result<(), Error> {
        if self.url.host_str().is_none() {
            return Err(Error::InvalidRequest("URL has no host"));
        }
        if self.url.cannot_be_a_base() {
            return Err(Error::InvalidRequest("URL cannot be a base"));
        }
        Ok(())
    }

    /// Full field list for HPACK: the four pseudo-headers first, then the
    /// regular headers in order.
    #[must_use]
    pub fn field_list(&self) -> VecDeque<HeaderField> {
        let authority = match (self.url.host_str().unwrap_or_default(), self.url.port()) {
            (host, Some(port)) => format!("{host}:{port}"),
            (host, None) => host.to_owned(),
        };
        let path = match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_owned(),
        };

        let mut fields = VecDeque::with_capacity(4 + self.headers.len());
        fields.push_back(HeaderField::new(&b":method"[..], self.method.to_string()));
        fields.push_back(HeaderField::new(
            &b":scheme"[..],
            self.url.scheme().to_owned(),
        ));
        fields.push_back(HeaderField::new(&b":path"[..], path));
        fields.push_back(HeaderField::new(&b":authority"[..], authority));
        for (name, value) in &self.headers {
            // header names are lowercase on the wire in HTTP/2
            fields.push_back(HeaderField::new(
                name.to_ascii_lowercase(),
                value.clone(),
            ));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn pseudo_headers_come_first() {
        let request = Request::get(url("https://example.com/info?q=1"))
            .header("Accept", "text/html");
        let fields = request.field_list();
        let pairs: Vec<(&[u8], &[u8])> =
            fields.iter().map(|f| (f.name(), f.value())).collect();
        assert_eq!(
            pairs,
            vec![
                (&b":method"[..], &b"GET"[..]),
                (&b":scheme"[..], &b"https"[..]),
                (&b":path"[..], &b"/info?q=1"[..]),
                (&b":authority"[..], &b"example.com"[..]),
                (&b"accept"[..], &b"text/html"[..]),
            ]
        );
    }

    #[test]
    fn explicit_port_lands_in_authority() {
        let request = Request::get(url("https://example.com:8443/"));
        let fields = request.field_list();
        assert_eq!(fields[3].value(), b"example.com:8443");
    }

    #[test]
    fn body_slices_accumulate() {
        let request = Request::post(url("https://example.com/upload"), "part1")
            .body("part2")
            .body("part3");
        assert_eq!(request.body.len(), 3);
        assert_eq!(request.body_len(), 15);
    }

    #[test]
    fn custom_method_displays_verbatim() {
        let request = Request::new(
            Method::Other("BREW".to_owned()),
            url("https://example.com/pot"),
            None,
            Bytes::new(),
        );
        assert_eq!(request.field_list()[0].value(), b"BREW");
    }

    #[test]
    fn data_url_is_invalid() {
        let request = Request::get(url("data:text/plain,hello"));
        assert!(request.check_valid().is_err());
    }

    #[test]
    fn redirect_resolves_relative_and_absolute_locations() {
        let request = Request::get(url("https://example.com/a/b"));

        let mut response = Response::default();
        response.insert_headers([("location".to_owned(), "../c".to_owned())]);
        let follow_up = request.redirect(&response).unwrap();
        assert_eq!(follow_up.url.as_str(), "https://example.com/c");

        let mut response = Response::default();
        response.insert_headers([("Location".to_owned(), "https://other.test/x".to_owned())]);
        let follow_up = request.redirect(&response).unwrap();
        assert_eq!(follow_up.url.as_str(), "https://other.test/x");

        assert!(request.redirect(&Response::default()).is_none());
    }
}
