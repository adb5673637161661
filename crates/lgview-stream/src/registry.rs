use crate::transport::{send, StreamOutcome, Transport};
use lgview_model::{CommandRequest, DiagnosticMethod, SpeedTestSize};
use tokio_util::sync::CancellationToken;

/// A diagnostic method and the fixed server path it is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub method: DiagnosticMethod,
    pub path: &'static str,
}

/// A fully bound request: where it goes and what it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub method: DiagnosticMethod,
    pub url: String,
    pub request: CommandRequest,
}

pub fn resolve(method: DiagnosticMethod) -> Endpoint {
    Endpoint {
        method,
        path: method.path(),
    }
}

impl Endpoint {
    pub fn bind(&self, base_url: &str, target: &str) -> Invocation {
        Invocation {
            method: self.method,
            url: join_url(base_url, self.path),
            request: CommandRequest::new(target),
        }
    }
}

impl Invocation {
    pub async fn run<T, F>(&self, transport: &T, cancel: &CancellationToken, on_chunk: F) -> StreamOutcome
    where
        T: Transport + ?Sized,
        F: FnMut(String),
    {
        send(transport, &self.url, &self.request, cancel, on_chunk).await
    }
}

pub fn speedtest_url(base_url: &str, size: SpeedTestSize) -> String {
    join_url(base_url, size.path())
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_appends_method_path_to_base() {
        for method in DiagnosticMethod::ALL {
            let invocation = resolve(method).bind("http://h1", "example.net");
            assert_eq!(invocation.url, format!("http://h1/lookingglass/{method}"));
            assert_eq!(invocation.request.target, "example.net");
            assert_eq!(invocation.method, method);
        }
    }

    #[test]
    fn bind_does_not_double_slash() {
        let invocation = resolve(DiagnosticMethod::Mtr).bind("http://h1:8000/", "x");
        assert_eq!(invocation.url, "http://h1:8000/lookingglass/mtr");
    }

    #[test]
    fn target_is_forwarded_verbatim() {
        let invocation = resolve(DiagnosticMethod::Ping).bind("http://h1", "  odd target; ");
        assert_eq!(invocation.request.target, "  odd target; ");
    }

    #[test]
    fn speedtest_url_uses_size_path() {
        assert_eq!(
            speedtest_url("http://h1/", SpeedTestSize::Gb10),
            "http://h1/speedtest/10G"
        );
    }
}
