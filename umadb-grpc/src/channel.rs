//! The `tonic` channel behind a gRPC-backed client.
//!
//! Calls are issued on a small multi-thread tokio runtime owned by the
//! channel and awaited with `block_on`, which gives callers the blocking API
//! of [`umadb_core::Client`]. The methods of [`GrpcChannel`] must therefore
//! not be called from inside an async context.

use std::time::{Duration, Instant};

use tokio::runtime::Runtime;
use tonic::{
    Request, Status,
    client::Grpc,
    codec::ProstCodec,
    codegen::{InterceptedService, http::uri::PathAndQuery},
    transport::{Certificate, ClientTlsConfig, Endpoint},
};
use umadb_core::{Code, Connector, Error, Failure, InvalidArgument, wire};

use crate::{
    auth::BearerAuth,
    config::Config,
    status::into_failure,
    stream::GrpcStream,
};

const WORKER_THREADS: usize = 2;

type Service = InterceptedService<tonic::transport::Channel, BearerAuth>;

/// Opens [`GrpcChannel`]s for one [`Config`].
#[derive(Debug, Clone)]
pub struct GrpcConnector {
    config: Config,
    auth: BearerAuth,
}

impl GrpcConnector {
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] if `config` does not validate.
    pub fn new(config: Config) -> Result<Self, InvalidArgument> {
        config.validate()?;
        let auth = BearerAuth::new(config.api_key.as_deref())?;
        Ok(Self { config, auth })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    fn endpoint(&self) -> Result<Endpoint, Error> {
        let uri = self.config.uri();
        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| Error::Io(format!("invalid endpoint `{uri}`: {e}")))?;

        let Some(ca_path) = &self.config.ca_path else {
            return Ok(endpoint);
        };
        let pem = std::fs::read(ca_path).map_err(|e| {
            Error::Io(format!(
                "failed to read CA certificate `{}`: {e}",
                ca_path.display()
            ))
        })?;
        let tls = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(pem))
            .domain_name(self.config.host.clone());
        endpoint
            .tls_config(tls)
            .map_err(|e| Error::Io(format!("failed to configure TLS: {e}")))
    }
}

impl Connector for GrpcConnector {
    type Channel = GrpcChannel;

    #[tracing::instrument(skip(self), fields(uri = %self.config.uri()))]
    fn connect(&self) -> Result<GrpcChannel, Error> {
        let endpoint = self.endpoint()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(WORKER_THREADS)
            .thread_name("umadb-grpc")
            .enable_all()
            .build()
            .map_err(|e| Error::Io(format!("failed to start transport runtime: {e}")))?;

        let channel = {
            let _guard = runtime.enter();
            endpoint.connect_lazy()
        };
        tracing::debug!(secure = self.config.is_secure(), "grpc channel created");

        Ok(GrpcChannel {
            grpc: Grpc::new(InterceptedService::new(channel, self.auth.clone())),
            runtime,
        })
    }
}

/// A connected gRPC transport.
pub struct GrpcChannel {
    grpc: Grpc<Service>,
    runtime: Runtime,
}

fn not_ready(error: impl Into<tonic::codegen::StdError>) -> Status {
    let error: tonic::codegen::StdError = error.into();
    Status::unavailable(format!("service was not ready: {error}"))
}

impl GrpcChannel {
    fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> Result<Resp, Failure>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.grpc.clone();
        self.runtime
            .block_on(async move {
                grpc.ready().await.map_err(not_ready)?;
                let response = grpc
                    .unary(
                        Request::new(request),
                        PathAndQuery::from_static(path),
                        ProstCodec::<Req, Resp>::default(),
                    )
                    .await?;
                Ok(response.into_inner())
            })
            .map_err(|status: Status| into_failure(&status))
    }
}

impl umadb_core::Channel for GrpcChannel {
    type Stream = GrpcStream;

    fn append(&self, request: wire::AppendRequest) -> Result<wire::AppendResponse, Failure> {
        self.unary(wire::APPEND_PATH, request)
    }

    fn read(&self, request: wire::ReadRequest) -> Result<GrpcStream, Failure> {
        let mut grpc = self.grpc.clone();
        let streaming = self
            .runtime
            .block_on(async move {
                grpc.ready().await.map_err(not_ready)?;
                let response = grpc
                    .server_streaming(
                        Request::new(request),
                        PathAndQuery::from_static(wire::READ_PATH),
                        ProstCodec::<wire::ReadRequest, wire::ReadResponse>::default(),
                    )
                    .await?;
                Ok(response.into_inner())
            })
            .map_err(|status: Status| into_failure(&status))?;
        Ok(GrpcStream::new(streaming, self.runtime.handle().clone()))
    }

    fn head(&self) -> Result<wire::HeadResponse, Failure> {
        self.unary(wire::HEAD_PATH, wire::HeadRequest {})
    }

    fn shutdown(self, timeout: Duration) -> Result<(), Failure> {
        let Self { grpc, runtime } = self;
        drop(grpc);

        let started = Instant::now();
        runtime.shutdown_timeout(timeout);
        let elapsed = started.elapsed();

        if elapsed >= timeout {
            tracing::warn!(?elapsed, "transport runtime did not drain in time");
            return Err(Failure::new(
                Code::DeadlineExceeded,
                format!("transport did not drain within {timeout:?}"),
            ));
        }
        tracing::debug!(?elapsed, "grpc channel shut down");
        Ok(())
    }
}

impl std::fmt::Debug for GrpcChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcChannel").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use umadb_core::{Channel as _, Client, ErrorKind};

    use super::*;

    fn unreachable_connector() -> GrpcConnector {
        // Port 1 on loopback refuses connections.
        GrpcConnector::new(Config {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn connect_is_lazy() {
        let channel = unreachable_connector().connect().unwrap();
        channel.shutdown(Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn unreachable_server_fails_calls_not_connect() {
        let mut client = Client::new(unreachable_connector());
        client.connect().unwrap();

        let error = client.head().unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Other);
        client.shutdown().unwrap();
    }

    #[test]
    fn missing_ca_file_is_an_io_error() {
        let connector = GrpcConnector::new(Config {
            ca_path: Some("/definitely/not/here/ca.pem".into()),
            ..Config::default()
        })
        .unwrap();

        let error = connector.connect().unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(error.message().contains("CA certificate"));
    }
}
