//! ControlClient: typed front-end for the Xray administrative services

use std::collections::HashMap;

use tonic::transport::{Channel, Endpoint};
use tracing::{debug, warn};
use uuid::Uuid;

use xctl_proto::serial;
use xctl_proto::xray::app::log::command::logger_service_client::LoggerServiceClient;
use xctl_proto::xray::app::log::command::RestartLoggerRequest;
use xctl_proto::xray::app::proxyman::command::handler_service_client::HandlerServiceClient;
use xctl_proto::xray::app::proxyman::command::{
    AddInboundRequest, AddOutboundRequest, AddUserOperation, AlterInboundRequest,
    RemoveInboundRequest, RemoveOutboundRequest, RemoveUserOperation,
};
use xctl_proto::xray::app::stats::command::stats_service_client::StatsServiceClient;
use xctl_proto::xray::app::stats::command::{GetStatsRequest, QueryStatsRequest};
use xctl_proto::xray::common::protocol::{SecurityConfig, SecurityType, User};
use xctl_proto::xray::core::{InboundHandlerConfig, OutboundHandlerConfig};
use xctl_proto::xray::proxy::vmess;

use crate::error::ClientError;

/// Create a random v4 UUID in canonical string form.
///
/// Suitable as the identity argument of [`ControlClient::add_user`].
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Client for the administrative control plane of a running Xray server.
///
/// Holds one plaintext gRPC channel to a fixed `address:port`, plus the
/// three service stubs sharing it (tonic stubs are cheap to clone, the
/// channel is reference-counted internally). The channel lives exactly as
/// long as the client value; dropping the client releases it.
///
/// Each call is independent and stateless. The client coordinates no
/// concurrency of its own: methods issue one unary call and await the
/// response, with no timeout or deadline attached.
///
/// # Example
///
/// ```rust,no_run
/// use xctl::ControlClient;
///
/// # async fn example() -> Result<(), xctl::ClientError> {
/// let client = ControlClient::connect("127.0.0.1", 10085).await?;
/// let (name, value) = client.get_stats("inbound>>>api>>>traffic>>>uplink", false).await;
/// println!("{name} = {value}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ControlClient {
    address: String,
    port: u16,
    stats: StatsServiceClient<Channel>,
    handler: HandlerServiceClient<Channel>,
    logger: LoggerServiceClient<Channel>,
}

impl ControlClient {
    /// Open a channel to the control plane at `address:port`.
    ///
    /// The upstream tooling treats a failed dial as fatal and terminates
    /// the process. As a library we surface the error instead and leave
    /// that decision to the caller; bubbling it out of `main` restores the
    /// fail-fast behavior.
    pub async fn connect(address: &str, port: u16) -> Result<Self, ClientError> {
        let endpoint = Endpoint::from_shared(format!("http://{address}:{port}"))?;
        let channel = endpoint.connect().await?;

        debug!("Connected to control plane at {}:{}", address, port);

        Ok(Self {
            address: address.to_string(),
            port,
            stats: StatsServiceClient::new(channel.clone()),
            handler: HandlerServiceClient::new(channel.clone()),
            logger: LoggerServiceClient::new(channel),
        })
    }

    /// Control-plane host this client was built against.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Control-plane port this client was built against.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// List all stat counters matching `pattern`. Users that have not
    /// generated any traffic are not included by the server.
    ///
    /// On failure the error is logged and an empty map is returned, so an
    /// empty result is ambiguous between "no traffic" and "call failed".
    /// Use [`Self::try_query_stats`] to tell the two apart.
    pub async fn query_stats(&self, pattern: &str, reset: bool) -> HashMap<String, i64> {
        match self.try_query_stats(pattern, reset).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(
                    "QueryStats against {}:{} failed: {}",
                    self.address, self.port, e
                );
                HashMap::new()
            }
        }
    }

    /// Fallible form of [`Self::query_stats`].
    pub async fn try_query_stats(
        &self,
        pattern: &str,
        reset: bool,
    ) -> Result<HashMap<String, i64>, ClientError> {
        let request = QueryStatsRequest {
            pattern: pattern.to_string(),
            reset,
        };

        let response = self.stats.clone().query_stats(request).await?;

        let mut result = HashMap::new();
        for stat in response.into_inner().stat {
            result.insert(stat.name, stat.value);
        }

        Ok(result)
    }

    /// Fetch a single counter by name, keyed as returned by
    /// [`Self::query_stats`].
    ///
    /// Returns `("", 0)` on failure (logged), which is indistinguishable
    /// from a zeroed counter; use [`Self::try_get_stats`] when that
    /// matters.
    pub async fn get_stats(&self, name: &str, reset: bool) -> (String, i64) {
        match self.try_get_stats(name, reset).await {
            Ok(stat) => stat,
            Err(e) => {
                warn!(
                    "GetStats against {}:{} failed: {}",
                    self.address, self.port, e
                );
                (String::new(), 0)
            }
        }
    }

    /// Fallible form of [`Self::get_stats`].
    pub async fn try_get_stats(
        &self,
        name: &str,
        reset: bool,
    ) -> Result<(String, i64), ClientError> {
        let request = GetStatsRequest {
            name: name.to_string(),
            reset,
        };

        let response = self.stats.clone().get_stats(request).await?;
        let stat = response.into_inner().stat.unwrap_or_default();

        Ok((stat.name, stat.value))
    }

    /// Add a user to an inbound on the fly. The effect does not survive a
    /// server restart. Failures are logged, not returned.
    pub async fn add_user(
        &self,
        inbound_tag: &str,
        email: &str,
        level: u32,
        id: &str,
        alter_id: u32,
    ) {
        if let Err(e) = self
            .try_add_user(inbound_tag, email, level, id, alter_id)
            .await
        {
            warn!("AddUser on inbound {} failed: {}", inbound_tag, e);
        }
    }

    /// Fallible form of [`Self::add_user`].
    ///
    /// `id` is the user identity, typically from [`generate_uuid`]. The
    /// account's security mode is fixed to AUTO.
    pub async fn try_add_user(
        &self,
        inbound_tag: &str,
        email: &str,
        level: u32,
        id: &str,
        alter_id: u32,
    ) -> Result<(), ClientError> {
        let account = vmess::Account {
            id: id.to_string(),
            alter_id,
            security_settings: Some(SecurityConfig {
                r#type: SecurityType::Auto as i32,
            }),
        };

        let operation = AddUserOperation {
            user: Some(User {
                level,
                email: email.to_string(),
                account: Some(serial::to_typed_message(&account)),
            }),
        };

        let request = AlterInboundRequest {
            tag: inbound_tag.to_string(),
            operation: Some(serial::to_typed_message(&operation)),
        };

        let response = self.handler.clone().alter_inbound(request).await?;
        debug!("AlterInbound(AddUser) ack: {:?}", response.into_inner());

        Ok(())
    }

    /// Remove a user from an inbound on the fly, keyed by email. The
    /// effect does not survive a server restart. Failures are logged, not
    /// returned.
    pub async fn remove_user(&self, inbound_tag: &str, email: &str) {
        if let Err(e) = self.try_remove_user(inbound_tag, email).await {
            warn!("RemoveUser on inbound {} failed: {}", inbound_tag, e);
        }
    }

    /// Fallible form of [`Self::remove_user`].
    pub async fn try_remove_user(
        &self,
        inbound_tag: &str,
        email: &str,
    ) -> Result<(), ClientError> {
        let operation = RemoveUserOperation {
            email: email.to_string(),
        };

        let request = AlterInboundRequest {
            tag: inbound_tag.to_string(),
            operation: Some(serial::to_typed_message(&operation)),
        };

        let response = self.handler.clone().alter_inbound(request).await?;
        debug!("AlterInbound(RemoveUser) ack: {:?}", response.into_inner());

        Ok(())
    }

    /// Ask the server to restart its logging subsystem. Failures are
    /// logged, not returned.
    pub async fn restart_logger(&self) {
        if let Err(e) = self.try_restart_logger().await {
            warn!("RestartLogger failed: {}", e);
        }
    }

    /// Fallible form of [`Self::restart_logger`].
    pub async fn try_restart_logger(&self) -> Result<(), ClientError> {
        let response = self
            .logger
            .clone()
            .restart_logger(RestartLoggerRequest {})
            .await?;
        debug!("RestartLogger ack: {:?}", response.into_inner());

        Ok(())
    }

    // Handler-config counterparts of the user operations. Upstream keeps
    // these unexported; nothing in the public surface needs them yet.

    #[allow(dead_code)]
    pub(crate) async fn add_inbound(&self, inbound: InboundHandlerConfig) {
        let request = AddInboundRequest {
            inbound: Some(inbound),
        };

        match self.handler.clone().add_inbound(request).await {
            Ok(response) => debug!("AddInbound ack: {:?}", response.into_inner()),
            Err(e) => warn!("AddInbound failed: {}", e),
        }
    }

    #[allow(dead_code)]
    pub(crate) async fn remove_inbound(&self, tag: &str) {
        let request = RemoveInboundRequest {
            tag: tag.to_string(),
        };

        match self.handler.clone().remove_inbound(request).await {
            Ok(response) => debug!("RemoveInbound ack: {:?}", response.into_inner()),
            Err(e) => warn!("RemoveInbound failed: {}", e),
        }
    }

    #[allow(dead_code)]
    pub(crate) async fn add_outbound(&self, outbound: OutboundHandlerConfig) {
        let request = AddOutboundRequest {
            outbound: Some(outbound),
        };

        match self.handler.clone().add_outbound(request).await {
            Ok(response) => debug!("AddOutbound ack: {:?}", response.into_inner()),
            Err(e) => warn!("AddOutbound failed: {}", e),
        }
    }

    #[allow(dead_code)]
    pub(crate) async fn remove_outbound(&self, tag: &str) {
        let request = RemoveOutboundRequest {
            tag: tag.to_string(),
        };

        match self.handler.clone().remove_outbound(request).await {
            Ok(response) => debug!("RemoveOutbound ack: {:?}", response.into_inner()),
            Err(e) => warn!("RemoveOutbound failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use tokio::net::TcpListener;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::transport::Server;
    use tonic::{Request, Response, Status};

    use xctl_proto::xray::app::proxyman::command::handler_service_server::{
        HandlerService, HandlerServiceServer,
    };
    use xctl_proto::xray::app::proxyman::command::{
        AddInboundResponse, AddOutboundResponse, AlterInboundResponse, AlterOutboundRequest,
        AlterOutboundResponse, RemoveInboundResponse, RemoveOutboundResponse,
    };

    /// HandlerService stub recording every request it sees.
    #[derive(Clone, Default)]
    struct RecordingHandler {
        fail: bool,
        added_inbounds: Arc<Mutex<Vec<AddInboundRequest>>>,
        removed_inbounds: Arc<Mutex<Vec<RemoveInboundRequest>>>,
        added_outbounds: Arc<Mutex<Vec<AddOutboundRequest>>>,
        removed_outbounds: Arc<Mutex<Vec<RemoveOutboundRequest>>>,
    }

    impl RecordingHandler {
        fn check_fail(&self) -> Result<(), Status> {
            if self.fail {
                Err(Status::unavailable("handler service is down"))
            } else {
                Ok(())
            }
        }
    }

    #[tonic::async_trait]
    impl HandlerService for RecordingHandler {
        async fn add_inbound(
            &self,
            request: Request<AddInboundRequest>,
        ) -> Result<Response<AddInboundResponse>, Status> {
            self.check_fail()?;
            self.added_inbounds.lock().unwrap().push(request.into_inner());
            Ok(Response::new(AddInboundResponse {}))
        }

        async fn remove_inbound(
            &self,
            request: Request<RemoveInboundRequest>,
        ) -> Result<Response<RemoveInboundResponse>, Status> {
            self.check_fail()?;
            self.removed_inbounds
                .lock()
                .unwrap()
                .push(request.into_inner());
            Ok(Response::new(RemoveInboundResponse {}))
        }

        async fn alter_inbound(
            &self,
            _request: Request<AlterInboundRequest>,
        ) -> Result<Response<AlterInboundResponse>, Status> {
            self.check_fail()?;
            Ok(Response::new(AlterInboundResponse {}))
        }

        async fn add_outbound(
            &self,
            request: Request<AddOutboundRequest>,
        ) -> Result<Response<AddOutboundResponse>, Status> {
            self.check_fail()?;
            self.added_outbounds
                .lock()
                .unwrap()
                .push(request.into_inner());
            Ok(Response::new(AddOutboundResponse {}))
        }

        async fn remove_outbound(
            &self,
            request: Request<RemoveOutboundRequest>,
        ) -> Result<Response<RemoveOutboundResponse>, Status> {
            self.check_fail()?;
            self.removed_outbounds
                .lock()
                .unwrap()
                .push(request.into_inner());
            Ok(Response::new(RemoveOutboundResponse {}))
        }

        async fn alter_outbound(
            &self,
            _request: Request<AlterOutboundRequest>,
        ) -> Result<Response<AlterOutboundResponse>, Status> {
            self.check_fail()?;
            Ok(Response::new(AlterOutboundResponse {}))
        }
    }

    async fn spawn_handler(stub: RecordingHandler) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let incoming = TcpListenerStream::new(listener);

        tokio::spawn(async move {
            Server::builder()
                .add_service(HandlerServiceServer::new(stub))
                .serve_with_incoming(incoming)
                .await
                .unwrap();
        });

        addr
    }

    async fn connect(addr: SocketAddr) -> ControlClient {
        ControlClient::connect("127.0.0.1", addr.port())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn inbound_ops_forward_config_and_tag() {
        let stub = RecordingHandler::default();
        let addr = spawn_handler(stub.clone()).await;
        let client = connect(addr).await;

        client
            .add_inbound(InboundHandlerConfig {
                tag: "vmess-in".to_string(),
                receiver_settings: None,
                proxy_settings: None,
            })
            .await;
        client.remove_inbound("vmess-in").await;

        let added = stub.added_inbounds.lock().unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].inbound.as_ref().unwrap().tag, "vmess-in");

        let removed = stub.removed_inbounds.lock().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].tag, "vmess-in");
    }

    #[tokio::test]
    async fn outbound_ops_forward_config_and_tag() {
        let stub = RecordingHandler::default();
        let addr = spawn_handler(stub.clone()).await;
        let client = connect(addr).await;

        client
            .add_outbound(OutboundHandlerConfig {
                tag: "direct".to_string(),
                sender_settings: None,
                proxy_settings: None,
            })
            .await;
        client.remove_outbound("direct").await;

        let added = stub.added_outbounds.lock().unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].outbound.as_ref().unwrap().tag, "direct");

        let removed = stub.removed_outbounds.lock().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].tag, "direct");
    }

    #[tokio::test]
    async fn handler_config_ops_swallow_failures() {
        let stub = RecordingHandler {
            fail: true,
            ..RecordingHandler::default()
        };
        let addr = spawn_handler(stub.clone()).await;
        let client = connect(addr).await;

        // None of these propagate the stub's error.
        client
            .add_inbound(InboundHandlerConfig {
                tag: "vmess-in".to_string(),
                receiver_settings: None,
                proxy_settings: None,
            })
            .await;
        client.remove_inbound("vmess-in").await;
        client.remove_outbound("direct").await;

        assert!(stub.added_inbounds.lock().unwrap().is_empty());
        assert!(stub.removed_inbounds.lock().unwrap().is_empty());
        assert!(stub.removed_outbounds.lock().unwrap().is_empty());
    }
}
