// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Control-plane QUIC server.
//!
//! Accepts client connections, decodes control requests and routes them
//! to the handlers. Every failure becomes an error response with a
//! stable code; the stream is always answered.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use strata_protocol::frame::Frame;
use strata_protocol::server::{ConnectionHandler, StrataServer, StreamHandler};
use strata_protocol::wire::control::{
    RpcError, RpcRequest, RpcResponse, rpc_request::Request, rpc_response::Response,
};

use crate::error::Error;
use crate::handlers::{
    ControlHandlerState, handle_create_cluster, handle_get_cluster, handle_grow_cluster,
    handle_health_check, handle_list_clusters, handle_shrink_cluster,
};

/// Run the control QUIC server until the endpoint closes.
pub async fn run_control_server(
    bind_addr: SocketAddr,
    state: Arc<ControlHandlerState>,
) -> Result<()> {
    let server = StrataServer::localhost(bind_addr)?;

    info!(addr = %bind_addr, "control QUIC server starting");

    server
        .run(move |conn: ConnectionHandler| {
            let state = state.clone();
            async move {
                handle_connection(conn, state).await;
            }
        })
        .await?;

    Ok(())
}

/// Handle a single connection.
pub async fn handle_connection(conn: ConnectionHandler, state: Arc<ControlHandlerState>) {
    info!(remote = %conn.remote_address(), "control connection accepted");

    conn.run(move |stream: StreamHandler| {
        let state = state.clone();
        async move {
            if let Err(e) = handle_stream(stream, state).await {
                error!("stream error: {}", e);
            }
        }
    })
    .await;

    debug!("control connection closed");
}

/// Handle a single stream (request/response).
async fn handle_stream(mut stream: StreamHandler, state: Arc<ControlHandlerState>) -> Result<()> {
    let request_frame = stream.read_frame().await?;
    let rpc_request: RpcRequest = request_frame.decode()?;

    let request = match rpc_request.request {
        Some(req) => req,
        None => {
            warn!("received empty RpcRequest");
            let response = RpcResponse {
                response: Some(Response::Error(RpcError {
                    code: "EMPTY_REQUEST".to_string(),
                    message: "RpcRequest contained no request".to_string(),
                })),
            };
            stream.write_frame(&Frame::response(&response)?).await?;
            stream.finish()?;
            return Ok(());
        }
    };

    debug!(
        "received control request: {:?}",
        std::mem::discriminant(&request)
    );

    let response = match request {
        Request::HealthCheck(_) => match handle_health_check(&state).await {
            Ok(resp) => Response::Health(resp),
            Err(e) => error_response(&e),
        },

        Request::CreateCluster(req) => match handle_create_cluster(&state, req).await {
            Ok(resp) => Response::Cluster(resp),
            Err(e) => error_response(&e),
        },

        Request::GetCluster(req) => match handle_get_cluster(&state, req).await {
            Ok(resp) => Response::Cluster(resp),
            Err(e) => error_response(&e),
        },

        Request::ListClusters(req) => match handle_list_clusters(&state, req).await {
            Ok(resp) => Response::ClusterList(resp),
            Err(e) => error_response(&e),
        },

        Request::GrowCluster(req) => match handle_grow_cluster(&state, req).await {
            Ok(resp) => Response::Ack(resp),
            Err(e) => error_response(&e),
        },

        Request::ShrinkCluster(req) => match handle_shrink_cluster(&state, req).await {
            Ok(resp) => Response::Ack(resp),
            Err(e) => error_response(&e),
        },
    };

    let rpc_response = RpcResponse {
        response: Some(response),
    };
    stream.write_frame(&Frame::response(&rpc_response)?).await?;
    stream.finish()?;

    Ok(())
}

fn error_response(error: &Error) -> Response {
    Response::Error(RpcError {
        code: error.code().to_string(),
        message: error.to_string(),
    })
}
