// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Frame codec tests for strata-protocol.

use strata_protocol::frame::{Frame, FrameError, MessageType, MAX_FRAME_SIZE};
use strata_protocol::wire::{control, guest, GUEST_API_VERSION};

#[test]
fn test_request_frame_round_trip() {
    let req = control::GetClusterRequest {
        cluster_id: "c-1234".to_string(),
    };
    let frame = Frame::request(&req).unwrap();
    assert_eq!(frame.message_type, MessageType::Request);

    let encoded = frame.encode();
    let decoded = Frame::decode_from_bytes(encoded).unwrap();
    let req2: control::GetClusterRequest = decoded.decode().unwrap();
    assert_eq!(req, req2);
}

#[test]
fn test_response_frame_round_trip() {
    let resp = control::RpcResponse {
        response: Some(control::rpc_response::Response::Ack(control::AckResponse {
            message: "accepted".to_string(),
        })),
    };
    let frame = Frame::response(&resp).unwrap();
    assert_eq!(frame.message_type, MessageType::Response);

    let decoded = Frame::decode_from_bytes(frame.encode()).unwrap();
    let resp2: control::RpcResponse = decoded.decode().unwrap();
    assert_eq!(resp, resp2);
}

#[test]
fn test_error_frame() {
    let err = control::RpcError {
        code: "INVALID_INSTANCE_COUNT".to_string(),
        message: "storage cluster requires exactly 3 instances".to_string(),
    };
    let frame = Frame::error(&err).unwrap();
    assert_eq!(frame.message_type, MessageType::Error);

    let decoded: control::RpcError = frame.decode().unwrap();
    assert_eq!(decoded.code, "INVALID_INSTANCE_COUNT");
}

#[test]
fn test_guest_request_round_trip() {
    let req = guest::GuestRequest {
        api_version: GUEST_API_VERSION,
        request: Some(guest::guest_request::Request::ConfigureRouter(
            guest::ConfigureRouter {
                coordinator_endpoints: vec![
                    "10.0.0.1:2379".to_string(),
                    "10.0.0.2:2379".to_string(),
                    "10.0.0.3:2379".to_string(),
                ],
            },
        )),
    };
    let frame = Frame::request(&req).unwrap();
    let decoded: guest::GuestRequest = frame.decode().unwrap();
    assert_eq!(decoded, req);
}

#[test]
fn test_oversized_frame_rejected() {
    // An InstanceSpec with a flavor string larger than the frame limit
    let req = control::InstanceSpec {
        flavor_id: "x".repeat(MAX_FRAME_SIZE + 1),
        volume_size_gb: 1,
        volume_type: None,
        availability_zone: None,
        nic: None,
        modules: vec![],
        region: None,
    };
    match Frame::request(&req).unwrap_err() {
        FrameError::FrameTooLarge(size) => assert!(size > MAX_FRAME_SIZE),
        e => panic!("Expected FrameTooLarge, got: {:?}", e),
    }
}

#[tokio::test]
async fn test_framed_duplex_request_response() {
    use strata_protocol::frame::{read_frame, write_frame};
    use tokio::io::duplex;

    let (mut client_io, mut server_io) = duplex(4096);

    let server = tokio::spawn(async move {
        let frame = read_frame(&mut server_io).await.unwrap();
        let req: guest::GuestRequest = frame.decode().unwrap();
        assert_eq!(req.api_version, GUEST_API_VERSION);

        let resp = guest::GuestResponse {
            status: guest::GuestStatus::Ok as i32,
            message: String::new(),
        };
        let frame = Frame::response(&resp).unwrap();
        write_frame(&mut server_io, &frame).await.unwrap();
    });

    let req = guest::GuestRequest {
        api_version: GUEST_API_VERSION,
        request: Some(guest::guest_request::Request::ConfigureCoordinator(
            guest::ConfigureCoordinator {
                peer_endpoints: vec!["10.0.0.1:2379".to_string()],
            },
        )),
    };
    write_frame(&mut client_io, &Frame::request(&req).unwrap())
        .await
        .unwrap();

    let frame = read_frame(&mut client_io).await.unwrap();
    assert_eq!(frame.message_type, MessageType::Response);
    let resp: guest::GuestResponse = frame.decode().unwrap();
    assert_eq!(resp.status, guest::GuestStatus::Ok as i32);

    server.await.unwrap();
}
