use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rosetta_stable_token::api::{Passthrough, PassthroughEndpoint};
use rosetta_stable_token::blockchain::{ChainClient, RosettaClient};
use rosetta_stable_token::error::{ClientError, ErrorKind, GatewayError};
use rosetta_stable_token::models::{BlockRequest, CallRequest, NetworkIdentifier, PartialBlockIdentifier};

fn block_request() -> BlockRequest {
    BlockRequest {
        network_identifier: NetworkIdentifier::new("celo", "42220"),
        block_identifier: PartialBlockIdentifier {
            index: Some(5000),
            hash: None,
        },
    }
}

#[tokio::test]
async fn test_block_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/block"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "block": {
                "block_identifier": { "index": 5000, "hash": "0x1388" },
                "parent_block_identifier": { "index": 4999, "hash": "0x1387" },
                "timestamp": 1_600_000_000_000i64,
                "transactions": []
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = RosettaClient::new(&server.uri(), 5).unwrap();
    let response = client.block(&block_request()).await.unwrap();

    let block = response.block.unwrap();
    assert_eq!(block.block_identifier.index, 5000);
    assert_eq!(block.parent_block_identifier.hash, "0x1387");
}

#[tokio::test]
async fn test_upstream_error_body_is_preserved() {
    let server = MockServer::start().await;
    let upstream = json!({ "code": 12, "message": "Block not found", "retriable": false, "details": { "index": 5000 } });
    Mock::given(method("POST"))
        .and(path("/block"))
        .respond_with(ResponseTemplate::new(500).set_body_json(upstream.clone()))
        .mount(&server)
        .await;

    let client = RosettaClient::new(&server.uri(), 5).unwrap();
    let error = client.block(&block_request()).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::ClientError);
    assert_eq!(serde_json::to_value(error.to_body()).unwrap(), upstream);
}

#[tokio::test]
async fn test_non_rosetta_failure_is_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/call"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let client = RosettaClient::new(&server.uri(), 5).unwrap();
    let error = client
        .call(&CallRequest {
            network_identifier: NetworkIdentifier::new("celo", "42220"),
            method: "celo_getLogs".to_string(),
            parameters: json!({}),
        })
        .await
        .unwrap_err();

    assert!(matches!(error, GatewayError::Client(ClientError::Connection(_))));
    assert!(error.to_body().retriable);
}

#[tokio::test]
async fn test_invalid_response_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/block"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = RosettaClient::new(&server.uri(), 5).unwrap();
    let error = client.block(&block_request()).await.unwrap_err();

    assert!(matches!(error, GatewayError::Client(ClientError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_connection_refused() {
    let client = RosettaClient::new("http://127.0.0.1:9", 2).unwrap();
    let error = client.block(&block_request()).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::ClientError);
}

#[tokio::test]
async fn test_passthrough_relays_request_and_response_verbatim() {
    let server = MockServer::start().await;
    let request = json!({
        "network_identifier": { "blockchain": "celo", "network": "42220" },
        "signed_transaction": "0xf86c"
    });
    let response = json!({ "transaction_identifier": { "hash": "0xabc" }, "metadata": { "anything": true } });

    Mock::given(method("POST"))
        .and(path("/construction/submit"))
        .and(body_json(request.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(response.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = RosettaClient::new(&server.uri(), 5).unwrap();
    let relayed = client
        .forward(PassthroughEndpoint::ConstructionSubmit, request)
        .await
        .unwrap();

    assert_eq!(relayed, response);
}
