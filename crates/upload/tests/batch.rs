//! Full batch runs against an in-process vault server.

use std::collections::HashMap;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use vaultdrop_protocol::messages::{
    AuthorizationReply, ChunkAck, ClientInfoReply, UploadAccepted, UploadRejected,
};
use vaultdrop_protocol::{ClientMessage, ServerMessage, WireFrame};
use vaultdrop_session::SessionConfig;
use vaultdrop_transfer::AttachmentJob;
use vaultdrop_upload::{
    BatchConfig, BatchEntry, BatchError, BatchOrchestrator, TransferOutcome, TransferPolicy,
};

/// Accepts one session, stores streamed files by path, and refuses any
/// path listed in `locked`.
async fn vault_server(locked: &'static [&'static str]) -> (SocketAddr, JoinHandle<HashMap<String, Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        let mut paths: HashMap<String, String> = HashMap::new();
        let mut files: HashMap<String, Vec<u8>> = HashMap::new();

        while let Some(Ok(msg)) = ws.next().await {
            let frame = match msg {
                Message::Text(t) => WireFrame::Text(t.as_str().to_string()),
                Message::Binary(b) => WireFrame::Binary(b.to_vec()),
                Message::Close(_) => break,
                _ => continue,
            };
            let reply = match ClientMessage::decode(&frame).unwrap() {
                ClientMessage::Authorization { .. } => {
                    ServerMessage::Authorization(AuthorizationReply {
                        status: true,
                        message: String::new(),
                    })
                }
                ClientMessage::ClientInfo(_) => ServerMessage::ClientInfo(ClientInfoReply::default()),
                ClientMessage::UploadCheck(check) if locked.contains(&check.path.as_str()) => {
                    ServerMessage::UploadRejected(UploadRejected {
                        transfer_id: check.transfer_id,
                        reason: "path locked".into(),
                    })
                }
                ClientMessage::UploadCheck(check) => {
                    paths.insert(check.transfer_id.clone(), check.path);
                    ServerMessage::UploadAccepted(UploadAccepted {
                        transfer_id: check.transfer_id,
                        chunk_size: 0,
                    })
                }
                ClientMessage::Chunk(chunk) => {
                    let path = paths[&chunk.transfer_id].clone();
                    files.entry(path).or_default().extend_from_slice(&chunk.payload);
                    ServerMessage::ChunkAck(ChunkAck {
                        transfer_id: chunk.transfer_id,
                        seq: chunk.seq,
                    })
                }
            };
            let text = reply.encode().unwrap();
            if ws.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        files
    });

    (addr, handle)
}

fn job(path: &str, len: usize) -> BatchEntry {
    let bytes = (0..len).map(|i| (i % 251) as u8).collect();
    BatchEntry::Job(AttachmentJob::new(path, bytes, path).unwrap())
}

fn orchestrator() -> BatchOrchestrator {
    BatchOrchestrator::new(BatchConfig {
        policy: TransferPolicy {
            chunk_size: 1024,
            ..TransferPolicy::default()
        },
        ..BatchConfig::default()
    })
}

#[tokio::test]
async fn batch_streams_every_file_over_one_session() {
    let (addr, server) = vault_server(&[]).await;
    let session = SessionConfig::new(format!("http://{addr}"), "secret", "Obsidian");

    let outcomes = orchestrator()
        .run_batch(
            vec![
                job("assets/empty.bin", 0),
                job("assets/b.bin", 1500),
                job("assets/c.bin", 4096),
            ],
            &session,
        )
        .await
        .unwrap();

    assert!(outcomes.iter().all(|o| o.success), "{outcomes:?}");
    let files = server.await.unwrap();
    assert_eq!(files["assets/empty.bin"].len(), 0);
    assert_eq!(files["assets/b.bin"].len(), 1500);
    assert_eq!(files["assets/c.bin"], (0..4096).map(|i| (i % 251) as u8).collect::<Vec<_>>());
}

#[tokio::test]
async fn locked_path_fails_alone() {
    let (addr, server) = vault_server(&["assets/b.png"]).await;
    let session = SessionConfig::new(format!("http://{addr}"), "secret", "Obsidian");

    let outcomes = orchestrator()
        .run_batch(
            vec![
                job("assets/a.png", 100),
                job("assets/b.png", 100),
                BatchEntry::Rejected(TransferOutcome::failed("missing.png", "", "file not found")),
                job("assets/c.png", 100),
            ],
            &session,
        )
        .await
        .unwrap();

    let results: Vec<_> = outcomes
        .iter()
        .map(|o| (o.success, o.error_detail.as_deref()))
        .collect();
    assert_eq!(
        results,
        [
            (true, None),
            (false, Some("path locked")),
            (false, Some("file not found")),
            (true, None),
        ]
    );
    let files = server.await.unwrap();
    assert!(!files.contains_key("assets/b.png"));
}

#[tokio::test]
async fn unreachable_server_is_a_batch_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = BatchConfig::default();
    config.reconnect.max_attempts = 1;
    let session = SessionConfig::new(format!("http://{addr}"), "secret", "Obsidian");

    let err = BatchOrchestrator::new(config)
        .run_batch(vec![job("a.bin", 1)], &session)
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::Connection(_)), "{err:?}");
}
