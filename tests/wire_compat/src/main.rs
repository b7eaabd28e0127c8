fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use vaultdrop_protocol::envelope::split_text_frame;
    use vaultdrop_protocol::hash::{content_hash, path_hash};
    use vaultdrop_protocol::messages::{ClientInfo, UploadCheck};
    use vaultdrop_protocol::{Action, ChunkData, ClientMessage, ServerMessage, WireFrame};

    const TRANSFER_ID: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a captured text frame, without its trailing newline.
    fn load_frame(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
            .trim_end()
            .to_string()
    }

    /// Splits a text frame into its action and parsed JSON body.
    fn parts(frame: &str) -> (String, serde_json::Value) {
        let (action, body) = split_text_frame(frame).unwrap();
        let body = serde_json::from_str(body)
            .unwrap_or_else(|e| panic!("fixture body is not JSON ({e}): {body}"));
        (action.to_string(), body)
    }

    /// Decodes a server frame, re-encodes it, and compares action and body
    /// (key-order independent).
    fn server_roundtrip(name: &str) -> ServerMessage {
        let frame = load_frame(name);
        let msg = ServerMessage::decode(&frame)
            .unwrap_or_else(|e| panic!("failed to decode {name}: {e}"));
        let reencoded = msg.encode().unwrap();
        assert_eq!(
            parts(&frame),
            parts(&reencoded),
            "roundtrip mismatch for {name}:\n  wire: {frame}\n  ours: {reencoded}"
        );
        msg
    }

    // --- Server frames ---

    #[test]
    fn fixture_server_authorization() {
        match server_roundtrip("server_authorization.frame") {
            ServerMessage::Authorization(r) => assert!(r.status),
            other => panic!("unexpected {other:?}"),
        }
        match server_roundtrip("server_authorization_denied.frame") {
            ServerMessage::Authorization(r) => {
                assert!(!r.status);
                assert_eq!(r.message, "token expired");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fixture_server_client_info() {
        match server_roundtrip("server_client_info.frame") {
            ServerMessage::ClientInfo(r) => assert_eq!(r.schema_version, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fixture_server_upload_check_unchanged() {
        let msg = server_roundtrip("server_upload_check_unchanged.frame");
        assert!(msg.is_unchanged());
        assert_eq!(msg.transfer_id(), Some(TRANSFER_ID));
    }

    #[test]
    fn fixture_server_upload_accepted() {
        match server_roundtrip("server_upload_accepted.frame") {
            ServerMessage::UploadAccepted(a) => assert_eq!(a.chunk_size, 524_288),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fixture_server_upload_rejected() {
        match server_roundtrip("server_upload_rejected.frame") {
            ServerMessage::UploadRejected(r) => assert_eq!(r.reason, "path locked"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fixture_server_chunk_ack_and_nack() {
        match server_roundtrip("server_chunk_ack.frame") {
            ServerMessage::ChunkAck(a) => assert_eq!(a.seq, 3),
            other => panic!("unexpected {other:?}"),
        }
        match server_roundtrip("server_chunk_nack.frame") {
            ServerMessage::ChunkNack(n) => {
                assert_eq!(n.seq, 4);
                assert_eq!(n.reason, "disk full");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fixture_server_broadcast_is_recognised_not_routed() {
        let msg = ServerMessage::decode(&load_frame("server_broadcast_sync_update.frame")).unwrap();
        assert_eq!(msg, ServerMessage::Broadcast(Action::FileSyncUpdate));
        assert_eq!(msg.transfer_id(), None);
    }

    // --- Client frames ---

    #[test]
    fn fixture_client_client_info() {
        let expected = load_frame("client_client_info.frame");
        let WireFrame::Text(ours) = ClientMessage::ClientInfo(ClientInfo::current("0.1.0"))
            .encode()
            .unwrap()
        else {
            panic!("ClientInfo must be a text frame");
        };
        assert_eq!(parts(&expected), parts(&ours));
    }

    #[test]
    fn fixture_client_upload_check() {
        let expected = load_frame("client_upload_check.frame");
        let check = UploadCheck {
            transfer_id: TRANSFER_ID.into(),
            vault: "Obsidian".into(),
            path: "assets/xhs/img1.webp".into(),
            path_hash: path_hash("assets/xhs/img1.webp"),
            content_hash: content_hash(b"hello"),
            size: 5,
            ctime: 1_760_000_000_000,
            mtime: 1_760_000_000_500,
        };
        let WireFrame::Text(ours) = ClientMessage::UploadCheck(check.clone()).encode().unwrap()
        else {
            panic!("FileUploadCheck must be a text frame");
        };
        assert_eq!(parts(&expected), parts(&ours));

        // Servers and test peers decode the same frame back.
        assert_eq!(
            ClientMessage::decode(&WireFrame::Text(expected)).unwrap(),
            ClientMessage::UploadCheck(check)
        );
    }

    #[test]
    fn fixture_authorization_is_raw_token() {
        let frame = ClientMessage::Authorization {
            token: "tok|with|bars".into(),
        }
        .encode()
        .unwrap();
        assert_eq!(frame, WireFrame::Text("Authorization|tok|with|bars".into()));
    }

    // --- Binary chunk frame ---

    fn decode_hex(s: &str) -> Vec<u8> {
        let s = s.trim();
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn fixture_chunk_frame_layout() {
        let bytes = decode_hex(&load_frame("chunk_final.hex"));
        let chunk = ChunkData::decode(&bytes).unwrap();
        assert_eq!(chunk.transfer_id, TRANSFER_ID);
        assert_eq!(chunk.seq, 3);
        assert!(chunk.is_final);
        assert_eq!(chunk.payload, b"hello");
        assert_eq!(chunk.encode().unwrap(), bytes);
    }
}
