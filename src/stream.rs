use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One message from an in-flight generation stream. `End` and `Error` are
/// terminal: nothing follows them for a given stream id.
#[derive(Clone, Debug)]
pub enum StreamMessage {
    Chunk(String),
    End,
    Error,
}

#[derive(Serialize)]
struct GenerateRequest {
    prompt: String,
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub prompt: String,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

/// Spawns generation requests and forwards their decoded chunks over a
/// channel, tagged with the stream id they belong to. Consumers drop messages
/// carrying a stale id, which is also how post-cancel chunks are discarded.
#[derive(Clone)]
pub struct StreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl StreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                base_url,
                prompt,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = read_stream(&tx, client, base_url, prompt, &cancel_token, stream_id) => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn read_stream(
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    client: reqwest::Client,
    base_url: String,
    prompt: String,
    cancel_token: &CancellationToken,
    stream_id: u64,
) {
    let url = format!("{}/generate", base_url.trim_end_matches('/'));
    let request = GenerateRequest { prompt };

    let response = match client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(_) => {
            let _ = tx.send((StreamMessage::Error, stream_id));
            return;
        }
    };

    if !response.status().is_success() {
        let _ = tx.send((StreamMessage::Error, stream_id));
        return;
    }

    let mut body = response.bytes_stream();
    let mut decoder = Utf8Accumulator::default();

    while let Some(chunk) = body.next().await {
        if cancel_token.is_cancelled() {
            return;
        }

        match chunk {
            Ok(bytes) => {
                let text = decoder.push(&bytes);
                if !text.is_empty() {
                    let _ = tx.send((StreamMessage::Chunk(text), stream_id));
                }
            }
            Err(_) => {
                let _ = tx.send((StreamMessage::Error, stream_id));
                return;
            }
        }
    }

    let _ = tx.send((StreamMessage::End, stream_id));
}

/// Incremental UTF-8 decoder. The transport may split a multi-byte sequence
/// across chunk boundaries, so an incomplete trailing sequence is held back
/// until the next push. Invalid bytes decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Accumulator {
    pending: Vec<u8>,
}

impl Utf8Accumulator {
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(prefix) = std::str::from_utf8(&self.pending[..valid]) {
                        out.push_str(prefix);
                    }
                    match e.error_len() {
                        Some(len) => {
                            out.push('\u{FFFD}');
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            // Incomplete trailing sequence: keep it for the
                            // next chunk.
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_decodes_per_chunk() {
        let mut decoder = Utf8Accumulator::default();
        assert_eq!(decoder.push(b"Hel"), "Hel");
        assert_eq!(decoder.push(b"lo, "), "lo, ");
        assert_eq!(decoder.push(b"world"), "world");
    }

    #[test]
    fn multibyte_sequence_split_across_chunks() {
        let mut decoder = Utf8Accumulator::default();
        // "é" is 0xC3 0xA9
        assert_eq!(decoder.push(&[0xC3]), "");
        assert_eq!(decoder.push(&[0xA9]), "é");
    }

    #[test]
    fn four_byte_emoji_split_in_the_middle() {
        let mut decoder = Utf8Accumulator::default();
        let crab = "🦀".as_bytes(); // 4 bytes
        assert_eq!(decoder.push(&crab[..2]), "");
        assert_eq!(decoder.push(&crab[2..]), "🦀");
    }

    #[test]
    fn held_bytes_do_not_block_earlier_text() {
        let mut decoder = Utf8Accumulator::default();
        let mut chunk = b"abc".to_vec();
        chunk.push(0xC3);
        assert_eq!(decoder.push(&chunk), "abc");
        assert_eq!(decoder.push(&[0xA9, b'd']), "éd");
    }

    #[test]
    fn invalid_byte_becomes_replacement_char() {
        let mut decoder = Utf8Accumulator::default();
        assert_eq!(decoder.push(&[b'a', 0xFF, b'b']), "a\u{FFFD}b");
    }

    #[test]
    fn messages_arrive_in_send_order() {
        let (service, mut rx) = StreamService::new();
        service.send_for_test(StreamMessage::Chunk("Hel".to_string()), 1);
        service.send_for_test(StreamMessage::Chunk("lo".to_string()), 1);
        service.send_for_test(StreamMessage::End, 1);

        let mut received = Vec::new();
        while let Ok((message, id)) = rx.try_recv() {
            assert_eq!(id, 1);
            received.push(message);
        }

        assert!(matches!(&received[0], StreamMessage::Chunk(c) if c == "Hel"));
        assert!(matches!(&received[1], StreamMessage::Chunk(c) if c == "lo"));
        assert!(matches!(received[2], StreamMessage::End));
        assert_eq!(received.len(), 3);
    }

    /// A loopback port with nothing listening on it.
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{}", port)
    }

    /// Serve exactly one canned HTTP response on a fresh loopback port.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;

            let response = format!(
                "{}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn cancelled_before_start_sends_nothing() {
        let (service, mut rx) = StreamService::new();
        let token = CancellationToken::new();
        token.cancel();

        service.spawn_stream(StreamParams {
            client: reqwest::Client::new(),
            base_url: closed_port_url(),
            prompt: "hi".to_string(),
            cancel_token: token,
            stream_id: 7,
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unreachable_server_reports_error_once() {
        let (service, mut rx) = StreamService::new();

        service.spawn_stream(StreamParams {
            client: reqwest::Client::new(),
            base_url: closed_port_url(),
            prompt: "hi".to_string(),
            cancel_token: CancellationToken::new(),
            stream_id: 3,
        });

        let (message, id) = rx.recv().await.expect("one terminal message");
        assert_eq!(id, 3);
        assert!(matches!(message, StreamMessage::Error));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn non_ok_status_reports_error() {
        let (service, mut rx) = StreamService::new();
        let base_url = serve_once("HTTP/1.1 500 Internal Server Error", "boom").await;

        service.spawn_stream(StreamParams {
            client: reqwest::Client::new(),
            base_url,
            prompt: "hi".to_string(),
            cancel_token: CancellationToken::new(),
            stream_id: 4,
        });

        let (message, _) = rx.recv().await.expect("one terminal message");
        assert!(matches!(message, StreamMessage::Error));
    }

    #[tokio::test]
    async fn body_streams_through_to_end() {
        let (service, mut rx) = StreamService::new();
        let base_url = serve_once("HTTP/1.1 200 OK", "Hello, world").await;

        service.spawn_stream(StreamParams {
            client: reqwest::Client::new(),
            base_url,
            prompt: "hi".to_string(),
            cancel_token: CancellationToken::new(),
            stream_id: 5,
        });

        let mut content = String::new();
        loop {
            let (message, id) = rx.recv().await.expect("stream message");
            assert_eq!(id, 5);
            match message {
                StreamMessage::Chunk(text) => content.push_str(&text),
                StreamMessage::End => break,
                StreamMessage::Error => panic!("unexpected stream error"),
            }
        }
        assert_eq!(content, "Hello, world");
    }
}
