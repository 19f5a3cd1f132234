//! End-to-end session tests over an in-memory duplex transport. The test
//! side plays a minimal HTTP/2 server using the crate's own frame and
//! HPACK tooling.

use h2kit::buffer::ByteBuf;
use h2kit::flags::{DataFlags, HeadersFlags};
use h2kit::frame::{FrameHeader, FrameView};
use h2kit::frame_builder;
use h2kit::hpack;
use h2kit::types::*;
use h2kit::{Error, Request, Session, Url};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[derive(Debug)]
struct Frame {
    header: FrameHeader,
    bytes: Vec<u8>,
}

impl Frame {
    fn view(&self) -> FrameView<'_> {
        FrameView::parse(&self.bytes).unwrap()
    }
}

struct TestPeer {
    io: DuplexStream,
    rx: Vec<u8>,
    decoder: hpack::Decoder,
    encoder: hpack::Encoder,
}

impl TestPeer {
    fn new(io: DuplexStream) -> Self {
        Self {
            io,
            rx: Vec::new(),
            decoder: hpack::Decoder::new(),
            encoder: hpack::Encoder::new(),
        }
    }

    async fn fill(&mut self) {
        let mut buf = [0u8; 8192];
        let n = self.io.read(&mut buf).await.expect("peer read");
        assert!(n > 0, "client closed the transport");
        self.rx.extend_from_slice(&buf[..n]);
    }

    async fn expect_preface(&mut self) {
        while self.rx.len() < PREFACE.len() {
            self.fill().await;
        }
        assert_eq!(&self.rx[..PREFACE.len()], PREFACE);
        self.rx.drain(..PREFACE.len());
    }

    async fn read_frame(&mut self) -> Frame {
        loop {
            if let Some(view) = FrameView::parse(&self.rx) {
                if view.complete() {
                    let len = view.frame_len();
                    let header = *view.header();
                    let bytes = self.rx.drain(..len).collect();
                    return Frame { header, bytes };
                }
            }
            self.fill().await;
        }
    }

    /// Next frame of `typ`; connection plumbing the test does not care
    /// about (WINDOW_UPDATE, SETTINGS) is skipped.
    async fn read_frame_of(&mut self, typ: FrameType) -> Frame {
        loop {
            let frame = self.read_frame().await;
            if frame.header.frame_type() == Some(typ) {
                return frame;
            }
            match frame.header.frame_type() {
                Some(FrameType::WindowUpdate | FrameType::Settings) => {}
                other => panic!("unexpected {other:?} while waiting for {typ:?}"),
            }
        }
    }

    async fn write_buf(&mut self, buf: &ByteBuf) {
        self.io.write_all(buf.readable()).await.expect("peer write");
    }

    async fn handshake(&mut self, server_settings: &[(SettingsParameter, u32)]) {
        self.expect_preface().await;
        let frame = self.read_frame().await;
        assert_eq!(frame.header.frame_type(), Some(FrameType::Settings));
        assert!(!frame.view().is_ack());

        self.write_buf(&frame_builder::settings(server_settings)).await;
        self.write_buf(&frame_builder::settings_ack()).await;

        let frame = self.read_frame().await;
        assert_eq!(frame.header.frame_type(), Some(FrameType::Settings));
        assert!(frame.view().is_ack(), "client must ACK our settings");
        let frame = self.read_frame().await;
        assert_eq!(frame.header.frame_type(), Some(FrameType::WindowUpdate));
        assert_eq!(frame.header.stream_id, 0);
    }

    fn decode_block(&mut self, frame: &Frame) -> Vec<(String, String)> {
        let view = frame.view();
        let block = view.header_block().unwrap();
        self.decoder
            .decode(block)
            .unwrap()
            .iter()
            .map(|f| {
                (
                    String::from_utf8(f.name().to_vec()).unwrap(),
                    String::from_utf8(f.value().to_vec()).unwrap(),
                )
            })
            .collect()
    }

    fn encode_block(&mut self, fields: &[(&str, &str)]) -> ByteBuf {
        let mut queue: VecDeque<hpack::HeaderField> = fields
            .iter()
            .map(|&(n, v)| hpack::HeaderField::new(n.as_bytes().to_vec(), v.as_bytes().to_vec()))
            .collect();
        let (fragment, count) = self.encoder.encode(&mut queue, usize::MAX);
        assert_eq!(count, fields.len());
        fragment
    }

    async fn send_response_headers(
        &mut self,
        stream_id: StreamId,
        fields: &[(&str, &str)],
        end_stream: bool,
    ) {
        let fragment = self.encode_block(fields);
        let mut flags = HeadersFlags::END_HEADERS;
        if end_stream {
            flags |= HeadersFlags::END_STREAM;
        }
        self.write_buf(&frame_builder::headers(stream_id, flags, fragment.len()))
            .await;
        self.write_buf(&fragment).await;
    }

    async fn send_data(&mut self, stream_id: StreamId, payload: &[u8], end_stream: bool) {
        let flags = if end_stream {
            DataFlags::END_STREAM
        } else {
            DataFlags::empty()
        };
        let (mut frame, range) = frame_builder::data(stream_id, flags, payload.len());
        frame.span_mut(range).copy_from_slice(payload);
        self.write_buf(&frame).await;
    }
}

async fn connected(server_settings: &[(SettingsParameter, u32)]) -> (Session, TestPeer) {
    let (client_io, server_io) = tokio::io::duplex(1 << 20);
    let mut peer = TestPeer::new(server_io);
    let (session, ()) = tokio::join!(
        async { Session::connect(client_io).await.expect("connect") },
        peer.handshake(server_settings),
    );
    (session, peer)
}

fn header<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

#[tokio::test]
async fn handshake_raises_the_connection_window() {
    let (client_io, server_io) = tokio::io::duplex(1 << 20);
    let mut peer = TestPeer::new(server_io);

    let (session, increment) = tokio::join!(
        async { Session::connect(client_io).await.expect("connect") },
        async {
            peer.expect_preface().await;
            let frame = peer.read_frame().await;
            let items = frame.view().settings_items();
            assert!(items.contains(&(SettingsParameter::EnablePush, 0)));
            assert!(items.contains(&(SettingsParameter::MaxConcurrentStreams, 100)));
            assert!(items.contains(&(SettingsParameter::InitialWindowSize, 65_535)));

            peer.write_buf(&frame_builder::settings(&[])).await;
            peer.write_buf(&frame_builder::settings_ack()).await;

            let frame = peer.read_frame().await;
            assert!(frame.view().is_ack());
            let frame = peer.read_frame().await;
            assert_eq!(frame.header.frame_type(), Some(FrameType::WindowUpdate));
            assert_eq!(frame.header.stream_id, 0);
            frame.view().window_increment()
        }
    );

    // 65535 * 100 advertised minus the 65535 the connection starts with
    assert_eq!(increment, 65_535 * 100 - 65_535);
    drop(session);
}

#[tokio::test(start_paused = true)]
async fn missing_server_settings_times_out() {
    let (client_io, server_io) = tokio::io::duplex(1 << 20);
    let mut peer = TestPeer::new(server_io);

    let (result, ()) = tokio::join!(Session::connect(client_io), async {
        peer.expect_preface().await;
        // read the client SETTINGS and never answer
        let _ = peer.read_frame().await;
    });
    assert!(matches!(result, Err(Error::SettingsTimeout)));

    let frame = peer.read_frame().await;
    assert_eq!(frame.header.frame_type(), Some(FrameType::GoAway));
    assert_eq!(frame.view().goaway_error(), ErrorCode::SettingsTimeout);
}

#[tokio::test]
async fn get_request_round_trips() {
    let (session, mut peer) = connected(&[]).await;
    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.send(Request::get(url("https://example.com/data?x=1"))).await })
    };

    let frame = peer.read_frame_of(FrameType::Headers).await;
    assert_eq!(frame.header.stream_id, 1);
    let view = frame.view();
    assert!(view.end_headers());
    assert!(view.end_stream(), "GET has no body");
    let fields = peer.decode_block(&frame);
    assert_eq!(header(&fields, ":method"), Some("GET"));
    assert_eq!(header(&fields, ":scheme"), Some("https"));
    assert_eq!(header(&fields, ":path"), Some("/data?x=1"));
    assert_eq!(header(&fields, ":authority"), Some("example.com"));

    peer.send_response_headers(1, &[(":status", "200"), ("server", "loopback")], false)
        .await;
    peer.send_data(1, b"hello world", true).await;

    let response = task.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("Server"), Some("loopback"));
    assert_eq!(response.body().as_ref(), b"hello world");
    assert_eq!(response.body_len(), 11);
}

#[tokio::test]
async fn post_body_flows_with_end_stream_on_last_data() {
    let (session, mut peer) = connected(&[]).await;
    let body = vec![0x5a_u8; 40_000];
    let task = {
        let session = session.clone();
        let body = body.clone();
        tokio::spawn(async move {
            session
                .send(Request::post(url("https://example.com/upload"), body))
                .await
        })
    };

    let frame = peer.read_frame_of(FrameType::Headers).await;
    let view = frame.view();
    assert!(view.end_headers());
    assert!(!view.end_stream(), "body follows");
    let stream_id = frame.header.stream_id;

    let mut received = Vec::new();
    loop {
        let frame = peer.read_frame_of(FrameType::Data).await;
        let view = frame.view();
        received.extend_from_slice(view.data_payload().unwrap());
        if view.end_stream() {
            break;
        }
    }
    assert_eq!(received, body);

    peer.send_response_headers(stream_id, &[(":status", "204")], true)
        .await;
    let response = task.await.unwrap().unwrap();
    assert_eq!(response.status(), 204);
    assert_eq!(response.body_len(), 0);
}

#[tokio::test]
async fn interleaved_responses_reassemble_per_stream() {
    let (session, mut peer) = connected(&[]).await;
    let first = {
        let session = session.clone();
        tokio::spawn(async move { session.send(Request::get(url("https://example.com/one"))).await })
    };
    let second = {
        let session = session.clone();
        tokio::spawn(async move { session.send(Request::get(url("https://example.com/two"))).await })
    };

    // identify the two streams by :path, whatever the arrival order
    let mut by_path = std::collections::HashMap::new();
    for _ in 0..2 {
        let frame = peer.read_frame_of(FrameType::Headers).await;
        let fields = peer.decode_block(&frame);
        by_path.insert(
            header(&fields, ":path").unwrap().to_owned(),
            frame.header.stream_id,
        );
    }
    let one = by_path["/one"];
    let two = by_path["/two"];
    assert_ne!(one, two);

    peer.send_response_headers(one, &[(":status", "200")], false).await;
    peer.send_response_headers(two, &[(":status", "200")], false).await;
    peer.send_data(one, b"AA", false).await;
    peer.send_data(two, b"BB", false).await;
    peer.send_data(one, b"AAA", false).await;
    peer.send_data(two, b"BBB", true).await;
    peer.send_data(one, b"A", true).await;

    let response_one = first.await.unwrap().unwrap();
    let response_two = second.await.unwrap().unwrap();
    assert_eq!(response_one.body().as_ref(), b"AAAAAA");
    assert_eq!(response_two.body().as_ref(), b"BBBBB");
}

#[tokio::test]
async fn send_window_stalls_then_resumes_after_window_update() {
    let (session, mut peer) = connected(&[]).await;
    let task = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .send(Request::post(
                    url("https://example.com/big"),
                    vec![0x42_u8; 100_000],
                ))
                .await
        })
    };

    let frame = peer.read_frame_of(FrameType::Headers).await;
    let stream_id = frame.header.stream_id;

    // the peer window is the default 65535: exactly that much may flow
    let mut got = 0_usize;
    while got < 65_535 {
        let frame = peer.read_frame_of(FrameType::Data).await;
        let view = frame.view();
        got += view.data_payload().unwrap().len();
        assert!(!view.end_stream());
    }
    assert_eq!(got, 65_535);
    tokio::time::timeout(Duration::from_millis(100), peer.read_frame())
        .await
        .expect_err("client must stall without credit");

    peer.write_buf(&frame_builder::window_update(0, 40_000)).await;
    peer.write_buf(&frame_builder::window_update(stream_id, 40_000))
        .await;

    let mut rest = 0_usize;
    loop {
        let frame = peer.read_frame_of(FrameType::Data).await;
        let view = frame.view();
        rest += view.data_payload().unwrap().len();
        if view.end_stream() {
            break;
        }
    }
    assert_eq!(rest, 100_000 - 65_535);

    peer.send_response_headers(stream_id, &[(":status", "204")], true)
        .await;
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn initial_window_size_change_applies_to_live_streams() {
    let (session, mut peer) =
        connected(&[(SettingsParameter::InitialWindowSize, 10)]).await;
    let task = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .send(Request::post(url("https://example.com/slow"), vec![7_u8; 50]))
                .await
        })
    };

    let frame = peer.read_frame_of(FrameType::Headers).await;
    let stream_id = frame.header.stream_id;
    let frame = peer.read_frame_of(FrameType::Data).await;
    assert_eq!(frame.view().data_payload().unwrap().len(), 10);
    tokio::time::timeout(Duration::from_millis(100), peer.read_frame())
        .await
        .expect_err("ten-byte window exhausted");

    // raising INITIAL_WINDOW_SIZE retroactively adds 90 to the stream
    peer.write_buf(&frame_builder::settings(&[(
        SettingsParameter::InitialWindowSize,
        100,
    )]))
    .await;

    let mut rest = 0_usize;
    loop {
        let frame = peer.read_frame_of(FrameType::Data).await;
        let view = frame.view();
        rest += view.data_payload().unwrap().len();
        if view.end_stream() {
            break;
        }
    }
    assert_eq!(rest, 40);

    peer.send_response_headers(stream_id, &[(":status", "204")], true)
        .await;
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn ping_round_trips_and_overlapping_ping_is_busy() {
    let (session, mut peer) = connected(&[]).await;
    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.ping().await })
    };

    let frame = peer.read_frame_of(FrameType::Ping).await;
    assert!(!frame.view().is_ack());

    // a second ping while the first is unanswered
    assert!(matches!(session.ping().await, Err(Error::Busy)));

    peer.write_buf(&frame_builder::ping(frame.view().ping_payload(), true))
        .await;
    assert!(task.await.unwrap().is_ok());

    // and it echoes ours
    peer.write_buf(&frame_builder::ping(*b"opaque!!", false)).await;
    let frame = peer.read_frame_of(FrameType::Ping).await;
    assert!(frame.view().is_ack());
    assert_eq!(frame.view().ping_payload(), *b"opaque!!");
}

#[tokio::test]
async fn peer_reset_fails_only_that_request() {
    let (session, mut peer) = connected(&[]).await;
    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.send(Request::get(url("https://example.com/nope"))).await })
    };

    let frame = peer.read_frame_of(FrameType::Headers).await;
    peer.write_buf(&frame_builder::rst_stream(
        frame.header.stream_id,
        ErrorCode::RefusedStream,
    ))
    .await;
    assert!(matches!(
        task.await.unwrap(),
        Err(Error::Reset(ErrorCode::RefusedStream))
    ));

    // the connection survives for the next request
    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.send(Request::get(url("https://example.com/ok"))).await })
    };
    let frame = peer.read_frame_of(FrameType::Headers).await;
    peer.send_response_headers(frame.header.stream_id, &[(":status", "200")], true)
        .await;
    assert_eq!(task.await.unwrap().unwrap().status(), 200);
}

#[tokio::test]
async fn server_goaway_fails_pending_requests() {
    let (session, mut peer) = connected(&[]).await;
    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.send(Request::get(url("https://example.com/late"))).await })
    };

    let _ = peer.read_frame_of(FrameType::Headers).await;
    peer.write_buf(&frame_builder::goaway(
        ErrorCode::EnhanceYourCalm,
        0,
        b"try later",
    ))
    .await;

    let err = task.await.unwrap().unwrap_err();
    assert_eq!(err.wire_code(), ErrorCode::EnhanceYourCalm);

    // new requests are refused once the session is going away
    let err = session
        .send(Request::get(url("https://example.com/more")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotConnected | Error::Closed));
}

#[tokio::test]
async fn redirect_helper_builds_the_follow_up_request() {
    let (session, mut peer) = connected(&[]).await;
    let original = Request::get(url("https://example.com/old-path"));
    let task = {
        let session = session.clone();
        let request = original.clone();
        tokio::spawn(async move { session.send(request).await })
    };

    let frame = peer.read_frame_of(FrameType::Headers).await;
    peer.send_response_headers(
        frame.header.stream_id,
        &[(":status", "301"), ("location", "/new-path")],
        true,
    )
    .await;
    let response = task.await.unwrap().unwrap();
    assert_eq!(response.status(), 301);

    // the follow-up resolves the Location header against the original URL
    let follow_up = original.redirect(&response).unwrap();
    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.send(follow_up).await })
    };
    let frame = peer.read_frame_of(FrameType::Headers).await;
    let fields = peer.decode_block(&frame);
    assert_eq!(header(&fields, ":method"), Some("GET"));
    assert_eq!(header(&fields, ":path"), Some("/new-path"));
    assert_eq!(header(&fields, ":authority"), Some("example.com"));
    peer.send_response_headers(frame.header.stream_id, &[(":status", "200")], true)
        .await;
    assert_eq!(task.await.unwrap().unwrap().status(), 200);
}

#[tokio::test]
async fn trailers_append_to_the_header_list() {
    let (session, mut peer) = connected(&[]).await;
    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.send(Request::get(url("https://example.com/t"))).await })
    };

    let frame = peer.read_frame_of(FrameType::Headers).await;
    let stream_id = frame.header.stream_id;
    peer.send_response_headers(stream_id, &[(":status", "200")], false)
        .await;
    peer.send_data(stream_id, b"payload", false).await;
    peer.send_response_headers(stream_id, &[("x-checksum", "abc123")], true)
        .await;

    let response = task.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.header("x-checksum"), Some("abc123"));
    assert_eq!(response.body().as_ref(), b"payload");
}

#[tokio::test]
async fn response_header_block_split_mid_field_reassembles() {
    let (session, mut peer) = connected(&[]).await;
    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.send(Request::get(url("https://example.com/split"))).await })
    };

    let frame = peer.read_frame_of(FrameType::Headers).await;
    let stream_id = frame.header.stream_id;

    let fragment = peer.encode_block(&[
        (":status", "200"),
        ("content-type", "text/plain"),
        ("x-long-header", "a value long enough to cut in half"),
    ]);
    let bytes = fragment.readable();
    let cut = bytes.len() / 2;

    peer.write_buf(&frame_builder::headers(
        stream_id,
        HeadersFlags::empty(),
        cut,
    ))
    .await;
    peer.io.write_all(&bytes[..cut]).await.unwrap();
    peer.write_buf(&frame_builder::continuation(
        stream_id,
        h2kit::flags::ContinuationFlags::END_HEADERS,
        bytes.len() - cut,
    ))
    .await;
    let rest = bytes[cut..].to_vec();
    peer.io.write_all(&rest).await.unwrap();
    peer.send_data(stream_id, b"done", true).await;

    let response = task.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.header("x-long-header"),
        Some("a value long enough to cut in half")
    );
}

#[tokio::test]
async fn graceful_disconnect_sends_goaway() {
    let (session, mut peer) = connected(&[]).await;
    let ((), frame) = tokio::join!(session.disconnect(), async {
        peer.read_frame_of(FrameType::GoAway).await
    });
    assert_eq!(frame.view().goaway_error(), ErrorCode::NoError);
    assert_eq!(frame.view().goaway_last_stream_id(), 0);
}

#[tokio::test]
async fn live_settings_update_resolves_on_ack() {
    let (session, mut peer) = connected(&[]).await;
    let task = {
        let session = session.clone();
        tokio::spawn(async move {
            let mut settings = h2kit::Settings::local_default();
            settings.set(SettingsParameter::MaxConcurrentStreams, 32);
            settings.set(SettingsParameter::HeaderTableSize, 2048);
            session.update_settings(settings).await
        })
    };

    let frame = peer.read_frame().await;
    assert_eq!(frame.header.frame_type(), Some(FrameType::Settings));
    assert!(!frame.view().is_ack());
    let items = frame.view().settings_items();
    assert!(items.contains(&(SettingsParameter::MaxConcurrentStreams, 32)));
    assert!(items.contains(&(SettingsParameter::HeaderTableSize, 2048)));

    peer.write_buf(&frame_builder::settings_ack()).await;
    task.await.unwrap().unwrap();

    // the session is still fully usable afterwards
    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.send(Request::get(url("https://example.com/after"))).await })
    };
    let frame = peer.read_frame_of(FrameType::Headers).await;
    peer.send_response_headers(frame.header.stream_id, &[(":status", "200")], true)
        .await;
    assert_eq!(task.await.unwrap().unwrap().status(), 200);
}

#[cfg(feature = "json")]
mod json {
    use super::*;

    #[derive(Debug, serde::Serialize)]
    struct CreateUser {
        name: String,
        job: String,
    }

    #[derive(Debug, serde::Deserialize)]
    struct CreatedUser {
        name: String,
        id: u32,
    }

    #[tokio::test]
    async fn post_json_round_trips() {
        let (session, mut peer) = connected(&[]).await;
        let task = {
            let session = session.clone();
            tokio::spawn(async move {
                let request = Request::post_json(
                    url("https://example.com/api/users"),
                    &CreateUser {
                        name: "morpheus".to_owned(),
                        job: "leader".to_owned(),
                    },
                )
                .unwrap();
                session.send(request).await
            })
        };

        let frame = peer.read_frame_of(FrameType::Headers).await;
        let stream_id = frame.header.stream_id;
        let fields = peer.decode_block(&frame);
        assert_eq!(header(&fields, "content-type"), Some("application/json"));

        let mut body = Vec::new();
        loop {
            let frame = peer.read_frame_of(FrameType::Data).await;
            let view = frame.view();
            body.extend_from_slice(view.data_payload().unwrap());
            if view.end_stream() {
                break;
            }
        }
        let sent: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(sent["name"], "morpheus");
        assert_eq!(sent["job"], "leader");

        peer.send_response_headers(
            stream_id,
            &[(":status", "201"), ("content-type", "application/json")],
            false,
        )
        .await;
        peer.send_data(stream_id, br#"{"name":"morpheus","id":7}"#, true)
            .await;

        let response = task.await.unwrap().unwrap();
        assert_eq!(response.status(), 201);
        let created: CreatedUser = response.json().unwrap();
        assert_eq!(created.name, "morpheus");
        assert_eq!(created.id, 7);
    }
}

#[tokio::test(start_paused = true)]
async fn request_timeout_resets_the_stream() {
    let (session, mut peer) = connected(&[]).await;
    let task = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .send(
                    Request::get(url("https://example.com/slow"))
                        .timeout(Duration::from_secs(2)),
                )
                .await
        })
    };

    let frame = peer.read_frame_of(FrameType::Headers).await;
    let stream_id = frame.header.stream_id;
    // never answer; the two-second request timer fires
    assert!(matches!(task.await.unwrap(), Err(Error::Timeout)));

    let frame = peer.read_frame_of(FrameType::ResetStream).await;
    assert_eq!(frame.header.stream_id, stream_id);
    assert_eq!(frame.view().rst_error(), ErrorCode::Cancel);
}
