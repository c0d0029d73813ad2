//! 控制器端到端行为：以真实 TCP 回环模拟一台 OpenFlow 1.3 交换机。

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use spark_openflow::{
    DEFAULT_MAX_FRAME_LEN, FeaturesReply, OFP_VERSION, OfpFrame, OfpMessage, SwitchConfig,
    message::error_type,
};
use spark_switch::{
    BoundController, Controller, ControllerConfig, DatapathId, SwitchError, SwitchReadyHandler,
    SwitchRef,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::{Notify, mpsc},
    task::JoinHandle,
    time::timeout,
};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Eq, PartialEq)]
enum Event {
    Ready(SwitchRef),
    Disconnected(SwitchRef),
}

impl Event {
    fn ready(self) -> SwitchRef {
        match self {
            Event::Ready(switch) => switch,
            other => panic!("expected ready event, got {other:?}"),
        }
    }

    fn disconnected(self) -> SwitchRef {
        match self {
            Event::Disconnected(switch) => switch,
            other => panic!("expected disconnect event, got {other:?}"),
        }
    }
}

struct Recorder {
    events: mpsc::UnboundedSender<Event>,
}

#[async_trait]
impl SwitchReadyHandler for Recorder {
    async fn switch_ready(&self, switch: SwitchRef) {
        let _ = self.events.send(Event::Ready(switch));
    }

    async fn switch_disconnected(&self, switch: SwitchRef) {
        let _ = self.events.send(Event::Disconnected(switch));
    }
}

struct FakeSwitch {
    stream: TcpStream,
    inbound: BytesMut,
}

impl FakeSwitch {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to controller");
        Self {
            stream,
            inbound: BytesMut::new(),
        }
    }

    async fn send(&mut self, frame: OfpFrame) {
        let bytes = frame.to_bytes().expect("encode frame");
        self.stream.write_all(&bytes).await.expect("write frame");
    }

    /// 读取下一帧；连接关闭时返回 `None`。
    async fn recv(&mut self) -> Option<OfpFrame> {
        timeout(WAIT, async {
            let mut chunk = [0u8; 1024];
            loop {
                if let Some(frame) =
                    OfpFrame::decode(&mut self.inbound, DEFAULT_MAX_FRAME_LEN).expect("decode")
                {
                    return Some(frame);
                }
                let read = self.stream.read(&mut chunk).await.ok()?;
                if read == 0 {
                    return None;
                }
                self.inbound.extend_from_slice(&chunk[..read]);
            }
        })
        .await
        .expect("controller responded in time")
    }

    async fn handshake(&mut self, dpid: u64) {
        let hello = self.recv().await.expect("controller hello");
        assert_eq!(hello.version, OFP_VERSION);
        assert!(matches!(hello.message, OfpMessage::Hello(_)));
        self.send(OfpFrame::new(1, OfpMessage::Hello(Bytes::new()))).await;

        let request = self.recv().await.expect("features request");
        assert_eq!(request.message, OfpMessage::FeaturesRequest);
        let reply = FeaturesReply {
            datapath_id: dpid,
            n_buffers: 256,
            n_tables: 254,
            auxiliary_id: 0,
            capabilities: 0x4f,
        };
        self.send(OfpFrame::new(request.xid, OfpMessage::FeaturesReply(reply)))
            .await;
    }
}

fn loopback_config() -> ControllerConfig {
    ControllerConfig {
        listen: "127.0.0.1:0".parse().expect("addr"),
        ..ControllerConfig::default()
    }
}

async fn start(
    config: ControllerConfig,
) -> (
    BoundController,
    mpsc::UnboundedReceiver<Event>,
    Arc<Recorder>,
) {
    let bound = Controller::new(config)
        .expect("valid config")
        .bind()
        .await
        .expect("bind");
    let (tx, rx) = mpsc::unbounded_channel();
    (bound, rx, Arc::new(Recorder { events: tx }))
}

fn spawn_run(
    bound: BoundController,
    recorder: Arc<Recorder>,
) -> JoinHandle<Result<(), SwitchError>> {
    tokio::spawn(bound.run(recorder))
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(WAIT, events.recv())
        .await
        .expect("event in time")
        .expect("handler alive")
}

#[tokio::test(flavor = "multi_thread")]
async fn ready_switch_receives_messages_and_echo_replies() {
    let (bound, mut events, recorder) = start(loopback_config()).await;
    let addr = bound.local_addr();
    let sender = bound.sender();
    let shutdown = bound.shutdown_token();
    let running = spawn_run(bound, recorder);

    let dpid = DatapathId::new(0x0000_0000_0000_1234);
    let mut switch = FakeSwitch::connect(addr).await;
    switch.handshake(dpid.get()).await;
    let ready = next_event(&mut events).await.ready();
    assert_eq!(ready.dpid(), dpid);
    assert!(sender.is_connected(dpid));

    sender
        .send(dpid, OfpMessage::SetConfig(SwitchConfig::default()))
        .await
        .expect("send set_config");
    let frame = switch.recv().await.expect("set_config delivered");
    assert_eq!(frame.message, OfpMessage::SetConfig(SwitchConfig::default()));

    switch
        .send(OfpFrame::new(77, OfpMessage::EchoRequest(Bytes::from_static(b"ping"))))
        .await;
    let echo = switch.recv().await.expect("echo reply");
    assert_eq!(echo.xid, 77);
    assert_eq!(echo.message, OfpMessage::EchoReply(Bytes::from_static(b"ping")));

    drop(switch);
    assert_eq!(next_event(&mut events).await.disconnected(), ready);
    assert!(!sender.is_connected(dpid));

    shutdown.shutdown();
    timeout(WAIT, running)
        .await
        .expect("controller stopped")
        .expect("join")
        .expect("clean shutdown");
}

#[tokio::test(flavor = "multi_thread")]
async fn successive_sends_use_fresh_transaction_ids() {
    let (bound, mut events, recorder) = start(loopback_config()).await;
    let addr = bound.local_addr();
    let sender = bound.sender();
    let shutdown = bound.shutdown_token();
    let running = spawn_run(bound, recorder);

    let dpid = DatapathId::new(0xbeef);
    let mut switch = FakeSwitch::connect(addr).await;
    switch.handshake(dpid.get()).await;
    assert_eq!(next_event(&mut events).await.ready().dpid(), dpid);

    for _ in 0..3 {
        sender
            .send(dpid, OfpMessage::BarrierRequest)
            .await
            .expect("send barrier");
    }
    let mut xids = Vec::new();
    for _ in 0..3 {
        let frame = switch.recv().await.expect("barrier delivered");
        assert_eq!(frame.message, OfpMessage::BarrierRequest);
        xids.push(frame.xid);
    }
    assert!(xids.windows(2).all(|pair| pair[0] < pair[1]), "{xids:?}");

    shutdown.shutdown();
    timeout(WAIT, running)
        .await
        .expect("controller stopped")
        .expect("join")
        .expect("clean shutdown");
    assert!(switch.recv().await.is_none(), "shutdown closes live connections");
}

#[tokio::test(flavor = "multi_thread")]
async fn outdated_hello_is_rejected_with_hello_failed() {
    let (bound, mut events, recorder) = start(loopback_config()).await;
    let addr = bound.local_addr();
    let shutdown = bound.shutdown_token();
    let running = spawn_run(bound, recorder);

    let mut switch = FakeSwitch::connect(addr).await;
    let hello = switch.recv().await.expect("controller hello");
    assert!(matches!(hello.message, OfpMessage::Hello(_)));
    switch
        .send(OfpFrame {
            version: 0x01,
            xid: 9,
            message: OfpMessage::Hello(Bytes::new()),
        })
        .await;

    let reply = switch.recv().await.expect("error reply");
    assert_eq!(reply.xid, 9);
    match reply.message {
        OfpMessage::Error(err) => {
            assert_eq!(err.err_type, error_type::HELLO_FAILED);
            assert_eq!(err.code, error_type::hello_failed::INCOMPATIBLE);
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert!(switch.recv().await.is_none(), "connection closed after rejection");
    assert!(events.try_recv().is_err(), "switch_ready must not fire");

    shutdown.shutdown();
    timeout(WAIT, running)
        .await
        .expect("controller stopped")
        .expect("join")
        .expect("clean shutdown");
}

#[tokio::test(flavor = "multi_thread")]
async fn silent_peer_is_dropped_after_handshake_timeout() {
    let config = ControllerConfig {
        handshake_timeout_ms: 100,
        ..loopback_config()
    };
    let (bound, mut events, recorder) = start(config).await;
    let addr = bound.local_addr();
    let shutdown = bound.shutdown_token();
    let running = spawn_run(bound, recorder);

    let mut switch = FakeSwitch::connect(addr).await;
    let hello = switch.recv().await.expect("controller hello");
    assert!(matches!(hello.message, OfpMessage::Hello(_)));
    assert!(switch.recv().await.is_none(), "controller gave up on the handshake");
    assert!(events.try_recv().is_err());

    shutdown.shutdown();
    timeout(WAIT, running)
        .await
        .expect("controller stopped")
        .expect("join")
        .expect("clean shutdown");
}

#[tokio::test(flavor = "multi_thread")]
async fn reconnecting_datapath_replaces_previous_connection() {
    let (bound, mut events, recorder) = start(loopback_config()).await;
    let addr = bound.local_addr();
    let sender = bound.sender();
    let shutdown = bound.shutdown_token();
    let running = spawn_run(bound, recorder);

    let dpid = DatapathId::new(0x42);
    let mut first = FakeSwitch::connect(addr).await;
    first.handshake(dpid.get()).await;
    let first_ref = next_event(&mut events).await.ready();

    let mut second = FakeSwitch::connect(addr).await;
    second.handshake(dpid.get()).await;
    let second_ref = next_event(&mut events).await.ready();
    assert_eq!(second_ref.dpid(), dpid);
    assert_ne!(first_ref, second_ref, "each connection gets its own reference");
    assert!(first.recv().await.is_none(), "previous connection closed");

    let err = sender
        .send_to(first_ref, OfpMessage::BarrierRequest)
        .await
        .expect_err("first connection is gone");
    assert!(matches!(err, SwitchError::ConnectionReplaced { .. }), "{err:?}");
    assert!(err.is_disconnect());

    sender
        .send(dpid, OfpMessage::GetConfigRequest)
        .await
        .expect("send to replacement");
    let frame = second.recv().await.expect("delivered to replacement");
    assert_eq!(frame.message, OfpMessage::GetConfigRequest);
    assert!(sender.is_connected(dpid), "stale teardown kept the replacement");
    assert!(events.try_recv().is_err(), "replacement is not a disconnect");

    shutdown.shutdown();
    timeout(WAIT, running)
        .await
        .expect("controller stopped")
        .expect("join")
        .expect("clean shutdown");
    assert_eq!(next_event(&mut events).await.disconnected(), second_ref);
}

/// 就绪回调阻塞在闸门上，直到测试放行。
struct GatedHandler {
    events: mpsc::UnboundedSender<Event>,
    gate: Notify,
    finished: AtomicBool,
}

#[async_trait]
impl SwitchReadyHandler for GatedHandler {
    async fn switch_ready(&self, switch: SwitchRef) {
        let _ = self.events.send(Event::Ready(switch));
        self.gate.notified().await;
        self.finished.store(true, Ordering::SeqCst);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn run_waits_for_ready_handlers_before_returning() {
    let bound = Controller::new(loopback_config())
        .expect("valid config")
        .bind()
        .await
        .expect("bind");
    let addr = bound.local_addr();
    let shutdown = bound.shutdown_token();
    let (tx, mut events) = mpsc::unbounded_channel();
    let handler = Arc::new(GatedHandler {
        events: tx,
        gate: Notify::new(),
        finished: AtomicBool::new(false),
    });
    let mut running = tokio::spawn(bound.run(handler.clone()));

    let mut switch = FakeSwitch::connect(addr).await;
    switch.handshake(7).await;
    next_event(&mut events).await.ready();

    shutdown.shutdown();
    assert!(switch.recv().await.is_none(), "connection closed on shutdown");
    assert!(
        timeout(Duration::from_millis(200), &mut running).await.is_err(),
        "run must not return while switch_ready is still running"
    );

    handler.gate.notify_one();
    timeout(WAIT, running)
        .await
        .expect("controller stopped")
        .expect("join")
        .expect("clean shutdown");
    assert!(handler.finished.load(Ordering::SeqCst));
}
