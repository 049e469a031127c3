//! Connection state machine talking to the master agent (RFC 2741 §7.1).
//!
//! One [`run`] call owns a session for the lifetime of the subagent process:
//! it dials the master's Unix-domain socket, waits out a settle delay, opens
//! a session, registers every subtree the composed [`MibTable`] answers for,
//! then serves Get/GetNext/GetBulk/Set requests until the connection drops
//! or the master sends `Close` - at which point it loops back to dialing
//! again. Grounded in the reference `SocketManager`/`AgentX` pair: a fixed
//! connect timeout, a fixed retry interval, and a failure counter that
//! escalates its own log level rather than giving up.
//!
//! Response PDUs received *from* the master - replies to the `Open`,
//! `Register`, and `Close` PDUs this subagent sent - are consumed inline by
//! the function that sent the request; only genuine incoming requests
//! (`Get`, `GetNext`, `GetBulk`, the four Set phases, `Ping`) reach the
//! dispatch loop below.

mod transport;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio_util::sync::CancellationToken;

use crate::agent::SetCoordinator;
use crate::error::{Error, Result};
use crate::handler::{GetNextResult, GetResult, RequestContext, Response};
use crate::mib::MibTable;
use crate::oid::Oid;
use crate::value::Value;
use crate::varbind::VarBind;
use crate::wire::{
    decode_pdu as _, encode_pdu, Flags, OpenPayload, Pdu, PduBody, RegisterPayload,
    ResponsePayload, SearchRange,
};

use transport::PduReader;

/// Default path of the master agent's AgentX Unix-domain socket.
pub const DEFAULT_SOCKET_PATH: &str = "/var/agentx/master";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const RETRY_INTERVAL: Duration = Duration::from_secs(3);
const OPEN_DELAY: Duration = Duration::from_secs(1);
const ESCALATE_AFTER_FAILURES: u32 = 10;
const CLOSE_REASON_SHUTDOWN: u8 = 5;

/// Configuration for one subagent session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path to the master agent's AgentX socket.
    pub socket_path: PathBuf,
    /// Human-readable description sent in the Open PDU.
    pub description: String,
    /// Requested PDU processing timeout, in seconds, carried in the Open PDU
    /// (RFC 2741 §6.2.1). Zero means "use the master's default".
    pub open_timeout: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            description: "agentx-subagent".to_string(),
            open_timeout: 0,
        }
    }
}

/// Named states of the connection lifecycle, surfaced only through tracing -
/// the control flow below is what actually drives transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connecting,
    Retry,
    Opening,
    Registering,
    Serving,
}

fn trace_state(state: SessionState) {
    tracing::debug!(?state, "session state transition");
}

fn agent_flags() -> Flags {
    Flags {
        network_byte_order: true,
        ..Default::default()
    }
}

/// Monotonic packet ID generator for one session's connection. Zero is
/// avoided as a value since it reads as "unset" in captures and logs; not a
/// wire requirement.
struct PacketIds {
    next: u32,
}

impl PacketIds {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn next(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        if self.next == 0 {
            self.next = 1;
        }
        id
    }
}

/// Drive one subagent session against `mib` until `shutdown` is cancelled.
///
/// Reconnects automatically on any transport error or master-initiated
/// `Close`, waiting [`RETRY_INTERVAL`] between attempts. Never returns until
/// `shutdown` is cancelled.
pub async fn run(
    config: SessionConfig,
    mib: Arc<MibTable>,
    set_coordinator: Arc<SetCoordinator>,
    shutdown: CancellationToken,
) {
    let started_at = Instant::now();
    let mut consecutive_failures: u32 = 0;

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        trace_state(SessionState::Connecting);
        let stream = match connect(&config.socket_path, &shutdown).await {
            ConnectOutcome::Stream(stream) => stream,
            ConnectOutcome::Shutdown => return,
            ConnectOutcome::Failed(reason) => {
                consecutive_failures += 1;
                trace_state(SessionState::Retry);
                if consecutive_failures >= ESCALATE_AFTER_FAILURES {
                    tracing::error!(
                        socket = %config.socket_path.display(),
                        attempts = consecutive_failures,
                        reason,
                        "repeated failures connecting to master agent"
                    );
                } else {
                    tracing::warn!(
                        socket = %config.socket_path.display(),
                        attempt = consecutive_failures,
                        reason,
                        "failed to connect to master agent, retrying"
                    );
                }
                if wait(RETRY_INTERVAL, &shutdown).await.is_shutdown() {
                    return;
                }
                continue;
            }
        };
        consecutive_failures = 0;

        match serve_connection(stream, &config, &mib, &set_coordinator, &shutdown, started_at).await
        {
            Ok(()) => tracing::info!("AgentX session ended, reconnecting"),
            Err(error) => tracing::warn!(%error, "AgentX session failed, reconnecting"),
        }

        if shutdown.is_cancelled() {
            return;
        }
        if wait(RETRY_INTERVAL, &shutdown).await.is_shutdown() {
            return;
        }
    }
}

enum ConnectOutcome {
    Stream(UnixStream),
    Failed(String),
    Shutdown,
}

async fn connect(path: &Path, shutdown: &CancellationToken) -> ConnectOutcome {
    tokio::select! {
        _ = shutdown.cancelled() => ConnectOutcome::Shutdown,
        result = tokio::time::timeout(CONNECT_TIMEOUT, UnixStream::connect(path)) => {
            match result {
                Ok(Ok(stream)) => ConnectOutcome::Stream(stream),
                Ok(Err(error)) => ConnectOutcome::Failed(error.to_string()),
                Err(_) => ConnectOutcome::Failed("connect timed out".to_string()),
            }
        }
    }
}

enum Wait {
    Elapsed,
    Shutdown,
}

impl Wait {
    fn is_shutdown(&self) -> bool {
        matches!(self, Wait::Shutdown)
    }
}

async fn wait(duration: Duration, shutdown: &CancellationToken) -> Wait {
    tokio::select! {
        _ = shutdown.cancelled() => Wait::Shutdown,
        _ = tokio::time::sleep(duration) => Wait::Elapsed,
    }
}

/// Open, register, and serve one connection until it ends (cleanly via a
/// master `Close`, a shutdown request, or a transport error).
async fn serve_connection<S>(
    stream: S,
    config: &SessionConfig,
    mib: &MibTable,
    set_coordinator: &SetCoordinator,
    shutdown: &CancellationToken,
    started_at: Instant,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    if wait(OPEN_DELAY, shutdown).await.is_shutdown() {
        return Ok(());
    }

    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = PduReader::new(read_half);
    let mut packet_ids = PacketIds::new();

    trace_state(SessionState::Opening);
    let session_id = open_session(&mut reader, &mut write_half, config, &mut packet_ids).await?;
    tracing::info!(session_id, "AgentX session opened");

    trace_state(SessionState::Registering);
    register_subtrees(&mut reader, &mut write_half, session_id, mib, &mut packet_ids).await?;
    tracing::info!(session_id, "subtree registration complete");

    trace_state(SessionState::Serving);
    loop {
        let pdu = tokio::select! {
            _ = shutdown.cancelled() => {
                close_session(&mut write_half, session_id, &mut packet_ids).await;
                return Ok(());
            }
            pdu = reader.next_pdu() => pdu?,
        };

        if pdu.header.session_id != session_id {
            tracing::warn!(
                expected = session_id,
                got = pdu.header.session_id,
                "PDU for a different session, ignoring"
            );
            continue;
        }

        match pdu.body {
            PduBody::Close { reason } => {
                tracing::info!(reason, "master closed the session");
                return Ok(());
            }
            PduBody::Response(resp) => {
                tracing::debug!(error = resp.error, "unmatched response from master, ignoring");
            }
            body => {
                let mut ctx =
                    RequestContext::new(session_id, pdu.header.transaction_id, pdu.header.packet_id);
                ctx.context = pdu.context.clone();
                if let Some(response) = dispatch_request(mib, set_coordinator, &ctx, body).await {
                    let payload = to_response_payload(response, sys_up_time(started_at));
                    send_pdu(
                        &mut write_half,
                        agent_flags(),
                        session_id,
                        pdu.header.transaction_id,
                        pdu.header.packet_id,
                        &PduBody::Response(payload),
                    )
                    .await?;
                }
            }
        }
    }
}

async fn send_pdu<W: AsyncWrite + Unpin>(
    writer: &mut W,
    flags: Flags,
    session_id: u32,
    transaction_id: u32,
    packet_id: u32,
    body: &PduBody,
) -> Result<()> {
    let bytes = encode_pdu(flags, session_id, transaction_id, packet_id, None, body);
    writer.write_all(&bytes).await?;
    Ok(())
}

async fn open_session<S, W>(
    reader: &mut PduReader<S>,
    writer: &mut W,
    config: &SessionConfig,
    packet_ids: &mut PacketIds,
) -> Result<u32>
where
    S: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let packet_id = packet_ids.next();
    let open = PduBody::Open(OpenPayload {
        timeout: config.open_timeout,
        id: Oid::empty(),
        description: Bytes::from(config.description.clone().into_bytes()),
    });
    send_pdu(writer, agent_flags(), 0, 0, packet_id, &open).await?;

    let pdu = reader.next_pdu().await?;
    let PduBody::Response(resp) = pdu.body else {
        return Err(Error::MasterClosed { code: 0 });
    };
    if resp.error != 0 {
        return Err(Error::MasterClosed { code: resp.error });
    }
    if pdu.header.session_id == 0 {
        return Err(Error::MasterClosed { code: resp.error });
    }
    Ok(pdu.header.session_id)
}

async fn register_subtrees<S, W>(
    reader: &mut PduReader<S>,
    writer: &mut W,
    session_id: u32,
    mib: &MibTable,
    packet_ids: &mut PacketIds,
) -> Result<()>
where
    S: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    for (index, subtree) in mib.registrations().into_iter().enumerate() {
        let packet_id = packet_ids.next();
        let priority = index.min(u8::MAX as usize) as u8;
        let body = PduBody::Register(RegisterPayload {
            timeout: 0,
            priority,
            range_subid: 0,
            subtree: subtree.clone(),
            upper_bound: None,
        });
        send_pdu(writer, agent_flags(), session_id, 0, packet_id, &body).await?;

        let pdu = reader.next_pdu().await?;
        match pdu.body {
            PduBody::Response(resp) if resp.error == 0 => {
                tracing::debug!(%subtree, priority, "registered subtree");
            }
            PduBody::Response(resp) => {
                tracing::warn!(
                    %subtree,
                    priority,
                    error = resp.error,
                    "master rejected subtree registration"
                );
            }
            other => {
                tracing::warn!(?other, "unexpected PDU while awaiting Register response");
            }
        }
    }
    Ok(())
}

async fn close_session<W: AsyncWrite + Unpin>(
    writer: &mut W,
    session_id: u32,
    packet_ids: &mut PacketIds,
) {
    let packet_id = packet_ids.next();
    let body = PduBody::Close {
        reason: CLOSE_REASON_SHUTDOWN,
    };
    if let Err(error) = send_pdu(writer, agent_flags(), session_id, 0, packet_id, &body).await {
        tracing::debug!(%error, "failed to send Close PDU during shutdown");
    }
}

async fn dispatch_request(
    mib: &MibTable,
    set_coordinator: &SetCoordinator,
    ctx: &RequestContext,
    body: PduBody,
) -> Option<Response> {
    match body {
        PduBody::Get { ranges } => Some(handle_get(mib, ctx, &ranges).await),
        PduBody::GetNext { ranges } => Some(handle_get_next(mib, ctx, &ranges).await),
        PduBody::GetBulk {
            non_repeaters,
            max_repetitions,
            ranges,
        } => Some(handle_get_bulk(mib, ctx, non_repeaters, max_repetitions, &ranges).await),
        PduBody::TestSet { varbinds } => Some(set_coordinator.test_set(mib, ctx, &varbinds).await),
        PduBody::CommitSet => Some(set_coordinator.commit_set(mib, ctx).await),
        PduBody::UndoSet => Some(set_coordinator.undo_set(mib, ctx).await),
        PduBody::CleanupSet => {
            set_coordinator.cleanup_set(mib, ctx).await;
            Some(Response::success(Vec::new()))
        }
        PduBody::Ping => Some(Response::success(Vec::new())),
        other => {
            tracing::warn!(?other, "ignoring unexpected PDU type from master");
            None
        }
    }
}

async fn handle_get(mib: &MibTable, ctx: &RequestContext, ranges: &[SearchRange]) -> Response {
    let mut varbinds = Vec::with_capacity(ranges.len());
    for range in ranges {
        let value = match mib.get(ctx, &range.start).await {
            GetResult::Value(v) => v,
            GetResult::NoSuchObject => Value::NoSuchObject,
            GetResult::NoSuchInstance => Value::NoSuchInstance,
        };
        varbinds.push(VarBind::new(range.start.clone(), value));
    }
    Response::success(varbinds)
}

async fn handle_get_next(mib: &MibTable, ctx: &RequestContext, ranges: &[SearchRange]) -> Response {
    let mut varbinds = Vec::with_capacity(ranges.len());
    for range in ranges {
        varbinds.push(next_in_range(mib, ctx, range).await);
    }
    Response::success(varbinds)
}

async fn handle_get_bulk(
    mib: &MibTable,
    ctx: &RequestContext,
    non_repeaters: u16,
    max_repetitions: u16,
    ranges: &[SearchRange],
) -> Response {
    let non_repeaters = non_repeaters as usize;
    let mut varbinds = Vec::new();

    for range in ranges.iter().take(non_repeaters) {
        varbinds.push(next_in_range(mib, ctx, range).await);
    }

    let mut cursors: Vec<SearchRange> = ranges.iter().skip(non_repeaters).cloned().collect();
    for _ in 0..max_repetitions {
        if cursors.is_empty() {
            break;
        }
        for cursor in cursors.iter_mut() {
            let vb = next_in_range(mib, ctx, cursor).await;
            if vb.value != Value::EndOfMibView {
                cursor.start = vb.oid.clone();
                // The row just returned has already been visited; every
                // further repetition walks strictly past it.
                cursor.include = false;
            }
            varbinds.push(vb);
        }
    }

    Response::success(varbinds)
}

/// Resolve a single `GetNext`/`GetBulk` search range to one varbind,
/// respecting its upper bound (an empty `end` means unbounded).
///
/// When `range.include` is set, `range.start` itself is in play: try an
/// exact `get` there first and only fall back to `get_next` if it doesn't
/// resolve to a concrete value (RFC 2741 §5.3, spec.md §4.2 step 2.1).
async fn next_in_range(mib: &MibTable, ctx: &RequestContext, range: &SearchRange) -> VarBind {
    if range.include
        && let GetResult::Value(value) = mib.get(ctx, &range.start).await
    {
        return VarBind::new(range.start.clone(), value);
    }
    match mib.get_next(ctx, &range.start).await {
        GetNextResult::Value(vb) if range.end.is_empty() || vb.oid < range.end => vb,
        _ => VarBind::new(range.start.clone(), Value::EndOfMibView),
    }
}

fn to_response_payload(response: Response, sys_up_time: u32) -> ResponsePayload {
    ResponsePayload {
        sys_up_time,
        error: response.error_status.as_i32() as u16,
        error_index: response.error_index as u16,
        varbinds: response.varbinds,
    }
}

fn sys_up_time(started_at: Instant) -> u32 {
    (started_at.elapsed().as_millis() / 10) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{BoxFuture, MibProducer, SetResult};
    use crate::mib::MibBuilder;
    use crate::oid;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Mutex;
    use tokio::io::DuplexStream;

    struct Scalar {
        oid: Oid,
        value: AtomicI32,
    }

    impl MibProducer for Scalar {
        fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
            Box::pin(async move {
                if oid == &self.oid {
                    GetResult::Value(Value::Integer(self.value.load(Ordering::Relaxed)))
                } else {
                    GetResult::NoSuchObject
                }
            })
        }

        fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
            Box::pin(async move {
                if oid < &self.oid {
                    GetNextResult::Value(VarBind::new(self.oid.clone(), Value::Integer(self.value.load(Ordering::Relaxed))))
                } else {
                    GetNextResult::EndOfMibView
                }
            })
        }

        fn test_set<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid, value: &'a Value) -> BoxFuture<'a, SetResult> {
            Box::pin(async move {
                if oid != &self.oid {
                    return SetResult::NotWritable;
                }
                match value {
                    Value::Integer(_) => SetResult::Ok,
                    _ => SetResult::WrongType,
                }
            })
        }

        fn commit_set<'a>(&'a self, _ctx: &'a RequestContext, _oid: &'a Oid, value: &'a Value) -> BoxFuture<'a, SetResult> {
            Box::pin(async move {
                if let Value::Integer(v) = value {
                    self.value.store(*v, Ordering::Relaxed);
                }
                SetResult::Ok
            })
        }
    }

    struct Table(crate::handler::OidTable<Value>);

    impl MibProducer for Table {
        fn get<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
            Box::pin(async move {
                self.0.get(oid).cloned().map(GetResult::Value).unwrap_or(GetResult::NoSuchObject)
            })
        }

        fn get_next<'a>(&'a self, _ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
            Box::pin(async move {
                self.0
                    .get_next(oid)
                    .map(|(o, v)| GetNextResult::Value(VarBind::new(o.clone(), v.clone())))
                    .unwrap_or(GetNextResult::EndOfMibView)
            })
        }
    }

    fn test_mib() -> MibTable {
        let counter_oid = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0);
        let mut entries = crate::handler::OidTable::new();
        entries.insert(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 1), Value::Integer(10));
        entries.insert(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 2), Value::Integer(20));
        entries.insert(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 3), Value::Integer(30));

        MibBuilder::new()
            .scalar(
                counter_oid.clone(),
                Arc::new(Scalar { oid: counter_oid, value: AtomicI32::new(0) }),
            )
            .unwrap()
            .subtree(oid!(1, 3, 6, 1, 4, 1, 99999, 2), Arc::new(Table(entries)))
            .unwrap()
            .build()
    }

    async fn read_one(master: &mut DuplexStream) -> Pdu {
        let mut reader = PduReader::new(&mut *master);
        reader.next_pdu().await.unwrap()
    }

    async fn write_one(
        master: &mut DuplexStream,
        session_id: u32,
        transaction_id: u32,
        packet_id: u32,
        body: &PduBody,
    ) {
        let bytes = encode_pdu(agent_flags(), session_id, transaction_id, packet_id, None, body);
        master.write_all(&bytes).await.unwrap();
    }

    async fn respond(master: &mut DuplexStream, to: &Pdu, error: u16) {
        write_one(
            master,
            7,
            to.header.transaction_id,
            to.header.packet_id,
            &PduBody::Response(ResponsePayload {
                sys_up_time: 0,
                error,
                error_index: 0,
                varbinds: Vec::new(),
            }),
        )
        .await;
    }

    /// Drives the Open + Register handshake as the master side would,
    /// leaving the duplex ready for ordinary request/response traffic.
    async fn handshake(master: &mut DuplexStream, expected_registrations: usize) {
        let open = read_one(master).await;
        assert!(matches!(open.body, PduBody::Open(_)));
        write_one(
            master,
            7,
            0,
            open.header.packet_id,
            &PduBody::Response(ResponsePayload {
                sys_up_time: 0,
                error: 0,
                error_index: 0,
                varbinds: Vec::new(),
            }),
        )
        .await;

        for _ in 0..expected_registrations {
            let register = read_one(master).await;
            assert!(matches!(register.body, PduBody::Register(_)));
            respond(master, &register, 0).await;
        }
    }

    fn spawn_session(mib: Arc<MibTable>) -> (tokio::task::JoinHandle<Result<()>>, DuplexStream, CancellationToken) {
        let (agent_side, master_side) = tokio::io::duplex(16 * 1024);
        let shutdown = CancellationToken::new();
        let set_coordinator = Arc::new(SetCoordinator::new());
        let config = SessionConfig {
            socket_path: PathBuf::new(),
            description: "test".to_string(),
            open_timeout: 0,
        };
        let started_at = Instant::now();
        let shutdown_clone = shutdown.clone();
        let handle = tokio::spawn(async move {
            serve_connection(agent_side, &config, &mib, &set_coordinator, &shutdown_clone, started_at).await
        });
        (handle, master_side, shutdown)
    }

    #[tokio::test]
    async fn opens_registers_and_answers_get() {
        let mib = Arc::new(test_mib());
        let (handle, mut master, shutdown) = spawn_session(mib);

        handshake(&mut master, 2).await;

        write_one(
            &mut master,
            7,
            1,
            100,
            &PduBody::Get {
                ranges: vec![SearchRange::new(oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0), Oid::empty(), true)],
            },
        )
        .await;
        let response = read_one(&mut master).await;
        let PduBody::Response(resp) = response.body else { panic!("expected Response") };
        assert_eq!(resp.error, 0);
        assert_eq!(resp.varbinds, vec![VarBind::new(oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0), Value::Integer(0))]);

        shutdown.cancel();
        let closing = read_one(&mut master).await;
        assert!(matches!(closing.body, PduBody::Close { .. }));
        handle.await.unwrap().unwrap();
    }

    /// A producer that reports whatever named context it was dispatched
    /// with, so a test can observe whether `NON_DEFAULT_CONTEXT` actually
    /// reached the `MibProducer` instead of always reading as default.
    struct ContextEcho {
        oid: Oid,
    }

    impl MibProducer for ContextEcho {
        fn get<'a>(&'a self, ctx: &'a RequestContext, oid: &'a Oid) -> BoxFuture<'a, GetResult> {
            Box::pin(async move {
                if oid != &self.oid {
                    return GetResult::NoSuchObject;
                }
                match &ctx.context {
                    Some(bytes) => GetResult::Value(Value::OctetString(bytes.clone())),
                    None => GetResult::Value(Value::OctetString(bytes::Bytes::from_static(b"default"))),
                }
            })
        }

        fn get_next<'a>(&'a self, _ctx: &'a RequestContext, _oid: &'a Oid) -> BoxFuture<'a, GetNextResult> {
            Box::pin(async move { GetNextResult::EndOfMibView })
        }
    }

    #[tokio::test]
    async fn non_default_context_reaches_the_producer() {
        let echo_oid = oid!(1, 3, 6, 1, 4, 1, 99999, 3, 0);
        let mib = Arc::new(
            MibBuilder::new()
                .scalar(echo_oid.clone(), Arc::new(ContextEcho { oid: echo_oid.clone() }))
                .unwrap()
                .build(),
        );
        let (handle, mut master, shutdown) = spawn_session(mib);
        handshake(&mut master, 1).await;

        let body = PduBody::Get {
            ranges: vec![SearchRange::new(echo_oid.clone(), Oid::empty(), true)],
        };
        let bytes = encode_pdu(agent_flags(), 7, 1, 100, Some(b"vrf-red"), &body);
        master.write_all(&bytes).await.unwrap();

        let response = read_one(&mut master).await;
        let PduBody::Response(resp) = response.body else { panic!("expected Response") };
        assert_eq!(
            resp.varbinds,
            vec![VarBind::new(echo_oid, Value::OctetString(bytes::Bytes::from_static(b"vrf-red")))]
        );

        shutdown.cancel();
        let _ = read_one(&mut master).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn get_next_walks_subtree_in_order() {
        let mib = Arc::new(test_mib());
        let (handle, mut master, shutdown) = spawn_session(mib);
        handshake(&mut master, 2).await;

        write_one(
            &mut master,
            7,
            1,
            101,
            &PduBody::GetNext {
                ranges: vec![SearchRange::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2), Oid::empty(), false)],
            },
        )
        .await;
        let response = read_one(&mut master).await;
        let PduBody::Response(resp) = response.body else { panic!("expected Response") };
        assert_eq!(resp.varbinds, vec![VarBind::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 1), Value::Integer(10))]);

        shutdown.cancel();
        let _ = read_one(&mut master).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn get_next_with_include_on_registered_oid_returns_that_oid() {
        let mib = Arc::new(test_mib());
        let (handle, mut master, shutdown) = spawn_session(mib);
        handshake(&mut master, 2).await;

        write_one(
            &mut master,
            7,
            1,
            101,
            &PduBody::GetNext {
                ranges: vec![SearchRange::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 1), Oid::empty(), true)],
            },
        )
        .await;
        let response = read_one(&mut master).await;
        let PduBody::Response(resp) = response.body else { panic!("expected Response") };
        assert_eq!(resp.varbinds, vec![VarBind::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 1), Value::Integer(10))]);

        shutdown.cancel();
        let _ = read_one(&mut master).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn get_bulk_repeats_until_end_of_mib_view() {
        let mib = Arc::new(test_mib());
        let (handle, mut master, shutdown) = spawn_session(mib);
        handshake(&mut master, 2).await;

        write_one(
            &mut master,
            7,
            1,
            102,
            &PduBody::GetBulk {
                non_repeaters: 0,
                max_repetitions: 4,
                ranges: vec![SearchRange::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2), Oid::empty(), false)],
            },
        )
        .await;
        let response = read_one(&mut master).await;
        let PduBody::Response(resp) = response.body else { panic!("expected Response") };
        assert_eq!(
            resp.varbinds,
            vec![
                VarBind::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 1), Value::Integer(10)),
                VarBind::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 2), Value::Integer(20)),
                VarBind::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 3), Value::Integer(30)),
                VarBind::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 3), Value::EndOfMibView),
            ]
        );

        shutdown.cancel();
        let _ = read_one(&mut master).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn get_bulk_with_include_does_not_repeat_the_starting_row() {
        let mib = Arc::new(test_mib());
        let (handle, mut master, shutdown) = spawn_session(mib);
        handshake(&mut master, 2).await;

        write_one(
            &mut master,
            7,
            1,
            103,
            &PduBody::GetBulk {
                non_repeaters: 0,
                max_repetitions: 2,
                ranges: vec![SearchRange::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 1), Oid::empty(), true)],
            },
        )
        .await;
        let response = read_one(&mut master).await;
        let PduBody::Response(resp) = response.body else { panic!("expected Response") };
        assert_eq!(
            resp.varbinds,
            vec![
                VarBind::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 1), Value::Integer(10)),
                VarBind::new(oid!(1, 3, 6, 1, 4, 1, 99999, 2, 2), Value::Integer(20)),
            ]
        );

        shutdown.cancel();
        let _ = read_one(&mut master).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn four_phase_set_commits_a_value() {
        let mib = Arc::new(test_mib());
        let (handle, mut master, shutdown) = spawn_session(mib);
        handshake(&mut master, 2).await;

        let target = oid!(1, 3, 6, 1, 4, 1, 99999, 1, 0);
        write_one(
            &mut master,
            7,
            5,
            200,
            &PduBody::TestSet { varbinds: vec![VarBind::new(target.clone(), Value::Integer(42))] },
        )
        .await;
        let test_resp = read_one(&mut master).await;
        let PduBody::Response(resp) = test_resp.body else { panic!("expected Response") };
        assert_eq!(resp.error, 0);

        write_one(&mut master, 7, 5, 201, &PduBody::CommitSet).await;
        let commit_resp = read_one(&mut master).await;
        let PduBody::Response(resp) = commit_resp.body else { panic!("expected Response") };
        assert_eq!(resp.error, 0);

        write_one(&mut master, 7, 5, 202, &PduBody::CleanupSet).await;
        let cleanup_resp = read_one(&mut master).await;
        assert!(matches!(cleanup_resp.body, PduBody::Response(_)));

        write_one(
            &mut master,
            7,
            1,
            203,
            &PduBody::Get { ranges: vec![SearchRange::new(target, Oid::empty(), true)] },
        )
        .await;
        let get_resp = read_one(&mut master).await;
        let PduBody::Response(resp) = get_resp.body else { panic!("expected Response") };
        assert_eq!(resp.varbinds[0].value, Value::Integer(42));

        shutdown.cancel();
        let _ = read_one(&mut master).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn ping_is_acknowledged_with_empty_response() {
        let mib = Arc::new(test_mib());
        let (handle, mut master, shutdown) = spawn_session(mib);
        handshake(&mut master, 2).await;

        write_one(&mut master, 7, 0, 300, &PduBody::Ping).await;
        let response = read_one(&mut master).await;
        let PduBody::Response(resp) = response.body else { panic!("expected Response") };
        assert_eq!(resp.error, 0);
        assert!(resp.varbinds.is_empty());

        shutdown.cancel();
        let _ = read_one(&mut master).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn master_close_ends_the_connection_cleanly() {
        let mib = Arc::new(test_mib());
        let (handle, mut master, _shutdown) = spawn_session(mib);
        handshake(&mut master, 2).await;

        write_one(&mut master, 7, 0, 400, &PduBody::Close { reason: 6 }).await;
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn open_rejected_by_master_is_an_error() {
        let mib = Arc::new(test_mib());
        let (handle, mut master, _shutdown) = spawn_session(mib);

        let open = read_one(&mut master).await;
        assert!(matches!(open.body, PduBody::Open(_)));
        write_one(
            &mut master,
            0,
            0,
            open.header.packet_id,
            &PduBody::Response(ResponsePayload {
                sys_up_time: 0,
                error: 5,
                error_index: 0,
                varbinds: Vec::new(),
            }),
        )
        .await;

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(Error::MasterClosed { code: 5 })));
    }
}
