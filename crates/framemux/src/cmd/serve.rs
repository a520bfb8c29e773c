use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use framemux_dispatch::{handler_fn, DispatchError, Dispatcher, LoopStatus, Outcome};
use framemux_transport::{ByteStream, StreamConfig, StreamTransport, TransportError, UnixDomainSocket};

use crate::cmd::ServeArgs;
use crate::exit::{dispatch_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_stats, OutputFormat};
use crate::FRAME_LEN;

type PeerTransport = StreamTransport<ByteStream, FRAME_LEN>;
type ServeDispatcher = Dispatcher<Option<PeerTransport>, FRAME_LEN>;

const IDLE_WAIT: Duration = Duration::from_millis(100);
const FRAME_TAIL_TIMEOUT: Duration = Duration::from_secs(5);

enum PeerEnd {
    Disconnected,
    Stopped,
    CountReached,
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut dispatcher = build_dispatcher(&args)?;

    let socket =
        UnixDomainSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;
    tracing::info!(path = %socket.path().display(), "serving");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let stream_config = StreamConfig {
        read_timeout: Some(FRAME_TAIL_TIMEOUT),
        write_timeout: Some(FRAME_TAIL_TIMEOUT),
    };
    let mut peers = 0usize;
    let mut dispatched = 0u64;

    while running.load(Ordering::SeqCst) {
        let stream = socket
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        match stream.peer_credentials() {
            Some((uid, _gid, pid)) => tracing::info!(pid, uid, "peer connected"),
            None => tracing::info!("peer connected"),
        }
        let transport = StreamTransport::with_config(stream, &stream_config)
            .map_err(|err| transport_error("socket setup failed", err))?;
        peers += 1;

        // Each peer starts its sequences at 0.
        dispatcher.replace_transport(Some(transport));
        let end = serve_peer(&mut dispatcher, &running, args.count, &mut dispatched)?;
        dispatcher.replace_transport(None);

        match end {
            PeerEnd::Disconnected => tracing::info!("peer disconnected"),
            PeerEnd::Stopped | PeerEnd::CountReached => break,
        }
    }

    print_stats(&dispatcher.stats(), peers, format);
    Ok(SUCCESS)
}

/// Detached dispatcher with one echo handler per requested identifier.
///
/// Echo handlers go through the ensured queue so that a collision (including
/// with session control) is reported before the socket is bound.
fn build_dispatcher(args: &ServeArgs) -> CliResult<ServeDispatcher> {
    let mut dispatcher = Dispatcher::new(None);
    let echoes = args
        .echo
        .iter()
        .map(|&id| (id, false))
        .chain(args.reliable_echo.iter().map(|&id| (id, true)));
    for (id, reliable) in echoes {
        dispatcher.enqueue_ensured(move || {
            handler_fn(id, reliable, |_payload: &mut [u8]| Ok(Outcome::Normal))
        });
    }
    dispatcher
        .drain_ensured()
        .map_err(|err| dispatch_error("handler registration failed", err))?;
    tracing::info!(ids = ?dispatcher.list_ids(), "echo handlers registered");
    Ok(dispatcher)
}

fn serve_peer(
    dispatcher: &mut ServeDispatcher,
    running: &AtomicBool,
    count: Option<u64>,
    dispatched: &mut u64,
) -> CliResult<PeerEnd> {
    loop {
        if !running.load(Ordering::SeqCst) {
            return Ok(PeerEnd::Stopped);
        }
        if count.is_some_and(|limit| *dispatched >= limit) {
            return Ok(PeerEnd::CountReached);
        }

        let Some(link) = dispatcher.transport_mut().as_mut() else {
            return Ok(PeerEnd::Disconnected);
        };
        match link.wait_for_frame(IDLE_WAIT) {
            Ok(_) => {}
            Err(TransportError::Closed) => return Ok(PeerEnd::Disconnected),
            Err(err) => return Err(transport_error("receive failed", err)),
        }

        match dispatcher.poll_once() {
            Ok(LoopStatus::Idle) => {}
            Ok(LoopStatus::Delivered { id, delivery }) => {
                *dispatched += 1;
                tracing::info!(id, ?delivery, "frame echoed");
            }
            // Already answered with a zeroed reply; keep serving.
            Err(DispatchError::UnknownIdentifier(_)) => *dispatched += 1,
            Err(DispatchError::Transport(TransportError::Closed)) => {
                return Ok(PeerEnd::Disconnected)
            }
            Err(DispatchError::Transport(err)) if is_peer_gone(&err) => {
                return Ok(PeerEnd::Disconnected)
            }
            Err(err) => tracing::warn!(error = %err, "dispatch failed"),
        }
    }
}

fn is_peer_gone(err: &TransportError) -> bool {
    match err {
        TransportError::Io(source) => matches!(
            source.kind(),
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset
        ),
        _ => false,
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
