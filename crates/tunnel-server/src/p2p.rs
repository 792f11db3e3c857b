//! P2P rendezvous: a single KCP listener accepts both proxies and
//! registered-client `Worker` dial-backs, classifying each by
//! RSA-decrypting its first metadata line (there is no session key yet
//! to pick an AES key by). Once one of each is available, `p2p_tunnel`
//! hands both sides a fresh session key, an FSM name, and the peer's
//! public UDP endpoint, each encrypted with that side's own advertised
//! `SecretKey`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use rsa::RsaPrivateKey;
use tokio::sync::Mutex;
use tunnel_control::{ControlMsgSender, PendingPeer, RequestChan, RequestChanRx, WorkerChan, WorkerChanRx};
use tunnel_crypto::{aes_encrypt_b64, rsa_decrypt_b64};
use tunnel_fsm::{fsm_for_proxy, fsm_for_tunnel, FsmName};
use tunnel_proto::metadata::keys;
use tunnel_proto::{ControlCode, Metadata, ProxyHello, Rendezvous, WorkerHello};
use tunnel_transport::{BoxedListener, BoxedSocket, Listener, Socket};

use crate::error::ServerError;

const POST_RENDEZVOUS_DELAY: Duration = Duration::from_secs(1);

/// Accept loop for the shared P2P tunnel listener: read and RSA-decrypt
/// each new connection's first line, then route it to `RequestChan` (a
/// `Proxy`, which also wakes the registered client with `CreateTunnel`)
/// or `WorkerChan` (the client's own dial-back).
pub async fn run_tunnel_listener(
    tunnel_listener: Arc<Mutex<BoxedListener>>,
    request_tx: RequestChan<ProxyHello>,
    worker_tx: WorkerChan<WorkerHello>,
    control_tx: ControlMsgSender,
    private_key: RsaPrivateKey,
) -> Result<(), ServerError> {
    loop {
        let socket = tunnel_listener.lock().await.accept().await?;
        let request_tx = request_tx.clone();
        let worker_tx = worker_tx.clone();
        let control_tx = control_tx.clone();
        let private_key = private_key.clone();
        tokio::spawn(async move {
            if let Err(e) = classify_and_dispatch(socket, request_tx, worker_tx, control_tx, private_key).await {
                tracing::warn!(error = %e, "p2p tunnel listener: classification failed");
            }
        });
    }
}

async fn classify_and_dispatch(
    mut socket: BoxedSocket,
    request_tx: RequestChan<ProxyHello>,
    worker_tx: WorkerChan<WorkerHello>,
    control_tx: ControlMsgSender,
    private_key: RsaPrivateKey,
) -> Result<(), ServerError> {
    let line = socket.read_line().await?;
    let plaintext = rsa_decrypt_b64(&private_key, &line)?;
    let meta = Metadata::from_json(std::str::from_utf8(&plaintext)?)?;

    match meta.get_str(keys::TYPE)? {
        "Proxy" => {
            let hello = ProxyHello::from_metadata(&meta)?;
            if request_tx.send(PendingPeer { socket, metadata: hello }).await.is_err() {
                return Ok(());
            }
            let _ = control_tx.send(ControlCode::CreateTunnel).await;
        }
        "Worker" => {
            let hello = WorkerHello::from_metadata(&meta)?;
            let _ = worker_tx.send(PendingPeer { socket, metadata: hello }).await;
        }
        other => {
            tracing::warn!(kind = other, "unknown P2P participant type");
        }
    }
    Ok(())
}

/// Pop one proxy and one worker at a time and run the rendezvous
/// between them.
pub async fn run_pairing(
    mut request_rx: RequestChanRx<ProxyHello>,
    mut worker_rx: WorkerChanRx<WorkerHello>,
    tunnel_encrypt: bool,
) -> Result<(), ServerError> {
    loop {
        let Some(proxy) = request_rx.recv().await else {
            return Ok(());
        };
        let Some(worker) = worker_rx.recv().await else {
            return Ok(());
        };
        if let Err(e) = p2p_tunnel(proxy, worker, tunnel_encrypt).await {
            tracing::warn!(error = %e, "p2p rendezvous failed");
        }
    }
}

async fn p2p_tunnel(
    mut proxy: PendingPeer<ProxyHello>,
    mut worker: PendingPeer<WorkerHello>,
    tunnel_encrypt: bool,
) -> Result<(), ServerError> {
    let worker_secret = parse_secret_key(&worker.metadata.secret_key)?;
    let proxy_secret = parse_secret_key(&proxy.metadata.secret_key)?;

    let pairing = nat_index(proxy.metadata.nat_type).and_then(|proxy_code| {
        let tunnel_code = nat_index(worker.metadata.nat_type)?;
        let fsm_for_tunnel_side = fsm_for_tunnel(proxy_code, tunnel_code);
        let fsm_for_proxy_side = fsm_for_proxy(proxy_code, tunnel_code);
        if fsm_for_tunnel_side == FsmName::Unsupported || fsm_for_proxy_side == FsmName::Unsupported {
            Err(ServerError::IncompatibleNatPair)
        } else {
            Ok((fsm_for_tunnel_side, fsm_for_proxy_side))
        }
    });

    let (fsm_for_tunnel_side, fsm_for_proxy_side) = match pairing {
        Ok(pair) => pair,
        Err(_) => {
            let failure = Rendezvous::failure(Rendezvous::STATUS_INCOMPATIBLE_NAT);
            let worker_line = aes_encrypt_b64(&worker_secret, failure.to_metadata().to_json()?.as_bytes())?;
            let proxy_line = aes_encrypt_b64(&proxy_secret, failure.to_metadata().to_json()?.as_bytes())?;
            let _ = worker.socket.write_line(&worker_line).await;
            let _ = proxy.socket.write_line(&proxy_line).await;
            let _ = worker.socket.close().await;
            let _ = proxy.socket.close().await;
            return Err(ServerError::IncompatibleNatPair);
        }
    };

    let mut session_key = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut session_key);

    let (proxy_addr, proxy_port, proxy_network) = resolve_peer_addr(
        proxy.metadata.addr.as_deref(),
        proxy.metadata.port,
        proxy.metadata.network.as_deref(),
        proxy.socket.remote_addr(),
    );
    let (worker_addr, worker_port, worker_network) = resolve_peer_addr(
        worker.metadata.addr.as_deref(),
        worker.metadata.port,
        worker.metadata.network.as_deref(),
        worker.socket.remote_addr(),
    );

    let rendezvous_for_worker = Rendezvous {
        status: Rendezvous::STATUS_OK,
        raddr: proxy_addr,
        rport: proxy_port,
        rnetwork: proxy_network,
        fsm_type: fsm_for_tunnel_side.to_string(),
        secret_key: hex::encode(session_key),
        tunnel_encrypt,
    };
    let worker_line = aes_encrypt_b64(&worker_secret, rendezvous_for_worker.to_metadata().to_json()?.as_bytes())?;
    worker.socket.write_line(&worker_line).await?;

    let rendezvous_for_proxy = Rendezvous {
        status: Rendezvous::STATUS_OK,
        raddr: worker_addr,
        rport: worker_port,
        rnetwork: worker_network,
        fsm_type: fsm_for_proxy_side.to_string(),
        secret_key: hex::encode(session_key),
        tunnel_encrypt,
    };
    let proxy_line = aes_encrypt_b64(&proxy_secret, rendezvous_for_proxy.to_metadata().to_json()?.as_bytes())?;
    proxy.socket.write_line(&proxy_line).await?;

    // Give both clients time to tear down their control/tunnel sockets
    // before they rebind the same UDP port for the hole-punching FSM.
    tokio::time::sleep(POST_RENDEZVOUS_DELAY).await;
    let _ = worker.socket.close().await;
    let _ = proxy.socket.close().await;
    Ok(())
}

fn parse_secret_key(hex_str: &str) -> Result<[u8; 32], ServerError> {
    let bytes = hex::decode(hex_str).map_err(|e| ServerError::ConfigInvalid(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| ServerError::ConfigInvalid(format!("secret key has {} bytes, want 32", v.len())))
}

/// Map an advertised NAT type onto the `0..=8` composite code the
/// pairing matrices are indexed by. A directly-reachable peer behaves
/// like the most permissive classification (endpoint-independent
/// mapping and filtering): code `0`.
fn nat_index(nat_type: i64) -> Result<i32, ServerError> {
    let code = nat_type as i32;
    if code == tunnel_stun::types::NAT_TYPE_DIRECT {
        return Ok(0);
    }
    if tunnel_stun::types::decode_nat_code(code).is_some() {
        return Ok(code);
    }
    Err(ServerError::IncompatibleNatPair)
}

/// Use the peer's advertised `Addr`/`Port`/`Network` if present;
/// otherwise derive all three from the accepted socket's own remote
/// address, picking udp4/udp6 by whether the host contains `:`.
fn resolve_peer_addr(
    addr: Option<&str>,
    port: Option<u16>,
    network: Option<&str>,
    socket_remote: SocketAddr,
) -> (String, u16, String) {
    if let (Some(addr), Some(port)) = (addr, port) {
        let network = network
            .map(str::to_string)
            .unwrap_or_else(|| if addr.contains(':') { "udp6".to_string() } else { "udp4".to_string() });
        (addr.to_string(), port, network)
    } else {
        let network = if socket_remote.is_ipv6() { "udp6" } else { "udp4" };
        (socket_remote.ip().to_string(), socket_remote.port(), network.to_string())
    }
}
