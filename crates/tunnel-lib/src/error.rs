use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibError {
    #[error(transparent)]
    Config(#[from] tunnel_config::ConfigError),
    #[error(transparent)]
    Crypto(#[from] tunnel_crypto::CryptoError),
    #[error(transparent)]
    Stun(#[from] tunnel_stun::StunClassifyError),
    #[error(transparent)]
    Client(#[from] tunnel_client::ClientError),
    #[error(transparent)]
    Server(#[from] tunnel_server::ServerError),
    #[error(transparent)]
    Proxy(#[from] tunnel_proxy::ProxyError),
    #[error("{0} is not specified in the config file")]
    MissingKeyFile(&'static str),
}
