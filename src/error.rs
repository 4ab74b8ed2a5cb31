use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to connect to the {store}: {source:#}")]
    Connection {
        store: &'static str,
        source: anyhow::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
