//! SSH remote execution and SCP file collection
//!
//! One session per machine, reused for every action. All libssh2 calls
//! are blocking and run inside `spawn_blocking`; the dial and each file
//! transfer go through the shared retry policy before a failure
//! surfaces.

use crate::credentials::Credentials;
use crate::local::{relative_name, CommandOutput};
use crate::retry::RetryPolicy;
use ssh2::Session;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task;
use triage_errors::{CredentialError, Error, RemoteError};
use triage_script::Machine;

const DIAL_TIMEOUT: Duration = Duration::from_secs(10);
const SESSION_TIMEOUT_MS: u32 = 120_000;

/// An authenticated SSH session to one machine
pub struct RemoteExecutor {
    address: String,
    session: Arc<Mutex<Session>>,
}

impl std::fmt::Debug for RemoteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExecutor")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl RemoteExecutor {
    /// Dial and authenticate, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last [`RemoteError`] once the retry budget is
    /// exhausted, or a [`CredentialError`] when no private key is
    /// available.
    pub async fn connect(
        machine: &Machine,
        credentials: &Credentials,
        policy: &RetryPolicy,
    ) -> Result<Self, Error> {
        let address = machine.address();
        let Some(key) = credentials.private_key.clone() else {
            return Err(CredentialError::MissingPrivateKey {
                machine: address,
            }
            .into());
        };
        let username = credentials.username.clone();
        let policy = policy.clone();

        let dial_address = address.clone();
        let session = task::spawn_blocking(move || {
            policy
                .run_blocking(
                    |attempt| {
                        tracing::debug!(address = %dial_address, attempt, "dialing");
                        dial(&dial_address, &username, &key)
                    },
                    RemoteError::is_retryable,
                )
                .map_err(|(err, attempts)| {
                    tracing::error!(address = %dial_address, attempts, error = %err, "dial failed");
                    err
                })
        })
        .await
        .map_err(|e| Error::internal(format!("dial task: {e}")))??;

        Ok(Self {
            address,
            session: Arc::new(Mutex::new(session)),
        })
    }

    /// Execute one command over the session, capturing combined output.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::ExecFailed`] when the channel cannot be
    /// opened or read. A non-zero remote exit is not an error here.
    pub async fn exec(&self, command: String) -> Result<CommandOutput, Error> {
        let session = Arc::clone(&self.session);
        let address = self.address.clone();
        task::spawn_blocking(move || {
            let session = session.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            exec_blocking(&session, &address, &command)
        })
        .await
        .map_err(|e| Error::internal(format!("exec task: {e}")))?
    }

    /// Fetch a remote path (file, directory, or `*` pattern) under
    /// `dest_root`, preserving the remote layout.
    ///
    /// The path is expanded remotely with `find -type f`, then each file
    /// is pulled over SCP with retry. Returns the destinations written.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::TransferFailed`] when nothing matches or a
    /// file still fails after the retry budget.
    pub async fn fetch(
        &self,
        path: String,
        dest_root: PathBuf,
        policy: &RetryPolicy,
    ) -> Result<Vec<PathBuf>, Error> {
        let listing = self.exec(format!("find {path} -type f")).await?;
        let files: Vec<String> = listing
            .output
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with('/'))
            .map(ToString::to_string)
            .collect();
        if files.is_empty() {
            return Err(RemoteError::TransferFailed {
                path,
                address: self.address.clone(),
                attempts: 1,
                reason: "no files matched on the remote machine".to_string(),
            }
            .into());
        }

        let session = Arc::clone(&self.session);
        let address = self.address.clone();
        let policy = policy.clone();
        task::spawn_blocking(move || {
            let session = session.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let mut written = Vec::with_capacity(files.len());
            for file in files {
                let dest = dest_root.join(relative_name(Path::new(&file)));
                policy
                    .run_blocking(
                        |attempt| {
                            tracing::debug!(file = %file, attempt, "scp transfer");
                            scp_file(&session, &file, &dest)
                        },
                        |_| true,
                    )
                    .map_err(|(reason, attempts)| RemoteError::TransferFailed {
                        path: file.clone(),
                        address: address.clone(),
                        attempts,
                        reason,
                    })?;
                written.push(dest);
            }
            Ok(written)
        })
        .await
        .map_err(|e| Error::internal(format!("transfer task: {e}")))?
    }
}

fn dial(address: &str, username: &str, key: &Path) -> Result<Session, RemoteError> {
    let socket_addr = address
        .to_socket_addrs()
        .map_err(|e| RemoteError::DialFailed {
            address: address.to_string(),
            reason: format!("address resolution: {e}"),
        })?
        .next()
        .ok_or_else(|| RemoteError::DialFailed {
            address: address.to_string(),
            reason: "address resolved to nothing".to_string(),
        })?;

    let tcp = TcpStream::connect_timeout(&socket_addr, DIAL_TIMEOUT).map_err(|e| {
        RemoteError::DialFailed {
            address: address.to_string(),
            reason: e.to_string(),
        }
    })?;

    let mut session = Session::new().map_err(|e| RemoteError::HandshakeFailed {
        address: address.to_string(),
        reason: e.to_string(),
    })?;
    session.set_tcp_stream(tcp);
    session.handshake().map_err(|e| RemoteError::HandshakeFailed {
        address: address.to_string(),
        reason: e.to_string(),
    })?;

    session
        .userauth_pubkey_file(username, None, key, None)
        .map_err(|e| RemoteError::AuthFailed {
            username: username.to_string(),
            address: address.to_string(),
            reason: e.to_string(),
        })?;
    if !session.authenticated() {
        return Err(RemoteError::AuthFailed {
            username: username.to_string(),
            address: address.to_string(),
            reason: "authentication rejected".to_string(),
        });
    }

    session.set_timeout(SESSION_TIMEOUT_MS);
    Ok(session)
}

fn exec_blocking(
    session: &Session,
    address: &str,
    command: &str,
) -> Result<CommandOutput, Error> {
    let exec_failed = |reason: String| RemoteError::ExecFailed {
        address: address.to_string(),
        reason,
    };

    let mut channel = session
        .channel_session()
        .map_err(|e| exec_failed(e.to_string()))?;
    channel
        .exec(command)
        .map_err(|e| exec_failed(e.to_string()))?;

    let mut output = String::new();
    channel
        .read_to_string(&mut output)
        .map_err(|e| exec_failed(e.to_string()))?;
    let mut stderr = String::new();
    channel
        .stderr()
        .read_to_string(&mut stderr)
        .map_err(|e| exec_failed(e.to_string()))?;
    output.push_str(&stderr);

    channel
        .wait_close()
        .map_err(|e| exec_failed(e.to_string()))?;
    let exit_code = channel.exit_status().ok();

    Ok(CommandOutput { exit_code, output })
}

fn scp_file(session: &Session, remote: &str, dest: &Path) -> Result<(), String> {
    let (mut channel, stat) = session
        .scp_recv(Path::new(remote))
        .map_err(|e| e.to_string())?;

    #[allow(clippy::cast_possible_truncation)]
    let mut contents = Vec::with_capacity(stat.size() as usize);
    channel
        .read_to_end(&mut contents)
        .map_err(|e| e.to_string())?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    std::fs::write(dest, contents).map_err(|e| e.to_string())
}
