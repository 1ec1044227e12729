/// Transfer launcher: runs the external sync tool and tracks its lifecycle
use crate::config::{OutputMode, Settings};
use crate::types::{Selection, TransferEvent, TransferRequest};
use log::{error, info, warn};
use std::ffi::OsString;
use std::io;
use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf, is_separator};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How long captured output may keep draining after the child exits
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors surfaced to the user; none of them are fatal
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("Please select both source and destination paths")]
    Validation,
    #[error("A transfer is already in progress")]
    Conflict,
    #[error("Failed to launch {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("Rsync failed: {status}")]
    ProcessFailure { code: Option<i32>, status: String },
    #[error("No active rsync process to stop")]
    NoActiveTransfer,
    #[error("Failed to stop rsync: {0}")]
    Signal(String),
}

impl TransferError {
    fn from_status(status: ExitStatus) -> Self {
        TransferError::ProcessFailure {
            code: status.code(),
            status: status.to_string(),
        }
    }
}

/// Reply slot for a kill request
type KillReply = oneshot::Sender<io::Result<()>>;

/// Handle to the running child, held only by the launcher state
struct TransferHandle {
    id: Uuid,
    kill_tx: mpsc::UnboundedSender<KillReply>,
}

#[derive(Default)]
struct TransferState {
    active: bool,
    handle: Option<TransferHandle>,
    selection: Selection,
}

type SharedState = Arc<Mutex<TransferState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, TransferState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Program plus fully built argument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCommand {
    pub program: String,
    pub args: Vec<OsString>,
}

impl TransferCommand {
    pub fn new(settings: &Settings, request: &TransferRequest) -> Self {
        Self {
            program: settings.program.clone(),
            args: build_args(&settings.flags, request),
        }
    }

    /// Human-readable command line for the log
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    fn to_command(&self, output: OutputMode) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null()).kill_on_drop(true);
        match output {
            OutputMode::Inherit => command.stdout(Stdio::inherit()).stderr(Stdio::inherit()),
            OutputMode::Capture => command.stdout(Stdio::piped()).stderr(Stdio::piped()),
        };
        command
    }
}

/// `<flags...> <source>/ <dest>`: the source separator makes the tool copy
/// the directory's contents instead of nesting the directory under `dest`
pub fn build_args(flags: &[String], request: &TransferRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = flags.iter().map(OsString::from).collect();
    args.push(with_trailing_separator(&request.source));
    args.push(request.dest.clone().into_os_string());
    args
}

fn with_trailing_separator(path: &Path) -> OsString {
    let mut arg = path.as_os_str().to_os_string();
    let has_separator = path
        .as_os_str()
        .to_string_lossy()
        .chars()
        .last()
        .is_some_and(is_separator);
    if !has_separator {
        arg.push(MAIN_SEPARATOR_STR);
    }
    arg
}

/// Map the child's kill result to what `stop` reports
fn kill_outcome(id: Uuid, killed: io::Result<()>) -> Result<(), TransferError> {
    match killed {
        Ok(()) => {
            info!("Rsync process {} stopped", id);
            Ok(())
        }
        // Child was reaped between the request and the kill
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => already_exited(id),
        Err(e) => {
            error!("Error: Failed to stop rsync: {}", e);
            Err(TransferError::Signal(e.to_string()))
        }
    }
}

fn already_exited(id: Uuid) -> Result<(), TransferError> {
    warn!("Rsync process {} had already exited", id);
    Err(TransferError::NoActiveTransfer)
}

/// Owns the transfer state and the runtime the background task runs on
pub struct TransferLauncher {
    settings: Settings,
    state: SharedState,
    events_tx: mpsc::UnboundedSender<TransferEvent>,
    runtime: Runtime,
}

impl TransferLauncher {
    pub fn new(
        settings: Settings,
        events_tx: mpsc::UnboundedSender<TransferEvent>,
    ) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("rsync-transfer")
            .enable_all()
            .build()?;

        Ok(Self {
            settings,
            state: Arc::new(Mutex::new(TransferState::default())),
            events_tx,
            runtime,
        })
    }

    pub fn select_source(&self, path: PathBuf) {
        info!("Selected source path: {}", path.display());
        lock(&self.state).selection.source = Some(path);
    }

    pub fn select_dest(&self, path: PathBuf) {
        info!("Selected destination path: {}", path.display());
        lock(&self.state).selection.dest = Some(path);
    }

    pub fn selection(&self) -> Selection {
        lock(&self.state).selection.clone()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    /// Start a transfer from the current selection
    pub fn start_selected(&self) -> Result<Uuid, TransferError> {
        let request = self.selection().to_request();
        self.start(request)
    }

    /// Claim the idle state and launch the tool on a background task.
    ///
    /// Validation and conflict errors are returned here; every accepted
    /// request later produces exactly one `TransferEvent::Finished`.
    pub fn start(&self, request: TransferRequest) -> Result<Uuid, TransferError> {
        if let Err(e) = request.validate() {
            error!("Error: Source or destination path not selected");
            return Err(e);
        }

        let id = Uuid::new_v4();
        let (kill_tx, kill_rx) = mpsc::unbounded_channel();
        {
            let mut state = lock(&self.state);
            if state.active {
                error!("Error: Transfer already in progress");
                return Err(TransferError::Conflict);
            }
            state.active = true;
            state.handle = Some(TransferHandle { id, kill_tx });
        }

        let command = TransferCommand::new(&self.settings, &request);
        info!("Starting rsync transfer {}", id);

        self.runtime.spawn(Self::transfer_task(
            id,
            command,
            self.settings.output,
            self.state.clone(),
            kill_rx,
            self.events_tx.clone(),
        ));

        Ok(id)
    }

    /// Ask the running child to terminate.
    ///
    /// Returns once the kill signal is delivered; the move back to idle is
    /// made by the transfer task when it observes the exit. Must be called
    /// from outside the launcher's runtime, e.g. the GUI thread.
    pub fn stop(&self) -> Result<(), TransferError> {
        let (id, kill_tx) = {
            let state = lock(&self.state);
            match (&state.handle, state.active) {
                (Some(handle), true) => (handle.id, handle.kill_tx.clone()),
                _ => {
                    warn!("Error: No active rsync process to stop");
                    return Err(TransferError::NoActiveTransfer);
                }
            }
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if kill_tx.send(reply_tx).is_err() {
            return already_exited(id);
        }

        match reply_rx.blocking_recv() {
            Ok(killed) => kill_outcome(id, killed),
            // Task finished without serving the request
            Err(_) => already_exited(id),
        }
    }

    async fn transfer_task(
        id: Uuid,
        command: TransferCommand,
        output: OutputMode,
        state: SharedState,
        kill_rx: mpsc::UnboundedReceiver<KillReply>,
        events_tx: mpsc::UnboundedSender<TransferEvent>,
    ) {
        // kill_rx is dropped when run() returns; pending stop requests then
        // see their reply sender dropped
        let (result, readers) = Self::run(id, &command, output, kill_rx, &events_tx).await;

        {
            let mut state = lock(&state);
            state.active = false;
            state.handle = None;
        }

        // Grandchildren may keep the pipes open past the child's exit; both
        // readers share one deadline
        let drained = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, async {
            for reader in readers {
                let _ = reader.await;
            }
        })
        .await;
        if drained.is_err() {
            warn!("Output of transfer {} still open after exit, not waiting for it", id);
        }

        match &result {
            Ok(()) => info!("Rsync completed successfully"),
            Err(e @ TransferError::ProcessFailure { code: Some(code), .. }) => {
                error!("Error: {} (exit code {})", e, code)
            }
            Err(e) => error!("Error: {}", e),
        }

        let _ = events_tx.send(TransferEvent::Finished { id, result });
    }

    /// Spawn the child and wait for it to exit or be killed; the output
    /// readers are handed back for the caller to drain
    async fn run(
        id: Uuid,
        command: &TransferCommand,
        output: OutputMode,
        mut kill_rx: mpsc::UnboundedReceiver<KillReply>,
        events_tx: &mpsc::UnboundedSender<TransferEvent>,
    ) -> (Result<(), TransferError>, Vec<JoinHandle<()>>) {
        info!("Executing command: {}", command.display());

        let mut child = match command.to_command(output).spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = TransferError::Spawn {
                    program: command.program.clone(),
                    reason: e.to_string(),
                };
                return (Err(err), Vec::new());
            }
        };

        let _ = events_tx.send(TransferEvent::Started {
            id,
            command: command.display(),
        });

        let readers = Self::forward_output(id, &mut child, events_tx);

        let status = tokio::select! {
            status = child.wait() => status,
            Some(reply) = kill_rx.recv() => {
                let _ = reply.send(child.start_kill());
                child.wait().await
            }
        };

        let result = match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(TransferError::from_status(status)),
            Err(e) => Err(TransferError::ProcessFailure {
                code: None,
                status: e.to_string(),
            }),
        };
        (result, readers)
    }

    fn forward_output(
        id: Uuid,
        child: &mut Child,
        events_tx: &mpsc::UnboundedSender<TransferEvent>,
    ) -> Vec<JoinHandle<()>> {
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(Self::read_lines(id, stdout, events_tx.clone(), false)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(Self::read_lines(id, stderr, events_tx.clone(), true)));
        }
        readers
    }

    async fn read_lines<R: AsyncRead + Unpin>(
        id: Uuid,
        stream: R,
        events_tx: mpsc::UnboundedSender<TransferEvent>,
        is_stderr: bool,
    ) {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if is_stderr {
                        eprintln!("{}", line);
                        warn!("rsync: {}", line);
                    } else {
                        println!("{}", line);
                        info!("rsync: {}", line);
                    }
                    let _ = events_tx.send(TransferEvent::Output { id, line });
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read rsync output: {}", e);
                    break;
                }
            }
        }
    }

    #[cfg(test)]
    fn has_handle(&self) -> bool {
        lock(&self.state).handle.is_some()
    }
}
