//! Running the sensing binary
//!
//! The binary is started on a pseudo-terminal so its C stdio stays line
//! buffered, and in its own process group so a Ctrl-C on our terminal reaches
//! it only through us. Interrupts, terminates and hangups delivered to this
//! process are forwarded to the child as a single SIGINT each; the child is
//! expected to shut itself down and close its output, which ends the read loop.
//! A signal that lands before the child exists is held and delivered as soon
//! as it has been spawned.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    os::unix::process::CommandExt,
    process::{Command, ExitStatus, Stdio},
    sync::{
        atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering},
        Arc,
    },
};

use nix::{
    errno::Errno,
    pty::{openpty, OpenptyResult},
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use tracing::{debug, info, warn};

use crate::error::SupervisorError;

/// Kernel socket buffer limits the USRP streaming needs
const BUFFER_SYSCTLS: [&str; 2] = ["net.core.wmem_max=1048576", "net.core.rmem_max=50000000"];

/// Raise the kernel network buffer limits. Best effort, failures are only logged.
pub fn tune_buffers() {
    info!("Configuring system buffer sizes");
    for setting in BUFFER_SYSCTLS {
        match Command::new("sudo")
            .args(["-n", "sysctl", "-w", setting])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => debug!(setting, "sysctl applied"),
            Ok(status) => debug!(setting, %status, "sysctl failed"),
            Err(e) => debug!(setting, "could not run sysctl: {e}"),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    /// 0 while no child is running
    pid: AtomicI32,
    /// Set by an interrupt, cleared once it reached a child
    pending: AtomicBool,
    forwarded: AtomicUsize,
}

/// Process-wide handle on the running child, shared with the signal handler
#[derive(Clone, Debug, Default)]
pub struct Supervisor {
    shared: Arc<Shared>,
}

/// Clears the pid when the run loop exits, however it exits
struct Attached<'a>(&'a Shared);

impl Drop for Attached<'_> {
    fn drop(&mut self) {
        self.0.pid.store(0, Ordering::SeqCst);
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward SIGINT, SIGTERM and SIGHUP to the child. Can only be installed once per process.
    pub fn install_signal_handler(&self) -> Result<(), SupervisorError> {
        let supervisor = self.clone();
        ctrlc::set_handler(move || {
            info!("Terminating on signal, interrupting the sensing engine");
            if let Err(e) = supervisor.interrupt() {
                warn!("{e}");
            }
        })?;
        Ok(())
    }

    /// Pid of the running child, if any
    pub fn pid(&self) -> Option<i32> {
        match self.shared.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// How many interrupts have been delivered to children so far
    pub fn forwarded(&self) -> usize {
        self.shared.forwarded.load(Ordering::SeqCst)
    }

    /// Send one SIGINT to the child. Returns false if nothing is running yet,
    /// in which case the next child gets it right after it is spawned.
    pub fn interrupt(&self) -> Result<bool, SupervisorError> {
        self.shared.pending.store(true, Ordering::SeqCst);
        self.deliver_pending()
    }

    fn deliver_pending(&self) -> Result<bool, SupervisorError> {
        let Some(pid) = self.pid() else {
            return Ok(false);
        };
        // Only one of the handler and the run loop may claim it
        if !self.shared.pending.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        kill(Pid::from_raw(pid), Signal::SIGINT)
            .map_err(|source| SupervisorError::Signal { pid, source })?;
        self.shared.forwarded.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn attach(&self, pid: u32) -> Attached<'_> {
        self.shared.pid.store(pid as i32, Ordering::SeqCst);
        Attached(&self.shared)
    }

    /// Spawn `cmd` on a fresh pty, returning the child and the master side
    fn spawn(cmd: &mut Command) -> Result<(std::process::Child, File), SupervisorError> {
        let OpenptyResult { master, slave } = openpty(None, None).map_err(SupervisorError::Pty)?;
        cmd.stdin(Stdio::from(slave.try_clone()?))
            .stdout(Stdio::from(slave.try_clone()?))
            .stderr(Stdio::from(slave));
        cmd.process_group(0);
        let child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            program: cmd.get_program().to_string_lossy().into_owned(),
            source,
        })?;
        Ok((child, File::from(master)))
    }

    /// Run `cmd` to completion, echoing every output line to stdout and handing
    /// it to `on_line`. Blocks until the child closes its output.
    pub fn run<F, E>(&self, mut cmd: Command, mut on_line: F) -> Result<ExitStatus, E>
    where
        F: FnMut(&str) -> Result<(), E>,
        E: From<SupervisorError>,
    {
        let (mut child, master) = Self::spawn(&mut cmd)?;
        // Our copies of the slave fd live in `cmd`, drop them or we never see EOF
        drop(cmd);
        let _attached = self.attach(child.id());
        info!(pid = child.id(), "Sensing engine started");
        if self.deliver_pending()? {
            info!("Interrupt arrived during startup, forwarded");
        }

        let mut reader = BufReader::new(master);
        let mut buf = Vec::new();
        let stdout = io::stdout();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                // Linux reports a hung up pty as EIO rather than EOF
                Err(e) if e.raw_os_error() == Some(Errno::EIO as i32) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SupervisorError::Io(e).into()),
            }
            {
                let mut out = stdout.lock();
                out.write_all(&buf)
                    .and_then(|_| out.flush())
                    .map_err(SupervisorError::Io)?;
            }
            on_line(&String::from_utf8_lossy(&buf))?;
        }

        let status = child.wait().map_err(SupervisorError::Io)?;
        info!(%status, "Sensing engine exited");
        Ok(status)
    }
}
