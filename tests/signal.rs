//! Signal forwarding through the installed handler. Kept to one test since
//! the handler can only be installed once per process.

use std::{
    os::unix::process::ExitStatusExt,
    process::Command,
    thread,
    time::{Duration, Instant},
};

use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use usrpse_wrapper::{error::SupervisorError, supervisor::Supervisor};

#[test]
fn test_sigterm_reaches_child_as_sigint() {
    let sup = Supervisor::new();
    sup.install_signal_handler().unwrap();

    let runner = sup.clone();
    let handle = thread::spawn(move || {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        runner.run::<_, SupervisorError>(cmd, |_| Ok(()))
    });
    let deadline = Instant::now() + Duration::from_secs(10);
    while sup.pid().is_none() {
        assert!(Instant::now() < deadline, "child never started");
        thread::sleep(Duration::from_millis(10));
    }

    kill(Pid::this(), Signal::SIGTERM).unwrap();
    let status = handle.join().unwrap().unwrap();
    assert_eq!(Some(Signal::SIGINT as i32), status.signal());
    assert_eq!(1, sup.forwarded());
    assert_eq!(None, sup.pid());
}
