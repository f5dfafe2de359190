use std::path::Path;

use clap::Parser;
use tracing::{debug, error, info};
use usrpse_wrapper::{
    args::{convert_filter, Args},
    command::Invocation,
    device::resolve_device_addr,
    error::Error,
    output::{Output, OutputMode},
    supervisor::{tune_buffers, Supervisor},
    telemetry::{CollectUri, OmlSink, Reporter, SessionId},
};

fn run(args: Args) -> Result<(), Error> {
    let config = args.radio_config()?;
    debug!(?config, "Derived radio configuration");
    let output_mode = args.output_mode()?;
    let device_addr = resolve_device_addr(args.args.as_deref())?;
    let invocation = Invocation::build(&config, &device_addr, &args.bin_dir);

    // Everything that can fail on bad input is settled before the child exists
    let mut output: Output = match output_mode {
        OutputMode::Stdout => Output::Stdout,
        OutputMode::File => Output::create_file(Path::new("."))?,
        OutputMode::Oml => {
            let session = SessionId::new(args.expid.as_deref())?;
            let uri: CollectUri = args.oml_collect.parse()?;
            let sink = OmlSink::connect(&uri, session)?;
            Output::Oml(Reporter::new(&config, sink)?)
        }
    };

    info!(output = %output_mode, "Starting the usrpse wrapper: {invocation}");
    if !args.no_tune {
        tune_buffers();
    }

    let supervisor = Supervisor::new();
    supervisor.install_signal_handler()?;
    let status = supervisor.run(invocation.command(), |line| output.handle_line(line))?;
    debug!(%status, forwarded = supervisor.forwarded(), "Run complete");
    output.finish()
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(convert_filter(args.verbose.log_level_filter()))
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = run(args) {
        error!("{e}");
        std::process::exit(1);
    }
}
