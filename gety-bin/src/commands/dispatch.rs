use anyhow::{Context, Result};
use gety_lib::report;

use super::CommandParams;
use crate::ExitCode;

/// Send one request per input line and print the results.
///
/// Reports go to stdout, failures and notices to stderr.
pub(crate) async fn dispatch(params: CommandParams) -> Result<ExitCode> {
    let CommandParams { runner, source } = params;

    let (sink, reporter) = report::spawn(
        tokio::io::stdout(),
        tokio::io::stderr(),
        report::DEFAULT_BUFFER,
    );

    let stats = runner.run(source, sink).await;
    // The sink is gone now, so the reporter finishes after writing the backlog
    let written = reporter.await.context("Output writer panicked")?;

    stats.context("Cannot read input")?;
    written.context("Cannot write output")?;

    Ok(ExitCode::Success)
}
