//! Probe: throwaway connection that only identifies the router.

use serde::Serialize;

use crate::cli::GlobalOpts;
use crate::config::Target;
use crate::error::CliError;
use crate::output;

use super::util::Session;

#[derive(Debug, Serialize)]
struct ProbeReport {
    router: String,
    address: String,
    port: u16,
    hostname: String,
    os: String,
}

fn detail(report: &ProbeReport) -> String {
    format!(
        "Router:   {}\nAddress:  {}:{}\nHostname: {}\nOS:       {}",
        report.router, report.address, report.port, report.hostname, report.os
    )
}

pub async fn handle(target: &Target, global: &GlobalOpts) -> Result<(), CliError> {
    let session = Session::start(target, global);
    let result = session.connect(&target.router, true).await;
    session.close().await;
    let result = result?;

    let report = ProbeReport {
        router: target.router.display_name().to_owned(),
        address: target.router.address.clone(),
        port: target.router.port,
        hostname: result.hostname,
        os: result.os,
    };
    let out = output::render_single(&global.output, &report, detail, |r| r.hostname.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
