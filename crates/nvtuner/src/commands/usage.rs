//! Usage: NVRAM capacity figures from the dump's size line.

use bytesize::ByteSize;
use serde::Serialize;

use nvtuner_core::Nvram;

use crate::cli::GlobalOpts;
use crate::config::Target;
use crate::error::CliError;
use crate::output;

use super::util::{self, Session};

#[derive(Debug, Serialize)]
struct UsageReport {
    total_bytes: u64,
    used_bytes: u64,
    remaining_bytes: u64,
    variable_count: usize,
    variable_bytes: u64,
    retrieved_at: String,
}

impl From<&Nvram> for UsageReport {
    fn from(nvram: &Nvram) -> Self {
        let usage = nvram.usage();
        Self {
            total_bytes: usage.total_bytes,
            used_bytes: usage.used_bytes(),
            remaining_bytes: usage.remaining_bytes,
            variable_count: nvram.len(),
            variable_bytes: nvram.variable_size_bytes(),
            retrieved_at: nvram.retrieved_at().to_rfc3339(),
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

fn detail(report: &UsageReport) -> String {
    format!(
        "Total:     {}\nUsed:      {} ({:.1}%)\nFree:      {}\nVariables: {} ({} of name=value data)",
        ByteSize::b(report.total_bytes),
        ByteSize::b(report.used_bytes),
        percent(report.used_bytes, report.total_bytes),
        ByteSize::b(report.remaining_bytes),
        report.variable_count,
        ByteSize::b(report.variable_bytes),
    )
}

pub async fn handle(target: &Target, global: &GlobalOpts) -> Result<(), CliError> {
    let session = Session::open(target, global).await?;
    let loaded = util::load_variables(&session, target).await;
    session.close().await;
    let nvram = loaded?;

    let report = UsageReport::from(nvram.as_ref());
    let out = output::render_single(&global.output, &report, detail, |r| {
        format!("{} {} {}", r.used_bytes, r.remaining_bytes, r.total_bytes)
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
