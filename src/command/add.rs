use anyhow::{Context, Result};

use super::GlobalOptions;
use crate::capture::{HttpCapture, HttpService, ScanFinding};
use crate::cli::{read_payload, CaptureArgs};

pub fn run_add_capture(options: &GlobalOptions, args: CaptureArgs) -> Result<()> {
    let bridge = options.open_active()?;

    let request = read_payload(&args.request)?;
    let response = match &args.response {
        Some(path) => read_payload(path)?,
        None => Vec::new(),
    };
    let capture = HttpCapture {
        service: HttpService {
            host: args.host,
            port: args.port,
            protocol: args.protocol,
        },
        url: args.url,
        request,
        response,
    };

    let record = capture.into_record(&bridge.provenance()?);
    let fingerprint = bridge.add_record(record).context("Failed to store capture")?;

    println!("✅ Stored capture {}", fingerprint);
    println!("   Run 'git-bridge push' to share it.");
    Ok(())
}

pub fn run_add_finding(options: &GlobalOptions, file: &str) -> Result<()> {
    let bridge = options.open_active()?;

    let payload = read_payload(file)?;
    let finding: ScanFinding =
        serde_json::from_slice(&payload).with_context(|| format!("Invalid finding JSON in {}", file))?;
    let messages = finding.messages.len();

    let record = finding.into_record(&bridge.provenance()?);
    let fingerprint = bridge.add_record(record).context("Failed to store finding")?;

    println!("✅ Stored finding {} with {} message(s)", fingerprint, messages);
    println!("   Run 'git-bridge push' to share it.");
    Ok(())
}
