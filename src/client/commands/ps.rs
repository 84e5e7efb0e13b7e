use crate::client::request;
use anyhow::Result;
use std::io::Write;
use tabwriter::TabWriter;

pub fn ps_cmd(base_url: &str) -> Result<()> {
    let statuses = request::status_all(base_url)?;

    let mut tw = TabWriter::new(std::io::stdout());
    writeln!(
        tw,
        "NAME\tSTATE\tPID\tUPTIME\tFAILURES\tCPU%\tKIND\tENABLED"
    )?;
    for s in statuses {
        let uptime = s
            .uptime_s
            .map(format_duration)
            .unwrap_or_else(|| "-".to_string());
        let pid = s.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        let cpu = s
            .cpu_samples
            .last()
            .map(|c| format!("{:.1}", c))
            .unwrap_or_else(|| "-".to_string());
        let state = format!("{:?}", s.state).to_lowercase();
        let kind = format!("{:?}", s.kind).to_lowercase();

        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            s.name, state, pid, uptime, s.consecutive_failures, cpu, kind, s.enabled
        )?;
    }
    tw.flush()?;
    Ok(())
}

fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{}h{}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
