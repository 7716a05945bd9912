//! Console report - sectioned plain text with status tags
//!
//! Rendering is a pure function of the report so it can be tested without
//! a terminal. Colors are optional and never carry meaning on their own:
//! every status also has an [OK]/[WARN]/[CRIT] tag.

use owo_colors::OwoColorize;
use std::ffi::OsStr;
use std::io::IsTerminal;
use vigil_common::{FindingStatus, HealthReport, HostInfo, ReportSink, Verdict};

const SEPARATOR: &str = "------------------------------------------------------------";

/// Whether to color stdout: off with --no-color, NO_COLOR, or no tty
pub fn colors_enabled(no_color_flag: bool) -> bool {
    color_allowed(
        no_color_flag,
        std::env::var_os("NO_COLOR").as_deref(),
        std::io::stdout().is_terminal(),
    )
}

/// Same rules as `colors_enabled`, checked against stderr
pub fn stderr_colors_enabled() -> bool {
    color_allowed(
        false,
        std::env::var_os("NO_COLOR").as_deref(),
        std::io::stderr().is_terminal(),
    )
}

fn color_allowed(no_color_flag: bool, no_color_env: Option<&OsStr>, is_tty: bool) -> bool {
    !no_color_flag && no_color_env.map_or(true, |v| v.is_empty()) && is_tty
}

pub struct ConsoleSink {
    colored: bool,
}

impl ConsoleSink {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }
}

impl ReportSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn publish(&self, report: &HealthReport) -> anyhow::Result<()> {
        print!("{}", render(report, self.colored));
        Ok(())
    }
}

/// Print an error to stderr in the report's tag style
pub fn display_error(message: &str, colored: bool) {
    if colored {
        eprintln!("[ERROR] {}", message.red());
    } else {
        eprintln!("[ERROR] {}", message);
    }
}

fn status_tag(status: FindingStatus, colored: bool) -> String {
    let tag = match status {
        FindingStatus::Good => "[OK]  ",
        FindingStatus::Warning => "[WARN]",
        FindingStatus::Critical => "[CRIT]",
    };
    if !colored {
        return tag.to_string();
    }
    match status {
        FindingStatus::Good => tag.bright_green().to_string(),
        FindingStatus::Warning => tag.yellow().to_string(),
        FindingStatus::Critical => tag.bright_red().to_string(),
    }
}

fn heading(title: &str, colored: bool) -> String {
    let text = format!("[{}]", title);
    if colored {
        text.bold().to_string()
    } else {
        text
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB * KIB {
        format!("{:.1} GiB", b / (KIB * KIB * KIB))
    } else if b >= KIB * KIB {
        format!("{:.1} MiB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("unknown")
}

/// System information and network sections
pub fn render_host(host: &HostInfo, colored: bool) -> String {
    let mut out = String::new();
    out.push_str(&heading("SYSTEM INFORMATION", colored));
    out.push('\n');
    out.push_str(&format!("  Hostname:      {}\n", or_unknown(host.hostname.as_deref())));
    out.push_str(&format!(
        "  OS:            {} {}\n",
        or_unknown(host.os_name.as_deref()),
        host.os_version.as_deref().unwrap_or("")
    ));
    out.push_str(&format!("  Kernel:        {}\n", or_unknown(host.kernel_version.as_deref())));
    out.push_str(&format!("  Architecture:  {}\n", host.architecture));

    let mut cpu = format!("{} ({} cores", or_unknown(host.cpu_brand.as_deref()), host.cpu_cores);
    if let Some(mhz) = host.cpu_frequency_mhz {
        cpu.push_str(&format!(", {} MHz", mhz));
    }
    if let Some(max) = host.cpu_max_frequency_mhz {
        cpu.push_str(&format!(", max {} MHz", max));
    }
    cpu.push(')');
    out.push_str(&format!("  CPU:           {}\n", cpu));
    out.push_str(&format!(
        "  Memory:        {} (swap {})\n",
        format_bytes(host.total_memory_bytes),
        format_bytes(host.total_swap_bytes)
    ));
    out.push_str(&format!("  Uptime:        {}\n", format_uptime(host.uptime_secs)));
    out.push('\n');

    if !host.network.is_empty() {
        out.push_str(&heading("NETWORK", colored));
        out.push('\n');
        for iface in &host.network {
            out.push_str(&format!(
                "  {:<14} {:<18} rx {:<11} tx {}\n",
                iface.name,
                iface.mac_address.as_deref().unwrap_or("-"),
                format_bytes(iface.received_bytes),
                format_bytes(iface.transmitted_bytes)
            ));
        }
        out.push('\n');
    }
    out
}

/// Render the full report as plain text, optionally colored
pub fn render(report: &HealthReport, colored: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "VIGIL HEALTH REPORT  {}\n",
        report.timestamp().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(SEPARATOR);
    out.push_str("\n\n");

    if let Some(host) = report.host() {
        out.push_str(&render_host(host, colored));
    }

    out.push_str(&heading("READINGS", colored));
    out.push('\n');
    for reading in report.readings() {
        let label = reading.kind.label();
        if reading.available {
            out.push_str(&format!("  {:<28} {}\n", label, reading.display_value()));
        } else {
            let note = reading.detail.as_deref().unwrap_or("no reason given");
            let line = format!("  {:<28} unavailable ({})", label, note);
            if colored {
                out.push_str(&line.dimmed().to_string());
            } else {
                out.push_str(&line);
            }
            out.push('\n');
        }
    }
    out.push('\n');

    out.push_str(&heading("FINDINGS", colored));
    out.push('\n');
    for finding in report.findings() {
        out.push_str(&format!(
            "  {} {:<8} {}\n",
            status_tag(finding.status, colored),
            finding.category.to_string(),
            finding.message
        ));
    }
    out.push('\n');

    out.push_str(&heading("HEALTH SCORE", colored));
    out.push('\n');
    let score = match report.score() {
        Some(s) => format!("{}/100", s),
        None => "n/a".to_string(),
    };
    let verdict = report.verdict();
    let score = if colored {
        match verdict {
            Verdict::Good => score.bright_green().to_string(),
            Verdict::NeedsAttention => score.yellow().to_string(),
            Verdict::Poor => score.bright_red().to_string(),
            Verdict::Indeterminate => score.dimmed().to_string(),
        }
    } else {
        score
    };
    out.push_str(&format!("  Score:     {}\n", score));
    out.push_str(&format!(
        "  Metrics:   {} of {} contributed\n",
        report.contributing_count(),
        report.metrics().len()
    ));
    out.push_str(&format!("  Verdict:   {}\n", verdict.message()));
    out.push_str(SEPARATOR);
    out.push('\n');
    out
}
