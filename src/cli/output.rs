//! Human and JSON rendering of command results

use std::io::IsTerminal;
use colored::{ColoredString, Colorize};
use serde_json::{json, Value};

use crate::backend::BackendUpdateState;
use crate::extension::{ActivationReport, ExtensionDescriptor, LifecycleReport};

/// Colour switch for terminal output, honouring `NO_COLOR`
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(no_color_flag: bool) -> Self {
        let enabled = !no_color_flag
            && std::env::var_os("NO_COLOR").is_none()
            && std::io::stdout().is_terminal();
        Self { enabled }
    }

    pub fn plain() -> Self {
        Self { enabled: false }
    }

    fn paint(&self, text: &str, f: fn(&str) -> ColoredString) -> String {
        if self.enabled {
            f(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn success(&self, text: &str) -> String {
        self.paint(text, |t| t.green())
    }

    pub fn warning(&self, text: &str) -> String {
        self.paint(text, |t| t.yellow())
    }

    pub fn error(&self, text: &str) -> String {
        self.paint(text, |t| t.red().bold())
    }

    pub fn highlight(&self, text: &str) -> String {
        self.paint(text, |t| t.cyan().bold())
    }
}

fn descriptor_label(descriptor: &ExtensionDescriptor) -> String {
    match (descriptor.product_name(), descriptor.version()) {
        (Some(product), Some(version)) => format!("{} {}", product, version),
        (Some(product), None) => product.to_string(),
        (None, Some(version)) => version.to_string(),
        (None, None) => String::new(),
    }
}

pub fn format_descriptors(descriptors: &[ExtensionDescriptor], palette: Palette) -> String {
    if descriptors.is_empty() {
        return palette.warning("No active extensions");
    }
    descriptors
        .iter()
        .map(|descriptor| {
            let label = descriptor_label(descriptor);
            let mut line = palette.highlight(descriptor.registration_name());
            if !label.is_empty() {
                line.push_str(&format!("  {}", label));
            }
            line.push_str(&format!("\n    {}", descriptor.source_location()));
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn descriptors_json(descriptors: &[ExtensionDescriptor]) -> Value {
    json!(descriptors)
}

pub fn format_activation_report(report: &ActivationReport, palette: Palette) -> String {
    let mut lines = Vec::new();
    for (descriptor, key) in &report.activated {
        lines.push(format!("{} {} as {}", palette.success("activated"), descriptor.registration_name(), key));
    }
    for descriptor in &report.skipped {
        lines.push(format!("{} {} (no constructible export)", palette.warning("skipped"), descriptor.registration_name()));
    }
    for (descriptor, error) in &report.failed {
        lines.push(format!("{} {}: {}", palette.error("failed"), descriptor.registration_name(), error));
    }
    lines.push(format!(
        "{} activated, {} skipped, {} failed",
        report.activated.len(),
        report.skipped.len(),
        report.failed.len()
    ));
    lines.join("\n")
}

pub fn activation_report_json(report: &ActivationReport) -> Value {
    json!({
        "activated": report.activated.iter()
            .map(|(descriptor, key)| json!({ "name": descriptor.registration_name(), "key": key }))
            .collect::<Vec<_>>(),
        "skipped": report.skipped.iter()
            .map(|descriptor| descriptor.registration_name())
            .collect::<Vec<_>>(),
        "failed": report.failed.iter()
            .map(|(descriptor, error)| json!({ "name": descriptor.registration_name(), "error": error.to_string() }))
            .collect::<Vec<_>>(),
    })
}

pub fn format_lifecycle_report(report: &LifecycleReport, palette: Palette) -> String {
    let failures = report.failures();
    let mut lines = vec![format!(
        "{}: {}/{} extensions succeeded",
        report.phase,
        report.succeeded(),
        report.results.len()
    )];
    for (key, error) in failures {
        lines.push(format!("  {} {}: {}", palette.error("failed"), key, error));
    }
    lines.join("\n")
}

pub fn format_backend_state(state: &BackendUpdateState, palette: Palette) -> String {
    match (&state.update_info, state.is_update_available) {
        (Some(info), true) => {
            let current = info.current_version.as_deref().unwrap_or("unknown");
            format!("{} {} -> {}", palette.highlight("Backend update available:"), current, info.new_version)
        }
        _ => palette.success("Backend is up to date"),
    }
}
