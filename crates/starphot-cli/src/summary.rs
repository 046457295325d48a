use std::path::Path;

use console::Style;
use starphot_core::session::{SessionConfig, SessionReport};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    warning: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            warning: Style::new().yellow(),
        }
    }
}

pub fn print_session_summary(config: &SessionConfig, folder: &Path, frames: usize) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Star Photometry"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(15)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(folder.display())
    );
    println!("  {:<14}{}", s.label.apply_to("Frames"), s.value.apply_to(frames));
    println!(
        "  {:<14}{}",
        s.label.apply_to("Star"),
        s.value.apply_to(&config.star_name)
    );
    println!();

    // Tracking
    if config.auto_tracking {
        println!("  {}", s.header.apply_to("Tracking"));
        println!(
            "    {:<12}{}",
            s.label.apply_to("Strategy"),
            s.method.apply_to(&config.tracker.strategy)
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Search"),
            s.value.apply_to(format!("{} px", config.search_radius))
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("History"),
            s.value.apply_to(format!("{} frames", config.tracker.history_capacity))
        );
    } else {
        println!(
            "  {:<14}{}",
            s.header.apply_to("Tracking"),
            s.disabled.apply_to("disabled")
        );
    }
    println!();

    // Aperture
    println!("  {}", s.header.apply_to("Aperture"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Radius"),
        s.value.apply_to(format!("{} px", config.aperture.inner_radius))
    );
    if config.aperture.sky_enabled() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Annulus"),
            s.value.apply_to(format!(
                "{} - {} px",
                config.aperture.inner_annulus, config.aperture.outer_annulus
            ))
        );
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Annulus"),
            s.disabled.apply_to("no sky subtraction")
        );
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Sampling"),
        s.method.apply_to(config.aperture_sampling)
    );
    println!();
}

/// Positions collected by pre-selection.
pub fn print_tracking_report(report: &SessionReport) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Pre-selection"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Positioned"),
        s.value
            .apply_to(format!("{} / {}", report.positioned, report.frame_count))
    );
    print_failures(&s, report);
    println!();
}

pub fn print_report(report: &SessionReport) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Measurement"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Measured"),
        s.value
            .apply_to(format!("{} / {}", report.measured, report.frame_count))
    );
    let status = if report.completed {
        s.method.apply_to("complete".to_string())
    } else {
        s.warning.apply_to(format!("stopped ({})", report.final_mode))
    };
    println!("    {:<12}{}", s.label.apply_to("Status"), status);
    print_failures(&s, report);
    println!();
}

fn print_failures(s: &Styles, report: &SessionReport) {
    if report.failures.is_empty() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Failures"),
            s.disabled.apply_to("none")
        );
        return;
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Failures"),
        s.warning.apply_to(report.failures.len())
    );
    for failure in &report.failures {
        println!(
            "      {} {}: {}",
            s.label.apply_to(format!("#{}", failure.frame_index + 1)),
            s.warning.apply_to(failure.kind),
            failure.message
        );
    }
}
