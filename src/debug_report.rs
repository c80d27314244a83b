use huntcfg::{Context, EvalReport, ParsedConfig};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        fn wrap(&self, s: &str, code: &str) -> String {
            if self.enabled { format!("{code}{s}{RESET}") } else { s.to_string() }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            self.wrap(s.as_ref(), color)
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            self.wrap(s.as_ref(), BOLD)
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            self.wrap(s.as_ref(), DIM)
        }

        pub fn section(&self, title: &str) -> String {
            self.paint(format!("━━━ {title} ━━━"), GRAY)
        }
    }
}

pub fn print_check(source: &str, config: &ParsedConfig, print_rules: bool, color: bool) {
    let palette = ansi::Palette::new(color);
    let summary = config.summary();

    println!("\n{}", palette.bold(palette.paint(format!("✓  Config OK: {source}"), ansi::GREEN)));

    println!("\n{}", palette.section("Summary"));
    let rows = [
        ("rules", summary.rules),
        ("unlock targets", summary.unlock_targets),
        ("recurring rules", summary.recurring_rules),
        ("point thresholds", summary.point_thresholds),
        ("referenced puzzles", summary.referenced_puzzles),
        ("dependency edges", summary.dependency_edges),
        ("re-checked rules", summary.dynamic_rules),
    ];
    for (label, value) in rows {
        println!("  {} {}", palette.dim(format!("{label:<20}")), palette.paint(value.to_string(), ansi::YELLOW));
    }

    if print_rules {
        println!("\n{}", palette.section("Rules"));
        for (idx, rule) in config.rules().iter().enumerate() {
            println!(
                "  {} {} {}",
                palette.paint(format!("[{idx}]"), ansi::GRAY),
                palette.dim(format!("line {:>3} │", rule.line)),
                palette.paint(rule.to_string(), ansi::CYAN)
            );
        }
    }
    println!();
}

pub fn print_eval(context: &Context, report: &EvalReport, color: bool) {
    let palette = ansi::Palette::new(color);
    let outcome = &report.outcome;
    let elapsed = context.elapsed().num_minutes();
    let sign = if elapsed < 0 { '-' } else { '+' };
    let minutes = elapsed.unsigned_abs();

    println!(
        "\n{}",
        palette.bold(palette.paint(
            format!("⚙  Evaluating at {} ({sign}{}:{:02})", context.now, minutes / 60, minutes % 60),
            ansi::CYAN
        ))
    );

    println!("\n{}", palette.section("Passes"));
    if report.metrics.passes.is_empty() {
        println!("{}", palette.dim("  Skipped: evaluation time is before the start"));
    }
    for (idx, pass) in report.metrics.passes.iter().enumerate() {
        let label = if idx == 0 { "Pass 0 (all rules):".to_string() } else { format!("Pass {idx}:") };
        println!(
            "  {} {} {}",
            palette.paint(label, ansi::BLUE),
            palette.dim(format!("checked {} fired {}", pass.rules_checked, pass.rules_fired)),
            if pass.grants.is_empty() {
                palette.dim("✗ no change")
            } else {
                palette.paint(format!("✓ {} grants", pass.grants.len()), ansi::GREEN)
            }
        );
        for grant in &pass.grants {
            println!(
                "    {} {} {}",
                palette.paint(format!("line {:>3}", grant.line), ansi::YELLOW),
                palette.paint(&grant.item, ansi::CYAN),
                palette.dim(format!("+{}", grant.amount))
            );
        }
    }

    println!("\n{}", palette.section("Outcome"));
    let row = |label: &str, value: String, color: &str| {
        println!("  {} {}", palette.dim(format!("{label:<14}")), palette.paint(value, color));
    };
    let unlocked: Vec<String> = outcome.unlocked.iter().map(|id| format!("P{id}")).collect();
    row("unlocked", unlocked.join(", "), ansi::GREEN);
    row("points", outcome.points.to_string(), ansi::YELLOW);
    row("hints", outcome.global_hints.to_string(), ansi::YELLOW);
    for (id, hints) in &outcome.puzzle_hints {
        row(&format!("hints P{id}"), hints.to_string(), ansi::YELLOW);
    }
    for badge in &outcome.badges {
        row("badge", badge.clone(), ansi::MAGENTA);
    }

    println!("\n{}", palette.section("Timing"));
    println!("  Total: {}", palette.paint(format!("{:?}", report.metrics.total), ansi::GREEN));
    println!();
}
