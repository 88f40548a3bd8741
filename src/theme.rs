//! ANSI color helpers and console texture for pipeline progress output.

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const CYAN: &str = "\x1b[36m";
pub const GREEN: &str = "\x1b[32m";
pub const BOLD_CYAN: &str = "\x1b[1;36m";

/// Print a dimmed progress stage line.
pub fn print_stage(label: &str) {
    println!("{DIM}» {label}...{RESET}");
}

/// Print the startup line naming the resolved command context.
pub fn print_startup_banner(command: &str) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!("  {BOLD_CYAN}crewcast-cli{RESET} {DIM}v{version}{RESET}  {DIM}·{RESET}  {GREEN}{command}{RESET}");
    println!("  {DIM}{}{RESET}", "━".repeat(68));
}

/// Frame the final pipeline result.
pub fn print_result(title: &str, body: &str) {
    println!();
    println!("  {BOLD}{title}{RESET}");
    println!("  {DIM}{}{RESET}", "━".repeat(68));
    println!("{body}");
    println!("  {DIM}{}{RESET}", "━".repeat(68));
}
