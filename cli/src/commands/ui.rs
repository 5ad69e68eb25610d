use agentcfg_core::validator::ValidationIssue;
use yansi::Paint;

pub fn print_header(title: &str) {
    println!("\n{}", title.bold().cyan());
    println!("{}", "─".repeat(title.chars().count()).dim());
}

pub fn print_success(msg: &str) {
    println!("{} {}", "OK:".green().bold(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "WARN:".yellow().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "ERROR:".red().bold(), msg);
}

pub fn print_key_value(key: &str, value: &str) {
    println!("{}: {}", key.dim(), value.bold());
}

pub fn print_issues(errors: &[ValidationIssue], warnings: &[ValidationIssue]) {
    for issue in errors {
        println!(
            "  {} {} {}",
            "✗".red().bold(),
            issue.path.as_str().cyan(),
            issue.message
        );
    }
    for issue in warnings {
        println!(
            "  {} {} {}",
            "!".yellow().bold(),
            issue.path.as_str().cyan(),
            issue.message.as_str().dim()
        );
    }
}
