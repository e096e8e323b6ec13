//! Console summary blocks, written through the `log` facade.

/// Log a boxed header.
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a separator line
pub fn separator() {
    log::info!("{}", "─".repeat(60));
}

/// Log an indented sub-item.
pub fn sub_item(message: &str) {
    log::info!("    {}", message);
}

/// Log a titled list of key/value lines.
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
