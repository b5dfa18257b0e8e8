use indicatif::ProgressStyle;

/// Rotating symbols of the random value liveness indicator.
pub const SPINNER_SYMBOLS: [&str; 5] = ["-", "\\", "|", "/", " "];

/// Extension trait for creating named spinner styles.
pub trait NamedProgress {
    /// Creates a spinner style with a name label.
    ///
    /// # Arguments
    ///
    /// * `name` - Label to display in front of the spinner
    fn named_spinner(name: &str) -> Self;
}

impl NamedProgress for ProgressStyle {
    fn named_spinner(name: &str) -> Self {
        let mut fmt = format!("  {}", name);
        for _ in 0..(24 - name.len() as i64 - 1) {
            fmt += " ";
        }
        fmt += ": {spinner} {msg}";
        ProgressStyle::default_spinner()
            .template(&fmt)
            .unwrap_or(ProgressStyle::default_spinner())
            .tick_strings(&SPINNER_SYMBOLS)
    }
}
