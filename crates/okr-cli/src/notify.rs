use okr_core::Notifier;

/// Prints dashboard notifications to stderr so stdout stays parseable.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        eprintln!("✓ {message}");
    }

    fn info(&self, message: &str) {
        eprintln!("· {message}");
    }

    fn warning(&self, message: &str) {
        eprintln!("! {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("✗ {message}");
    }
}
