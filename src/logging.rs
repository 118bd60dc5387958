//! Structured logging bootstrap (§4.9, §4.11). Wraps `env_logger`'s
//! formatter with the key-adjacent redaction already used by the audit
//! sanitizer — a defence-in-depth belt, not the primary secrecy guarantee
//! (§4.4 owns that).

use log::{Log, Metadata, Record};
use wallet_sdk::redact::is_key_adjacent_field;

struct RedactingLogger {
    inner: env_logger::Logger,
}

impl Log for RedactingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let original = record.args().to_string();
        if let Some(redacted) = redact_line(&original) {
            self.inner.log(
                &Record::builder()
                    .args(format_args!("{redacted}"))
                    .level(record.level())
                    .target(record.target())
                    .module_path(record.module_path())
                    .file(record.file())
                    .line(record.line())
                    .build(),
            );
        } else {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Coarse belt-and-suspenders check: a log line is a loosely-structured
/// string, not a field tree like the audit sanitizer operates on, so this
/// only recognizes `name=value`/`name: value`/`"name":value`-shaped
/// tokens whose name is key-adjacent and masks the whole line rather than
/// guessing at the value's extent. Returns `None` when nothing matched.
fn redact_line(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let hit = tokens.iter().any(|t| is_key_adjacent_field(t));
    if hit {
        Some("[redacted: log line contained a key-adjacent field name]".to_string())
    } else {
        None
    }
}

/// Installs the redacting logger once, at process start. Level comes from
/// `LOG_LEVEL` (§6 environment contract); defaults to `info`.
pub fn init(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let inner = env_logger::Builder::from_env(env).build();
    let max_level = inner.filter();
    let logger = RedactingLogger { inner };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
}
