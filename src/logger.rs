use std::io::Write;

use log::{LevelFilter, Log};

/// Writes every enabled record as one prefixed line to `target`.
pub struct SimpleLogger<W: Send + Sync>
where
    for<'a> &'a W: Write,
{
    target: W,
    prefix: &'static str,
}

impl<W: Send + Sync> Log for SimpleLogger<W>
where
    for<'a> &'a W: Write,
{
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.level() <= log::STATIC_MAX_LEVEL
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(&self.target, "{}{}", self.prefix, record.args());
        }
    }

    fn flush(&self) {
        let _ = (&self.target).flush();
    }
}

impl SimpleLogger<std::io::Stderr> {
    pub fn to_stderr(prefix: &'static str) -> SimpleLogger<std::io::Stderr> {
        SimpleLogger {
            target: std::io::stderr(),
            prefix,
        }
    }
}

/// Install the stderr logger for the whole process. Installing twice keeps the
/// first logger and only updates the level.
pub fn init(level: LevelFilter) {
    if log::set_boxed_logger(Box::new(SimpleLogger::to_stderr("doit: "))).is_err() {
        log::debug!("logger already installed");
    }
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, RwLock},
    };

    use super::SimpleLogger;
    use log::{LevelFilter, Log};

    #[derive(Clone, Default)]
    struct MyString {
        inner: Arc<RwLock<String>>,
    }

    impl MyString {
        fn read(&self) -> String {
            self.inner.read().unwrap().clone()
        }
    }

    impl io::Write for &'_ MyString {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner
                .write()
                .unwrap()
                .push_str(std::str::from_utf8(buf).unwrap());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn prefixes_each_record() {
        let target = MyString::default();
        let logger = SimpleLogger {
            target: target.clone(),
            prefix: "doit: ",
        };
        log::set_max_level(LevelFilter::Trace);

        logger.log(
            &log::Record::builder()
                .args(format_args!("spawned pid {}", 42))
                .level(log::Level::Debug)
                .build(),
        );

        assert_eq!(target.read(), "doit: spawned pid 42\n");
    }
}
