use std::io;
use std::sync::{Arc, Mutex};

use lua_config::{ConfigError, FileResolver, ParameterDictionary, ResolvedFile, load_source};

/// Resolver for inline configurations that must not include anything.
pub(crate) struct NoIncludes;

impl FileResolver for NoIncludes {
    fn resolve(&self, basename: &str) -> lua_config::Result<ResolvedFile> {
        Err(ConfigError::FileNotFound {
            basename: basename.to_owned(),
            searched: Vec::new(),
        })
    }
}

pub(crate) fn dictionary(source: &str) -> lua_config::Result<ParameterDictionary> {
    load_source(&NoIncludes, "inline", source)
}

/// Collects formatted log output written while `f` runs.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let buffer = Buffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (result, logs)
}
