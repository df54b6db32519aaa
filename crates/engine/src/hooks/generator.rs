//! Hook output generation
//!
//! Runs a hook's producer and returns the text to write. Generation never
//! fails the pass: any producer error becomes an error stub that surfaces
//! in the shell at load time.

use super::render;
use super::spec::{BoxError, EnvSource, HookEnv, HookSpec, Producer, ProducerOutput};
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Default generator timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a producer failed
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Command line could not be split into words
    #[error("invalid command line '{command}': {reason}")]
    InvalidCommand {
        /// Command line as configured
        command: String,
        /// Parse failure
        reason: String,
    },

    /// Program could not be started
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// Program or worker name
        program: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Program exited unsuccessfully
    #[error("'{program}' exited with {}{}", exit_status(*code), stderr_suffix(stderr))]
    ExitStatus {
        /// Program name
        program: String,
        /// Exit code; `None` when killed by a signal
        code: Option<i32>,
        /// Captured stderr
        stderr: String,
    },

    /// Producer ran past its timeout
    #[error("'{program}' timed out after {}s", timeout.as_secs_f32())]
    Timeout {
        /// Program or callback fingerprint
        program: String,
        /// Limit that was exceeded
        timeout: Duration,
    },

    /// Callback returned an error
    #[error("callback failed: {0}")]
    Callback(String),

    /// Environment callback returned an error
    #[error("environment callback failed: {0}")]
    Environment(String),

    /// Callback panicked
    #[error("callback panicked")]
    Panicked,

    /// Program output is not UTF-8
    #[error("output of '{program}' is not valid UTF-8")]
    Encoding {
        /// Program name
        program: String,
    },
}

fn exit_status(code: Option<i32>) -> String {
    code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Text to write for a hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedOutput {
    /// Producer output, with any `onLoad` wrapper appended
    Text(String),
    /// Producer failed; the stub raises the error in the shell
    ErrorStub {
        /// Rendered stub source
        text: String,
        /// Failure message
        error: String,
    },
}

impl GeneratedOutput {
    /// Source text to write
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) | Self::ErrorStub { text, .. } => text,
        }
    }

    /// Whether generation failed
    #[must_use]
    pub fn is_error_stub(&self) -> bool {
        matches!(self, Self::ErrorStub { .. })
    }
}

/// Runs hook producers
#[derive(Debug, Clone)]
pub struct Generator {
    default_timeout: Option<Duration>,
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            default_timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

impl Generator {
    /// Generator with the default timeout
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout applied to hooks without their own (`None` = unlimited)
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Effective timeout for a spec
    #[must_use]
    pub fn timeout_for(&self, spec: &HookSpec) -> Option<Duration> {
        match spec.timeout() {
            Some(t) if t.is_zero() => None,
            Some(t) => Some(t),
            None => self.default_timeout,
        }
    }

    /// Generate the artifact text for a hook
    ///
    /// Never fails: producer errors are logged and rendered as an error stub.
    #[tracing::instrument(skip(self, spec), fields(hook = %name))]
    pub fn generate(&self, name: &str, spec: &HookSpec) -> GeneratedOutput {
        match self.produce(spec) {
            Ok(text) => {
                let text = match spec.on_load() {
                    Some(closure) => render::with_on_load(text, closure),
                    None => text,
                };
                GeneratedOutput::Text(text)
            }
            Err(e) => {
                tracing::warn!(hook = %name, error = %e, "Hook generation failed");
                let error = e.to_string();
                GeneratedOutput::ErrorStub {
                    text: render::error_stub(name, &error),
                    error,
                }
            }
        }
    }

    /// Run the producer and return its raw output
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] describing why the producer failed
    pub fn produce(&self, spec: &HookSpec) -> Result<String, GenerationError> {
        let timeout = self.timeout_for(spec);
        let env = match spec.env() {
            Some(EnvSource::Static(vars)) => vars.clone(),
            Some(EnvSource::Callback(callback)) => {
                let worker = callback.clone();
                let label = format!("env {}", callback.fingerprint());
                run_guarded(&label, timeout, move || worker.call())?
                    .map_err(|e| GenerationError::Environment(e.to_string()))?
            }
            None => HookEnv::new(),
        };

        match spec.producer() {
            Producer::ExternalCommand(cmd) => {
                let parts =
                    shell_words::split(cmd).map_err(|e| GenerationError::InvalidCommand {
                        command: cmd.clone(),
                        reason: e.to_string(),
                    })?;
                let Some((program, args)) = parts.split_first() else {
                    return Err(GenerationError::InvalidCommand {
                        command: cmd.clone(),
                        reason: "empty command".to_string(),
                    });
                };
                run_program(program, args, &env, timeout)
            }
            Producer::ArgumentList(argv) => {
                let Some((program, args)) = argv.split_first() else {
                    return Err(GenerationError::InvalidCommand {
                        command: String::new(),
                        reason: "empty argument list".to_string(),
                    });
                };
                run_program(program, args, &env, timeout)
            }
            Producer::Callback(callback) => {
                let worker = callback.clone();
                let label = format!("callback {}", callback.fingerprint());
                run_guarded(&label, timeout, move || worker.call(&env))?
                    .map(ProducerOutput::into_text)
                    .map_err(|e| GenerationError::Callback(e.to_string()))
            }
        }
    }
}

/// Run a program without a shell and capture its stdout
fn run_program(
    program: &str,
    args: &[String],
    env: &HookEnv,
    timeout: Option<Duration>,
) -> Result<String, GenerationError> {
    tracing::debug!(program, ?args, ?timeout, "Running producer");

    let spawn_error = |source: io::Error| GenerationError::Spawn {
        program: program.to_string(),
        source,
    };

    // Inherits the parent environment; hook variables are layered on top
    let mut expr = duct::cmd(program, args)
        .stdout_capture()
        .stderr_capture()
        .unchecked();
    for (key, value) in env {
        expr = expr.env(key, value);
    }

    let output = match timeout {
        Some(limit) => {
            let handle = expr.start().map_err(spawn_error)?;
            match handle.wait_timeout(limit).map_err(spawn_error)? {
                Some(output) => output.clone(),
                None => {
                    if let Err(e) = handle.kill() {
                        tracing::debug!(program, error = %e, "Failed to kill timed out producer");
                    }
                    return Err(GenerationError::Timeout {
                        program: program.to_string(),
                        timeout: limit,
                    });
                }
            }
        }
        None => expr.run().map_err(spawn_error)?,
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        return Err(GenerationError::ExitStatus {
            program: program.to_string(),
            code: output.status.code(),
            stderr: stderr.into_owned(),
        });
    }
    if !stderr.trim().is_empty() {
        tracing::debug!(program, stderr = %stderr.trim(), "Producer wrote to stderr");
    }

    String::from_utf8(output.stdout).map_err(|_| GenerationError::Encoding {
        program: program.to_string(),
    })
}

/// Run host code on a worker thread so it can be timed out
///
/// A panic is reported as [`GenerationError::Panicked`]. Code that overruns
/// its timeout is abandoned; its thread keeps running until it returns.
fn run_guarded<T, F>(
    label: &str,
    timeout: Option<Duration>,
    func: F,
) -> Result<Result<T, BoxError>, GenerationError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BoxError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("hooksmith-callback".to_string())
        .spawn(move || {
            // Receiver is gone after a timeout
            let _ = tx.send(func());
        })
        .map_err(|source| GenerationError::Spawn {
            program: label.to_string(),
            source,
        })?;

    match timeout {
        Some(limit) => match rx.recv_timeout(limit) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => Err(GenerationError::Timeout {
                program: label.to_string(),
                timeout: limit,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(GenerationError::Panicked),
        },
        None => rx.recv().map_err(|_| GenerationError::Panicked),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::hooks::spec::{Callback, EnvCallback};

    fn callback_spec(callback: Callback) -> HookSpec {
        HookSpec::builder(Producer::Callback(callback)).build().unwrap()
    }

    #[test]
    fn test_constant_callback() {
        let spec = callback_spec(Callback::constant("alias hi = echo hello"));
        let output = Generator::new().generate("greeter", &spec);
        assert_eq!(output, GeneratedOutput::Text("alias hi = echo hello".into()));
    }

    #[test]
    fn test_callback_lines_joined() {
        let spec = callback_spec(Callback::new("lines", |_| {
            Ok(ProducerOutput::Lines(vec!["a".into(), "b".into()]))
        }));
        assert_eq!(Generator::new().produce(&spec).unwrap(), "a\nb");
    }

    #[test]
    fn test_callback_receives_env() {
        let spec = HookSpec::builder(Producer::Callback(Callback::new("env", |env| {
            Ok(ProducerOutput::Text(
                env.get("GREETING").cloned().unwrap_or_default(),
            ))
        })))
        .env(EnvSource::Static(HookEnv::from([(
            "GREETING".to_string(),
            "hello".to_string(),
        )])))
        .build()
        .unwrap();

        assert_eq!(Generator::new().produce(&spec).unwrap(), "hello");
    }

    #[test]
    fn test_callback_error_becomes_stub() {
        let spec = callback_spec(Callback::new("boom", |_| Err("boom".into())));
        let output = Generator::new().generate("broken", &spec);

        assert!(output.is_error_stub());
        assert!(output.text().starts_with("error make"));
        assert!(output.text().contains("callback failed: boom"));
        assert!(output.text().contains("hooksmith regenerate broken"));
    }

    #[test]
    fn test_callback_panic_becomes_stub() {
        let spec = callback_spec(Callback::new("panics", |_| panic!("kaboom")));
        let err = Generator::new().produce(&spec).unwrap_err();
        assert!(matches!(err, GenerationError::Panicked));
    }

    #[test]
    fn test_env_callback_error_becomes_stub() {
        let spec = HookSpec::builder(Producer::Callback(Callback::constant("use vault")))
            .env(EnvSource::Callback(EnvCallback::new("vault", || {
                Err("vault locked".into())
            })))
            .build()
            .unwrap();

        let output = Generator::new().generate("secrets", &spec);
        assert!(output.is_error_stub());
        assert!(output.text().contains("environment callback failed: vault locked"));
    }

    #[test]
    fn test_env_callback_panic_becomes_stub() {
        let spec = HookSpec::builder(Producer::ExternalCommand("echo hi".into()))
            .env(EnvSource::Callback(EnvCallback::new("boom", || {
                panic!("env exploded")
            })))
            .build()
            .unwrap();

        let generator = Generator::new();
        assert!(matches!(
            generator.produce(&spec).unwrap_err(),
            GenerationError::Panicked
        ));
        assert!(generator.generate("bad", &spec).is_error_stub());
    }

    #[test]
    fn test_env_callback_timeout() {
        let spec = HookSpec::builder(Producer::Callback(Callback::constant("x")))
            .env(EnvSource::Callback(EnvCallback::new("slow", || {
                thread::sleep(Duration::from_millis(500));
                Ok(HookEnv::new())
            })))
            .timeout(Duration::from_millis(20))
            .build()
            .unwrap();

        let err = Generator::new().produce(&spec).unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { ref program, .. } if program == "env slow"));
    }

    #[test]
    fn test_callback_timeout() {
        let spec = HookSpec::builder(Producer::Callback(Callback::new("slow", |_| {
            thread::sleep(Duration::from_millis(500));
            Ok(ProducerOutput::Text("late".into()))
        })))
        .timeout(Duration::from_millis(20))
        .build()
        .unwrap();

        let err = Generator::new().produce(&spec).unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { .. }));
    }

    #[test]
    fn test_on_load_appended() {
        let spec = HookSpec::builder(Producer::Callback(Callback::constant("alias g = git")))
            .on_load("{|| $env.LOADED = true }")
            .build()
            .unwrap();
        let output = Generator::new().generate("git", &spec);
        assert_eq!(
            output.text(),
            "alias g = git\nexport-env { do --env {|| $env.LOADED = true } }\n"
        );
    }

    #[test]
    fn test_on_load_not_appended_to_stub() {
        let spec = HookSpec::builder(Producer::Callback(Callback::new("e", |_| Err("no".into()))))
            .on_load("{|| print loaded }")
            .build()
            .unwrap();
        let output = Generator::new().generate("x", &spec);
        assert!(!output.text().contains("export-env"));
    }

    #[test]
    fn test_timeout_resolution() {
        let generator = Generator::new().with_default_timeout(Some(Duration::from_secs(10)));
        let default = callback_spec(Callback::constant("x"));
        assert_eq!(generator.timeout_for(&default), Some(Duration::from_secs(10)));

        let custom = HookSpec::builder(Producer::Callback(Callback::constant("x")))
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        assert_eq!(generator.timeout_for(&custom), Some(Duration::from_secs(2)));

        let disabled = HookSpec::builder(Producer::Callback(Callback::constant("x")))
            .timeout(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(generator.timeout_for(&disabled), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_external_command_stdout() {
        let spec = HookSpec::builder(Producer::ExternalCommand("echo 'hello world'".into()))
            .build()
            .unwrap();
        assert_eq!(Generator::new().produce(&spec).unwrap(), "hello world\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_argument_list_with_env() {
        let spec = HookSpec::builder(Producer::ArgumentList(vec![
            "sh".into(),
            "-c".into(),
            "printf %s \"$HOOK_VALUE\"".into(),
        ]))
        .env(EnvSource::Static(HookEnv::from([(
            "HOOK_VALUE".to_string(),
            "42".to_string(),
        )])))
        .build()
        .unwrap();
        assert_eq!(Generator::new().produce(&spec).unwrap(), "42");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_includes_stderr() {
        let spec = HookSpec::builder(Producer::ArgumentList(vec![
            "sh".into(),
            "-c".into(),
            "echo broken config >&2; exit 3".into(),
        ]))
        .build()
        .unwrap();

        let err = Generator::new().produce(&spec).unwrap_err();
        assert!(matches!(err, GenerationError::ExitStatus { code: Some(3), .. }));
        assert!(err.to_string().contains("status 3: broken config"));
    }

    #[test]
    fn test_missing_program() {
        let spec = HookSpec::builder(Producer::ExternalCommand(
            "hooksmith-definitely-not-installed --init".into(),
        ))
        .build()
        .unwrap();
        let err = Generator::new().produce(&spec).unwrap_err();
        assert!(matches!(err, GenerationError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_timeout() {
        let spec = HookSpec::builder(Producer::ExternalCommand("sleep 5".into()))
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let err = Generator::new().produce(&spec).unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { .. }));
    }
}
