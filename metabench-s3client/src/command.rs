//! Spawning of command line tools.

use std::ffi::OsString;
use std::io;
use std::process::Stdio;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{ClientError, ClientResult};

/// A fully assembled command line, ready to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// The program to run.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Environment variables added to the inherited environment.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Creates an invocation of `program` without arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable for the process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Runs the command to completion and returns its standard output.
    ///
    /// If `stdin` is given, it is written to the standard input of the process, which is then
    /// closed.
    pub async fn output(&self, stdin: Option<Bytes>) -> ClientResult<Bytes> {
        tracing::debug!(program = %self.program, args = ?self.args, "running command");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| self.spawn_error(source))?;

        // the child may fill its stdout before consuming all input
        let input = child.stdin.take();
        let feed = async move {
            if let (Some(data), Some(mut pipe)) = (stdin, input) {
                pipe.write_all(&data).await?;
                // dropping the pipe signals end of input
                drop(pipe);
            }
            Ok::<_, io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|source| self.spawn_error(source))?;

        match fed {
            // the process may exit without reading all of its input
            Err(err) if err.kind() != io::ErrorKind::BrokenPipe => {
                return Err(self.spawn_error(err));
            }
            _ => (),
        }

        if !output.status.success() {
            return Err(ClientError::Command {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            });
        }

        Ok(Bytes::from(output.stdout))
    }

    fn spawn_error(&self, source: io::Error) -> ClientError {
        ClientError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}
