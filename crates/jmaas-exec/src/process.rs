use std::{io, process::Stdio};

use jmaas_core::RedirectableSink;
use tokio::{
    fs,
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, trace};

use crate::{
    error::{ExecError, ExecResult},
    provider::{CommandSpec, StagedFile},
    util::cmd_program,
};

const CHUNK: usize = 8 * 1024;

/// Write staged files, creating parent directories as needed.
pub async fn stage(files: &[StagedFile]) -> ExecResult<()> {
    for file in files {
        if let Some(parent) = file.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ExecError::Stage {
                path: file.path.clone(),
                reason: e.to_string(),
            })?;
        }
        fs::write(&file.path, &file.contents)
            .await
            .map_err(|e| ExecError::Stage {
                path: file.path.clone(),
                reason: e.to_string(),
            })?;
        trace!(target: "jmaas.exec.proc", path = %file.path.display(), bytes = file.contents.len(), "staged");
    }
    Ok(())
}

/// Run `spec` to completion, copying stdout and stderr into `sink` until both reach end of stream.
///
/// The child is killed if the returned future is dropped.
pub async fn execute(spec: &CommandSpec, input: Option<Vec<u8>>, sink: &RedirectableSink) -> ExecResult<()> {
    if spec.program.trim().is_empty() {
        return Err(ExecError::MissingProgram);
    }

    let mut cmd = cmd_program(&spec.program, &spec.args);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }
    for (k, v) in &spec.env {
        cmd.env(k, v);
    }
    cmd.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    trace!(target: "jmaas.exec.proc", key = %sink.key(), program = %spec.program, args = ?spec.args, "spawn");
    let mut child = cmd.spawn().map_err(|e| ExecError::Spawn(e.to_string()))?;

    let stdin = child.stdin.take();
    let feed = async move {
        if let (Some(mut w), Some(data)) = (stdin, input) {
            w.write_all(&data).await?;
            w.shutdown().await?;
        }
        Ok::<(), io::Error>(())
    };
    let (fed, out, err) = tokio::join!(
        feed,
        pump(child.stdout.take(), sink),
        pump(child.stderr.take(), sink),
    );

    let status = child.wait().await?;
    if let Err(e) = fed {
        debug!(target: "jmaas.exec.proc", key = %sink.key(), error = %e, "stdin closed early");
    }
    let bytes = out? + err?;

    match status.code() {
        None => {
            debug!(target: "jmaas.exec.proc", key = %sink.key(), "terminated by signal");
            return Err(ExecError::KilledBySignal);
        }
        Some(code) if code != 0 && spec.fail_on_non_zero => {
            debug!(target: "jmaas.exec.proc", key = %sink.key(), code, "exit non-zero");
            return Err(ExecError::NonZeroExit { code });
        }
        _ => {}
    }

    debug!(target: "jmaas.exec.proc", key = %sink.key(), bytes, "exit success");
    Ok(())
}

async fn pump<R>(reader: Option<R>, sink: &RedirectableSink) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(0);
    };

    let mut buf = vec![0u8; CHUNK];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write(&buf[..n]);
        total += n as u64;
    }
    Ok(total)
}
