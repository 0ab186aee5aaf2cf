use super::{ModelDiag, PredictIn, PredictOut, VisionModel};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Model backend that shells out to a configured command for every request.
///
/// The command gets one JSON request on stdin and must print one JSON
/// response on stdout before exiting. Keeping the model out of process means
/// any inference stack with a five-line wrapper script can sit behind it.
pub struct ProcessModel {
    command: String,
    args: Vec<String>,
    env: std::collections::BTreeMap<String, String>,
    timeout: Option<Duration>,
    name: String,
    framework: String,
}

impl ProcessModel {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        if cfg.model.command.trim().is_empty() {
            return Err(anyhow!("model.command is empty"));
        }
        let timeout = match cfg.model.request_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Ok(Self {
            command: cfg.model.command.clone(),
            args: cfg.model.args.clone(),
            env: cfg.model.env.clone(),
            timeout,
            name: cfg.model.name.clone(),
            framework: cfg.model.framework.clone(),
        })
    }

    pub fn doctor(&self) -> Result<ModelDiag> {
        self.run_json(&serde_json::json!({"cmd":"doctor"}))
    }

    fn predict(&self, images: &[PathBuf], prompt: &str) -> Result<String> {
        let req = PredictIn {
            images: images.iter().map(|p| p.display().to_string()).collect(),
            prompt: prompt.to_string(),
        };
        let out: PredictOut = self.run_json(&serde_json::json!({"cmd":"predict","req":req}))?;
        if !out.ok {
            let reason = out
                .error
                .unwrap_or_else(|| "model returned ok=false".to_string());
            return Err(anyhow!("model '{}' failed: {reason}", self.name));
        }
        Ok(out.answer)
    }

    fn run_json<I: serde::Serialize, O: for<'de> serde::Deserialize<'de>>(
        &self,
        input: &I,
    ) -> Result<O> {
        debug!("model request via '{}' timeout={:?}", self.command, self.timeout);
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning model command: {}", self.command))?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
            let bytes = serde_json::to_vec(input)?;
            use std::io::Write;
            stdin.write_all(&bytes)?;
            stdin.flush().ok();
        }

        let output = if let Some(timeout) = self.timeout {
            wait_with_timeout(&mut child, timeout)?
        } else {
            child
                .wait_with_output()
                .with_context(|| "waiting for model command")?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "model command failed: {}\n{}",
                self.command,
                stderr
            ));
        }

        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("model stderr: {}", stderr.trim());
        }

        let out: O = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing model JSON output: {}", self.command))?;
        Ok(out)
    }
}

impl VisionModel for ProcessModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn framework(&self) -> &str {
        &self.framework
    }

    fn predict_on_image(&self, image: &Path, prompt: &str) -> Result<String> {
        self.predict(&[image.to_path_buf()], prompt)
    }

    fn predict_on_images(&self, images: &[PathBuf], prompt: &str) -> Result<String> {
        self.predict(images, prompt)
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so a verbose model wrapper can't deadlock the
    // child on a full stdout/stderr buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stdout = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() > timeout {
            warn!("model command timed out after {:?}", timeout);
            let _ = child.kill();
            let _ = child.wait().with_context(|| "wait after kill")?;
            let _ = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Err(anyhow!(
                "model command exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&stderr)
            ));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
