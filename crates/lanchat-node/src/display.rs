//! Single writer for everything the operator sees.
//!
//! Receivers, the listener and the dispatcher all produce output
//! concurrently. Instead of printing directly they push [`Output`] items
//! onto one queue; a single task drains it and writes each item with one
//! `write_all`, so a message block and a command result never interleave
//! mid-line.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Interactive prompt.
pub const PROMPT: &str = ">> ";

/// One unit of terminal output.
#[derive(Debug)]
pub enum Output {
    /// Synchronous result of an operator command.
    Reply(String),

    /// Asynchronous event (message received, peer connected/left).
    ///
    /// Printed on a fresh line and followed by a redrawn prompt, since
    /// the operator may be mid-way through typing.
    Notice(String),

    /// Draw the prompt.
    Prompt,

    /// Acknowledged once everything queued before it has been written.
    Flush(oneshot::Sender<()>),
}

impl Output {
    /// Returns the text carried by a reply or notice.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Reply(text) | Self::Notice(text) => Some(text.as_str()),
            Self::Prompt | Self::Flush(_) => None,
        }
    }

    fn render(&self) -> Option<String> {
        match self {
            Self::Reply(text) => Some(format!("{text}\n")),
            Self::Notice(text) => Some(format!("\n{text}\n{PROMPT}")),
            Self::Prompt => Some(PROMPT.to_string()),
            Self::Flush(_) => None,
        }
    }
}

/// Cheap-to-clone producer side of the display queue.
#[derive(Debug, Clone)]
pub struct DisplayHandle {
    sender: mpsc::UnboundedSender<Output>,
}

impl DisplayHandle {
    /// Creates a handle and the queue it feeds.
    ///
    /// Pass the receiver to [`run_display`], or inspect it directly in tests.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Output>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn reply(&self, text: impl Into<String>) {
        self.push(Output::Reply(text.into()));
    }

    pub fn notice(&self, text: impl Into<String>) {
        self.push(Output::Notice(text.into()));
    }

    pub fn prompt(&self) {
        self.push(Output::Prompt);
    }

    /// Waits until everything queued so far has reached the writer.
    ///
    /// Returns immediately if the display task is gone.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.push(Output::Flush(tx));
        let _ = rx.await;
    }

    fn push(&self, output: Output) {
        // The display task only stops at process exit; nothing to report to.
        if self.sender.send(output).is_err() {
            debug!("Display queue closed, dropping output");
        }
    }
}

/// Drains the display queue into `out` until every handle is dropped.
pub async fn run_display<W>(mut receiver: mpsc::UnboundedReceiver<Output>, mut out: W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(output) = receiver.recv().await {
        if let Some(rendered) = output.render() {
            out.write_all(rendered.as_bytes()).await?;
            out.flush().await?;
        }
        if let Output::Flush(ack) = output {
            let _ = ack.send(());
        }
    }
    Ok(())
}

/// Spawns the display task writing to `out`.
pub fn spawn_display<W>(out: W) -> (DisplayHandle, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (handle, receiver) = DisplayHandle::channel();
    let task = tokio::spawn(async move {
        if let Err(e) = run_display(receiver, out).await {
            debug!(error = %e, "Display writer stopped");
        }
    });
    (handle, task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_render_order_and_format() {
        let (handle, receiver) = DisplayHandle::channel();
        handle.reply("Connected to 10.0.0.2:8000");
        handle.notice("Connection 1 (10.0.0.2:8000) has been terminated");
        handle.prompt();
        drop(handle);

        let mut buf = Vec::new();
        run_display(receiver, &mut buf).await.unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "Connected to 10.0.0.2:8000\n\
             \nConnection 1 (10.0.0.2:8000) has been terminated\n>> \
             >> "
        );
    }

    #[tokio::test]
    async fn test_flush_acknowledged_after_prior_output() {
        let (handle, task) = spawn_display(tokio::io::sink());
        handle.reply("one");
        handle.flush().await;
        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_push_after_close_does_not_panic() {
        let (handle, receiver) = DisplayHandle::channel();
        drop(receiver);
        handle.reply("lost");
        handle.flush().await;
    }

    #[test]
    fn test_output_text() {
        assert_eq!(Output::Reply("a".into()).text(), Some("a"));
        assert_eq!(Output::Notice("b".into()).text(), Some("b"));
        assert_eq!(Output::Prompt.text(), None);
    }
}
